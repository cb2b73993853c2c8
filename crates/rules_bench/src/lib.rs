//! End-to-end scenario tests driven through the full `RuleServer` /
//! `Rule` stack rather than individual condition/action units, the way
//! this codebase's organism-dynamics crate exercises whole trajectories
//! instead of isolated state transitions.
