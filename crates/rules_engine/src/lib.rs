//! Rule lifecycle and the rule set: the piece that ties the condition
//! tree (`rules_conditions`) and the action catalog (`rules_actions`)
//! together into something configured from, and exported back to, a
//! document (see SPEC_FULL.md §4.4-4.5).

mod rule;
mod server;

pub use rule::Rule;
pub use server::{format_duration, parse_duration, RuleServer};
