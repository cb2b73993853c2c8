//! The condition tree: recursive boolean composites over object state,
//! timers, and time-accumulation, dispatched by a textual type tag exactly
//! as laid out by the rule document format.

pub mod logic;
pub mod object_compare;
pub mod scheduler;
pub mod time_counter;
pub mod timer;

#[cfg(feature = "external-script")]
pub mod external_script;

pub use logic::{And, Not, Or};
pub use object_compare::{CompareOp, ObjectCompare, ObjectSourceCompare};
pub use scheduler::{PeriodicTask, TokioPeriodicScheduler};
pub use time_counter::TimeCounter;
pub use timer::{DailyTime, Timer};

#[cfg(feature = "external-script")]
pub use external_script::{ExternalScript, ScriptInterpreter};

use async_trait::async_trait;
use rules_config::Element;
use rules_core::RuleError;
use rules_objects::{ChangeListener, ObjectRegistry};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Shared node type of the condition tree. Every variant is pure with
/// respect to engine state except `TimeCounter`, which updates its own
/// accumulator as a side effect of `evaluate`.
#[async_trait]
pub trait Condition: Send + Sync {
    async fn evaluate(&self) -> bool;
    fn serialize(&self) -> Element;

    /// Revoke whatever object subscriptions this condition (or its
    /// children) holds. Called when the owning rule is reconfigured or
    /// deleted, so a torn-down rule's `ChangeListener` stops being held
    /// alive by an object it once subscribed to. Most leaf conditions
    /// have nothing to revoke, hence the no-op default.
    async fn teardown(&self) {}
}

/// Factory dispatch by the `type` attribute:
/// `and|or|not|object|object-src|timer|time-counter|lua`. Recursive, hence
/// boxed: a plain `async fn` calling itself would produce an infinitely
/// sized future.
///
/// `lua` is only reachable behind the `external-script` feature, and even
/// then this generic factory can't wire in an interpreter (it isn't part
/// of this signature) — it always reports unsupported here. Applications
/// that enable the feature construct `ExternalScript` directly with their
/// own `ScriptInterpreter` and splice it into the tree by hand.
pub fn from_config<'a>(
    elem: &'a Element,
    registry: &'a dyn ObjectRegistry,
    owner: Arc<dyn ChangeListener>,
) -> Pin<Box<dyn Future<Output = Result<Box<dyn Condition>, RuleError>> + Send + 'a>> {
    Box::pin(async move {
        let ty = elem.require_attr("type")?;
        match ty {
            "and" => Ok(Box::new(And::from_config(elem, registry, owner).await?) as Box<dyn Condition>),
            "or" => Ok(Box::new(Or::from_config(elem, registry, owner).await?) as Box<dyn Condition>),
            "not" => Ok(Box::new(Not::from_config(elem, registry, owner).await?) as Box<dyn Condition>),
            "object" => {
                Ok(Box::new(ObjectCompare::from_config(elem, registry, owner).await?) as Box<dyn Condition>)
            }
            "object-src" => {
                Ok(Box::new(ObjectSourceCompare::from_config(elem, registry, owner).await?) as Box<dyn Condition>)
            }
            "timer" => Ok(Box::new(Timer::from_config(elem, owner).await?) as Box<dyn Condition>),
            "time-counter" => {
                Ok(Box::new(TimeCounter::from_config(elem, registry, owner).await?) as Box<dyn Condition>)
            }
            other => Err(RuleError::UnsupportedConditionType(other.to_string())),
        }
    })
}
