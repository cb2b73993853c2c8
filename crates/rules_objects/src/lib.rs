//! The object-registry boundary: the bus transport and the real
//! `ObjectController` are out of scope (see SPEC_FULL.md §1); this crate
//! defines the interface the condition tree and action catalog program
//! against, plus an in-memory implementation for tests, demos, and the
//! CLI's local REPL.

mod memory;
mod value;

pub use memory::{InMemoryObject, InMemoryObjectRegistry};
pub use value::{ObjectType, Value};

use async_trait::async_trait;
use rules_core::{BusAddress, RuleError};
use std::sync::Arc;

/// Notified when a subscribed object changes value, or a timer/time-counter
/// fires. `object_id` is `None` for the timer-forwarded `onChange(0)` case
/// described in SPEC_FULL.md §9.
#[async_trait]
pub trait ChangeListener: Send + Sync {
    async fn on_change(&self, object_id: Option<&str>);
}

/// A typed, addressable state value on the automation bus.
#[async_trait]
pub trait Object: Send + Sync {
    fn id(&self) -> &str;
    fn object_type(&self) -> ObjectType;

    async fn get_value(&self) -> Value;
    async fn set_value(&self, value: Value) -> Result<(), RuleError>;

    /// -1/0/+1 comparison of the object's current value against `value`.
    async fn compare(&self, value: &Value) -> i32 {
        let current = self.get_value().await;
        current.compare(value)
    }

    async fn last_tx(&self) -> BusAddress;
    async fn add_change_listener(&self, listener: Arc<dyn ChangeListener>);

    /// Revokes a previously added listener (identity comparison via
    /// `Arc::ptr_eq`). A no-op if the listener was never subscribed.
    async fn remove_change_listener(&self, listener: &Arc<dyn ChangeListener>);

    /// Build a typed value from a config literal, per this object's type.
    fn create_object_value(&self, literal: &str) -> Result<Value, RuleError> {
        self.object_type().parse_value(literal)
    }

    async fn set_bool_value(&self, v: bool) -> Result<(), RuleError> {
        if self.object_type() != ObjectType::Bool {
            return Err(RuleError::ObjectTypeMismatch(self.id().to_string()));
        }
        self.set_value(Value::Bool(v)).await
    }

    async fn get_int_value(&self) -> Result<u8, RuleError> {
        match self.get_value().await {
            Value::U8(n) => Ok(n),
            _ => Err(RuleError::ObjectTypeMismatch(self.id().to_string())),
        }
    }

    async fn set_int_value(&self, v: u8) -> Result<(), RuleError> {
        if self.object_type() != ObjectType::U8 {
            return Err(RuleError::ObjectTypeMismatch(self.id().to_string()));
        }
        self.set_value(Value::U8(v)).await
    }
}

/// Vends object handles by id. The real implementation lives behind the
/// bus transport; `InMemoryObjectRegistry` stands in for it here.
pub trait ObjectRegistry: Send + Sync {
    fn get_object(&self, id: &str) -> Result<Arc<dyn Object>, RuleError>;
}
