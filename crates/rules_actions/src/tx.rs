use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use rules_objects::{Object, ObjectRegistry, Value};
use std::sync::Arc;

/// Writes a raw value to an object without the type-checked `<value>`
/// literal parsing `set-value` does. Stands in for the bus telegram send
/// the original issues directly onto the wire (see SPEC_FULL.md §6).
pub struct Tx {
    object: Arc<dyn Object>,
    value: Value,
    delay: i64,
}

impl Tx {
    pub fn from_config(elem: &Element, registry: &dyn ObjectRegistry) -> Result<Self, RuleError> {
        let id = elem.require_attr("id")?;
        let object = registry.get_object(id)?;
        let value = object.create_object_value(elem.require_attr("value")?)?;
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        Ok(Self { object, value, delay })
    }
}

#[async_trait]
impl Action for Tx {
    async fn run(&self) {
        tracing::info!(id = self.object.id(), value = %self.value.to_literal(), "Tx executing");
        if let Err(err) = self.object.set_value(self.value.clone()).await {
            tracing::warn!(id = self.object.id(), %err, "Tx: write failed");
        }
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "tx");
        elem.set_attr("id", self.object.id().to_string());
        elem.set_attr("value", self.value.to_literal());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_objects::InMemoryObjectRegistry;

    #[tokio::test]
    async fn writes_raw_value_to_the_bus() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L3", Value::Bool(false));
        let elem = Element::parse(r#"<action type="tx" id="L3" value="on"/>"#).unwrap();
        let action = Tx::from_config(&elem, &registry).unwrap();
        action.run().await;
        let obj = registry.get_object("L3").unwrap();
        assert_eq!(obj.get_value().await, Value::Bool(true));
    }
}
