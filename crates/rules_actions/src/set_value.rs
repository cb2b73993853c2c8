use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use rules_objects::{Object, ObjectRegistry, Value};
use std::sync::Arc;

pub struct SetValue {
    object: Arc<dyn Object>,
    value: Value,
    delay: i64,
}

impl SetValue {
    pub fn from_config(elem: &Element, registry: &dyn ObjectRegistry) -> Result<Self, RuleError> {
        let id = elem.require_attr("id")?;
        let object = registry.get_object(id)?;
        let value = object.create_object_value(elem.require_attr("value")?)?;
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        tracing::debug!(id, value = %value.to_literal(), "SetValue configured");
        Ok(Self { object, value, delay })
    }
}

#[async_trait]
impl Action for SetValue {
    async fn run(&self) {
        tracing::info!(id = self.object.id(), value = %self.value.to_literal(), "SetValue executing");
        if let Err(err) = self.object.set_value(self.value.clone()).await {
            tracing::warn!(id = self.object.id(), %err, "SetValue: write failed");
        }
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "set-value");
        elem.set_attr("id", self.object.id().to_string());
        elem.set_attr("value", self.value.to_literal());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}
