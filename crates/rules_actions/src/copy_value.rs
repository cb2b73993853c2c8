use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use rules_objects::{Object, ObjectRegistry};
use std::sync::Arc;

pub struct CopyValue {
    from: Arc<dyn Object>,
    to: Arc<dyn Object>,
    delay: i64,
}

impl CopyValue {
    pub fn from_config(elem: &Element, registry: &dyn ObjectRegistry) -> Result<Self, RuleError> {
        let from = registry.get_object(elem.require_attr("from")?)?;
        let to = registry.get_object(elem.require_attr("to")?)?;
        if from.object_type() != to.object_type() {
            return Err(RuleError::CopyTypeMismatch {
                from: from.id().to_string(),
                to: to.id().to_string(),
            });
        }
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        Ok(Self { from, to, delay })
    }
}

#[async_trait]
impl Action for CopyValue {
    async fn run(&self) {
        let value = self.from.get_value().await;
        tracing::info!(from = self.from.id(), to = self.to.id(), value = %value.to_literal(), "CopyValue executing");
        // Wrapped defensively: a bus-type error on the destination write is
        // logged and swallowed, never fatal to the rule.
        if let Err(err) = self.to.set_value(value).await {
            tracing::warn!(to = self.to.id(), %err, "CopyValue: write failed");
        }
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "copy-value");
        elem.set_attr("from", self.from.id().to_string());
        elem.set_attr("to", self.to.id().to_string());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}
