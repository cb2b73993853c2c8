//! Opaque code-string condition, delegated to whatever interpreter the
//! embedding application wires in. The interpreter itself is out of scope;
//! this is the extension point it plugs into.

use crate::Condition;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::RuleError;

#[async_trait]
pub trait ScriptInterpreter: Send + Sync {
    async fn evaluate(&self, code: &str) -> bool;
}

pub struct ExternalScript {
    code: String,
    interpreter: std::sync::Arc<dyn ScriptInterpreter>,
}

impl ExternalScript {
    pub fn from_config(
        elem: &Element,
        interpreter: std::sync::Arc<dyn ScriptInterpreter>,
    ) -> Result<Self, RuleError> {
        Ok(Self { code: elem.text().to_string(), interpreter })
    }
}

#[async_trait]
impl Condition for ExternalScript {
    async fn evaluate(&self) -> bool {
        self.interpreter.evaluate(&self.code).await
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "lua");
        elem.set_text(self.code.clone());
        elem
    }
}
