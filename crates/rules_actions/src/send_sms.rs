use crate::gateway::SmsGateway;
use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use std::sync::Arc;

pub struct SendSms {
    recipient: String,
    value: String,
    delay: i64,
    gateway: Arc<dyn SmsGateway>,
}

impl SendSms {
    pub fn from_config(elem: &Element, gateway: Arc<dyn SmsGateway>) -> Result<Self, RuleError> {
        let recipient = elem.require_attr("id")?.to_string();
        let value = elem.require_attr("value")?.to_string();
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        Ok(Self { recipient, value, delay, gateway })
    }
}

#[async_trait]
impl Action for SendSms {
    async fn run(&self) {
        self.gateway.send_sms(&self.recipient, &self.value).await;
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "send-sms");
        elem.set_attr("id", self.recipient.clone());
        elem.set_attr("value", self.value.clone());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}
