use crate::gateway::EmailGateway;
use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use std::sync::Arc;

pub struct SendEmail {
    to: String,
    subject: String,
    body: String,
    delay: i64,
    gateway: Arc<dyn EmailGateway>,
}

impl SendEmail {
    pub fn from_config(elem: &Element, gateway: Arc<dyn EmailGateway>) -> Result<Self, RuleError> {
        let to = elem.require_attr("to")?.to_string();
        let subject = elem.attr_or("subject", "").to_string();
        let body = elem.text().to_string();
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        Ok(Self { to, subject, body, delay, gateway })
    }
}

#[async_trait]
impl Action for SendEmail {
    async fn run(&self) {
        self.gateway.send_email(&self.to, &self.subject, &self.body).await;
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "send-email");
        elem.set_attr("to", self.to.clone());
        elem.set_attr("subject", self.subject.clone());
        elem.set_text(self.body.clone());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}
