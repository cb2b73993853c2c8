use crate::shell::ShellExecutor;
use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use std::sync::Arc;

pub struct ShellCommand {
    command: String,
    delay: i64,
    executor: Arc<dyn ShellExecutor>,
}

impl ShellCommand {
    pub fn from_config(elem: &Element, executor: Arc<dyn ShellExecutor>) -> Result<Self, RuleError> {
        let command = elem.attr("cmd").map(str::to_string).unwrap_or_else(|| elem.text().to_string());
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        Ok(Self { command, delay, executor })
    }
}

#[async_trait]
impl Action for ShellCommand {
    async fn run(&self) {
        tracing::info!(command = %self.command, "ShellCommand executing");
        match self.executor.execute(&self.command).await {
            Ok(status) if !status.success() => {
                tracing::warn!(command = %self.command, %status, "ShellCommand: non-zero exit");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(command = %self.command, %err, "ShellCommand: failed to spawn");
            }
        }
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "shell-cmd");
        elem.set_attr("cmd", self.command.clone());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}
