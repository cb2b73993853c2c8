//! The action catalog: each rule body is a list of these, started
//! concurrently and independently delayed (see SPEC_FULL.md §6).

pub mod copy_value;
pub mod cycle_on_off;
pub mod dim_ramp;
pub mod gateway;
pub mod send_email;
pub mod send_sms;
pub mod set_value;
pub mod shell;
pub mod shell_command;
pub mod tx;

use async_trait::async_trait;
use gateway::{EmailGateway, SmsGateway};
use rules_config::Element;
use rules_core::RuleError;
use rules_objects::ObjectRegistry;
use shell::ShellExecutor;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;

/// A single configured action. `run` performs the effect; `delay` is how
/// long `spawn_action` waits before calling it, not how long `run` itself
/// takes (cycle-on-off and dim-up run for as long as their own schedule
/// says).
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self);
    fn delay(&self) -> i64;
    fn serialize(&self) -> Element;
}

/// Sleeps `action.delay()` seconds, then runs it, detached from the
/// caller. Every action in a rule's action list is spawned this way so
/// they proceed independently of each other and of the rule dispatch
/// that triggered them.
pub fn spawn_action(action: Arc<dyn Action>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let delay = action.delay();
        if delay > 0 {
            tokio::time::sleep(StdDuration::from_secs(delay as u64)).await;
        }
        action.run().await;
    })
}

/// Collaborators an action factory may need beyond the object registry.
/// Gateways default to logging-only stand-ins; callers that want the real
/// thing construct one and pass it in.
pub struct ActionContext<'a> {
    pub registry: &'a dyn ObjectRegistry,
    pub sms_gateway: Arc<dyn SmsGateway>,
    pub email_gateway: Arc<dyn EmailGateway>,
    pub shell_executor: Arc<dyn ShellExecutor>,
}

impl<'a> ActionContext<'a> {
    pub fn new(registry: &'a dyn ObjectRegistry) -> Self {
        Self {
            registry,
            sms_gateway: Arc::new(gateway::LoggingSmsGateway),
            email_gateway: Arc::new(gateway::LoggingEmailGateway),
            shell_executor: Arc::new(shell::LocalShellExecutor::new()),
        }
    }
}

/// Builds a single `<action>` element into its concrete type, dispatching
/// on the `type` attribute. `cycle-on-off` is the only variant that
/// itself builds a nested condition tree (its stop condition), so this is
/// `async` even though most variants are synchronous to configure.
pub async fn from_config(elem: &Element, ctx: &ActionContext<'_>) -> Result<Arc<dyn Action>, RuleError> {
    let action_type = elem.require_attr("type")?;
    let action: Arc<dyn Action> = match action_type {
        "set-value" => Arc::new(set_value::SetValue::from_config(elem, ctx.registry)?),
        "copy-value" => Arc::new(copy_value::CopyValue::from_config(elem, ctx.registry)?),
        "dim-up" => Arc::new(dim_ramp::DimRamp::from_config(elem, ctx.registry)?),
        "cycle-on-off" => Arc::new(cycle_on_off::CycleOnOff::from_config(elem, ctx.registry).await?),
        "send-sms" => Arc::new(send_sms::SendSms::from_config(elem, ctx.sms_gateway.clone())?),
        "send-email" => Arc::new(send_email::SendEmail::from_config(elem, ctx.email_gateway.clone())?),
        "shell-cmd" => Arc::new(shell_command::ShellCommand::from_config(elem, ctx.shell_executor.clone())?),
        "tx" => Arc::new(tx::Tx::from_config(elem, ctx.registry)?),
        other => return Err(RuleError::UnsupportedActionType(other.to_string())),
    };
    Ok(action)
}
