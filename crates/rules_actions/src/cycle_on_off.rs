use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_conditions::Condition;
use rules_core::{duration, RuleError};
use rules_objects::{ChangeListener, Object, ObjectRegistry, ObjectType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration as StdDuration;

/// Subscribed to the stop condition's referenced objects; flips `running`
/// false once the stop condition evaluates true. Wired up after the stop
/// condition tree is built, since it is itself that tree's change listener.
struct StopListener {
    condition: OnceLock<Box<dyn Condition>>,
    running: Arc<AtomicBool>,
}

#[async_trait]
impl ChangeListener for StopListener {
    async fn on_change(&self, _object_id: Option<&str>) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        if let Some(condition) = self.condition.get() {
            if condition.evaluate().await {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }
}

pub struct CycleOnOff {
    object: Arc<dyn Object>,
    on_secs: i64,
    off_secs: i64,
    count: u32,
    delay: i64,
    running: Arc<AtomicBool>,
    stop_listener: Option<Arc<StopListener>>,
}

impl CycleOnOff {
    pub async fn from_config(elem: &Element, registry: &dyn ObjectRegistry) -> Result<Self, RuleError> {
        let id = elem.require_attr("id")?;
        let object = registry.get_object(id)?;
        if object.object_type() != ObjectType::Bool {
            return Err(RuleError::ObjectTypeMismatch(id.to_string()));
        }

        let on_secs = duration::parse(elem.require_attr("on")?, false)?;
        let off_secs = duration::parse(elem.require_attr("off")?, false)?;
        let count: u32 = elem.attr_or("count", "0").parse().map_err(|_| RuleError::InvalidAttributeValue {
            attr: "count".to_string(),
            value: elem.attr_or("count", "0").to_string(),
        })?;
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;

        let running = Arc::new(AtomicBool::new(false));
        let stop_listener = if let Some(stop_elem) = elem.child("stopcondition") {
            let listener = Arc::new(StopListener { condition: OnceLock::new(), running: running.clone() });
            let cond_elem = stop_elem.require_child("condition")?;
            let condition =
                rules_conditions::from_config(cond_elem, registry, listener.clone() as Arc<dyn ChangeListener>)
                    .await?;
            let _ = listener.condition.set(condition);
            Some(listener)
        } else {
            None
        };

        Ok(Self { object, on_secs, off_secs, count, delay, running, stop_listener })
    }
}

#[async_trait]
impl Action for CycleOnOff {
    async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(id = self.object.id(), count = self.count, "CycleOnOff executing");

        for _ in 0..self.count {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.object.set_bool_value(true).await {
                tracing::warn!(id = self.object.id(), %err, "CycleOnOff: write failed");
            }
            tokio::time::sleep(StdDuration::from_secs(self.on_secs.max(0) as u64)).await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.object.set_bool_value(false).await {
                tracing::warn!(id = self.object.id(), %err, "CycleOnOff: write failed");
            }
            tokio::time::sleep(StdDuration::from_secs(self.off_secs.max(0) as u64)).await;
        }

        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!(id = self.object.id(), "CycleOnOff completed naturally");
        } else {
            tracing::info!(id = self.object.id(), "CycleOnOff stopped by condition");
        }
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "cycle-on-off");
        elem.set_attr("id", self.object.id().to_string());
        elem.set_attr("on", duration::format(self.on_secs));
        elem.set_attr("off", duration::format(self.off_secs));
        elem.set_attr("count", self.count.to_string());
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        if let Some(listener) = &self.stop_listener {
            if let Some(condition) = listener.condition.get() {
                let mut stop_elem = Element::new("stopcondition");
                stop_elem.push_child(condition.serialize());
                elem.push_child(stop_elem);
            }
        }
        elem
    }
}
