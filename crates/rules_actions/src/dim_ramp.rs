use crate::Action;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use rules_objects::{Object, ObjectRegistry};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Ramps a U8 object from `start` toward `stop` (exclusive), one step per
/// `duration/|stop-start|` interval. Aborts if, after a write, the object's
/// readback has moved opposite the ramp's direction — some other writer got
/// there first.
pub struct DimRamp {
    object: Arc<dyn Object>,
    start: u8,
    stop: u8,
    duration_secs: i64,
    delay: i64,
}

impl DimRamp {
    pub fn from_config(elem: &Element, registry: &dyn ObjectRegistry) -> Result<Self, RuleError> {
        let id = elem.require_attr("id")?;
        let object = registry.get_object(id)?;
        if object.object_type() != rules_objects::ObjectType::U8 {
            return Err(RuleError::ObjectTypeMismatch(id.to_string()));
        }
        let start: u8 = elem.attr_or("start", "0").parse().map_err(|_| RuleError::InvalidAttributeValue {
            attr: "start".to_string(),
            value: elem.attr_or("start", "0").to_string(),
        })?;
        let stop: u8 = elem.attr_or("stop", "255").parse().map_err(|_| RuleError::InvalidAttributeValue {
            attr: "stop".to_string(),
            value: elem.attr_or("stop", "255").to_string(),
        })?;
        let duration_secs = duration::parse(elem.attr_or("duration", "60s"), false)?;
        let delay = duration::parse(elem.attr_or("delay", ""), false)?;
        Ok(Self { object, start, stop, duration_secs, delay })
    }
}

#[async_trait]
impl Action for DimRamp {
    async fn run(&self) {
        if self.stop == self.start {
            tracing::debug!(id = self.object.id(), "DimRamp: start == stop, nothing to do");
            return;
        }

        let span = (self.stop as i64 - self.start as i64).unsigned_abs();
        let step_micros = (self.duration_secs.max(0) as u128 * 1_000_000) / span as u128;
        let step = StdDuration::from_micros(step_micros as u64);

        tracing::info!(id = self.object.id(), start = self.start, stop = self.stop, "DimRamp executing");

        if self.stop > self.start {
            for idx in self.start..self.stop {
                if self.write_and_check(idx, step, true).await {
                    return;
                }
            }
        } else {
            let mut idx = self.start;
            loop {
                if idx == self.stop {
                    break;
                }
                if self.write_and_check(idx, step, false).await {
                    return;
                }
                idx -= 1;
            }
        }
    }

    fn delay(&self) -> i64 {
        self.delay
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("action");
        elem.set_attr("type", "dim-up");
        elem.set_attr("id", self.object.id().to_string());
        elem.set_attr("start", self.start.to_string());
        elem.set_attr("stop", self.stop.to_string());
        elem.set_attr("duration", duration::format(self.duration_secs));
        if self.delay != 0 {
            elem.set_attr("delay", duration::format(self.delay));
        }
        elem
    }
}

impl DimRamp {
    /// Write `idx`, sleep one step, then read back. Returns `true` if the
    /// ramp should abort (an external writer moved the value the other way).
    async fn write_and_check(&self, idx: u8, step: StdDuration, ramping_up: bool) -> bool {
        if let Err(err) = self.object.set_int_value(idx).await {
            tracing::warn!(id = self.object.id(), %err, "DimRamp: write failed");
            return true;
        }
        tokio::time::sleep(step).await;
        match self.object.get_int_value().await {
            Ok(readback) => {
                let aborted = if ramping_up { readback < idx } else { readback > idx };
                if aborted {
                    tracing::info!(id = self.object.id(), idx, readback, "DimRamp: aborted by opposite-direction write");
                }
                aborted
            }
            Err(err) => {
                tracing::warn!(id = self.object.id(), %err, "DimRamp: readback failed");
                true
            }
        }
    }
}
