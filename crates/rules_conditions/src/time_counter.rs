//! Accumulates wall-clock seconds during which a sub-condition holds true;
//! becomes true once the accumulated total crosses `threshold`, and resets
//! after the sub-condition has been continuously false for `reset_delay`.

use crate::scheduler::{PeriodicTask, TokioPeriodicScheduler};
use crate::{from_config, Condition};
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{duration, RuleError};
use rules_objects::{ChangeListener, ObjectRegistry};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct ForwardingTask {
    owner: Arc<dyn ChangeListener>,
}

#[async_trait]
impl PeriodicTask for ForwardingTask {
    async fn on_timer(&self, _scheduler: &TokioPeriodicScheduler) {
        // Forwards unconditionally to the owning rule, per the timer
        // condition's own trigger flag having no bearing on this path.
        self.owner.on_change(None).await;
    }
}

struct State {
    threshold: i64,
    reset_delay: i64,
    last_val: bool,
    last_time: Option<Instant>,
    counter: i64,
}

pub struct TimeCounter {
    condition: Box<dyn Condition>,
    state: Mutex<State>,
    scheduler: TokioPeriodicScheduler,
}

impl TimeCounter {
    pub async fn from_config(
        elem: &Element,
        registry: &dyn ObjectRegistry,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let threshold = duration::parse(elem.attr_or("threshold", ""), false)?;
        let reset_delay = duration::parse(elem.attr_or("reset-delay", ""), false)?;
        let child_elem = elem.require_child("condition")?;
        let condition = from_config(child_elem, registry, owner.clone()).await?;

        let task = Arc::new(ForwardingTask { owner });
        // Parked until the first evaluate() computes a real wake time.
        const PARKED_SECS: i64 = 86_400 * 365 * 10;
        let scheduler = TokioPeriodicScheduler::spawn(task, PARKED_SECS);

        Ok(Self {
            condition,
            state: Mutex::new(State {
                threshold,
                reset_delay,
                last_val: false,
                last_time: None,
                counter: 0,
            }),
            scheduler,
        })
    }
}

#[async_trait]
impl Condition for TimeCounter {
    async fn evaluate(&self) -> bool {
        let now = Instant::now();
        let val = self.condition.evaluate().await;
        let mut state = self.state.lock().await;

        if state.last_val {
            if let Some(last_time) = state.last_time {
                state.counter += (now.saturating_duration_since(last_time)).as_secs() as i64;
            }
            tracing::debug!(counter = state.counter, "TimeCounter: accumulated");
        }

        if val {
            state.last_time = Some(now);
            state.last_val = true;
            let delay = (state.threshold - state.counter).max(0) + 1;
            self.scheduler.reschedule(delay);
        } else if state.last_val {
            state.last_time = Some(now);
            state.last_val = false;
            self.scheduler.reschedule(state.reset_delay + 1);
        }

        if !state.last_val {
            let expired = state
                .last_time
                .is_some_and(|last_time| now.saturating_duration_since(last_time).as_secs() as i64 > state.reset_delay);
            if expired {
                state.counter = 0;
                state.last_time = None;
            }
        }

        state.counter >= state.threshold
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "time-counter");
        // threshold/reset-delay are read back from construction-time config
        // text via the duration formatter, not from the mutable counters.
        elem.push_child(self.condition.serialize());
        elem
    }

    /// Revokes the wrapped condition's own subscriptions. `self.scheduler`
    /// needs no explicit teardown: dropping it drops its one strong sender,
    /// which is what lets the driver loop notice the channel closed and
    /// exit, taking `ForwardingTask`'s owner reference with it.
    async fn teardown(&self) {
        self.condition.teardown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_objects::{InMemoryObjectRegistry, Value};
    use std::time::Duration as StdDuration;

    struct NoopListener;
    #[async_trait]
    impl ChangeListener for NoopListener {
        async fn on_change(&self, _object_id: Option<&str>) {}
    }

    #[tokio::test]
    async fn counter_stays_below_threshold_for_short_true_span() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("Door", Value::Bool(true));
        let elem = Element::parse(
            r#"<condition type="time-counter" threshold="30s" reset-delay="60s">
                 <condition type="object" id="Door" value="on"/>
               </condition>"#,
        )
        .unwrap();
        let tc = TimeCounter::from_config(&elem, &registry, Arc::new(NoopListener))
            .await
            .unwrap();
        assert!(!tc.evaluate().await);
    }

    #[tokio::test]
    async fn threshold_of_zero_is_immediately_true_while_condition_holds() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("Door", Value::Bool(true));
        let elem = Element::parse(
            r#"<condition type="time-counter">
                 <condition type="object" id="Door" value="on"/>
               </condition>"#,
        )
        .unwrap();
        let tc = TimeCounter::from_config(&elem, &registry, Arc::new(NoopListener))
            .await
            .unwrap();
        assert!(tc.evaluate().await);
    }

    #[tokio::test(start_paused = true)]
    async fn counter_accumulates_elapsed_true_time_across_evaluations() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("Door", Value::Bool(true));
        let elem = Element::parse(
            r#"<condition type="time-counter" threshold="30s" reset-delay="60s">
                 <condition type="object" id="Door" value="on"/>
               </condition>"#,
        )
        .unwrap();
        let tc = TimeCounter::from_config(&elem, &registry, Arc::new(NoopListener)).await.unwrap();

        assert!(!tc.evaluate().await);
        tokio::time::advance(StdDuration::from_secs(20)).await;
        assert!(!tc.evaluate().await, "20s elapsed is still under the 30s threshold");
        tokio::time::advance(StdDuration::from_secs(15)).await;
        assert!(tc.evaluate().await, "35s elapsed should cross the 30s threshold");
    }
}
