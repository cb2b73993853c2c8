//! A window-latching timer: flips a boolean true at the start of each
//! scheduled window and false at the end, optionally notifying the owning
//! rule at each flip.

use crate::scheduler::{PeriodicTask, TokioPeriodicScheduler};
use crate::Condition;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rules_config::Element;
use rules_core::{duration, RuleError};
use rules_objects::ChangeListener;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A daily recurring point in time, the concrete stand-in for the
/// calendar-shaped `TimeSpec` the schedule attributes (`at`/`until`) refer
/// to. `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DailyTime {
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let bad = || RuleError::InvalidAttributeValue {
            attr: "at/until".to_string(),
            value: text.to_string(),
        };
        let mut parts = text.trim().splitn(3, ':');
        let hour: u32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let minute: u32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let second: u32 = match parts.next() {
            Some(s) => s.parse().map_err(|_| bad())?,
            None => 0,
        };
        if hour > 23 || minute > 59 || second > 59 {
            return Err(bad());
        }
        Ok(Self { hour, minute, second })
    }

    /// The next instant at or after `now` matching this time of day.
    pub fn next_occurrence(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now
            .date_naive()
            .and_hms_opt(self.hour, self.minute, self.second)
            .expect("validated ranges");
        let today = Utc.from_utc_datetime(&today);
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }

    pub fn to_config_string(self) -> String {
        format!("{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

enum Schedule {
    At(DailyTime),
    Every(i64),
}

enum Window {
    Point,
    Duration(i64),
    Until(DailyTime),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForStart,
    WaitingForEnd,
}

struct TimerInner {
    trigger: bool,
    schedule: Schedule,
    window: Window,
    state: Arc<RwLock<bool>>,
    owner: Option<Arc<dyn ChangeListener>>,
    phase: Mutex<Phase>,
}

impl TimerInner {
    fn next_start_delay(&self, now: DateTime<Utc>) -> i64 {
        match &self.schedule {
            Schedule::Every(after) => *after,
            Schedule::At(spec) => (spec.next_occurrence(now) - now).num_seconds().max(0),
        }
    }

    fn window_len(&self, now: DateTime<Utc>) -> i64 {
        match &self.window {
            Window::Point => 0,
            Window::Duration(secs) => *secs,
            Window::Until(spec) => (spec.next_occurrence(now) - now).num_seconds().max(0),
        }
    }

    async fn notify(&self) {
        if self.trigger {
            if let Some(owner) = &self.owner {
                owner.on_change(None).await;
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for TimerInner {
    async fn on_timer(&self, scheduler: &TokioPeriodicScheduler) {
        let now = Utc::now();
        let mut phase = self.phase.lock().await;
        match *phase {
            Phase::WaitingForStart => {
                *self.state.write().await = true;
                self.notify().await;
                let window = self.window_len(now);
                if window > 0 {
                    *phase = Phase::WaitingForEnd;
                    scheduler.reschedule(window);
                } else {
                    *self.state.write().await = false;
                    self.notify().await;
                    scheduler.reschedule(self.next_start_delay(now));
                }
            }
            Phase::WaitingForEnd => {
                *self.state.write().await = false;
                self.notify().await;
                *phase = Phase::WaitingForStart;
                scheduler.reschedule(self.next_start_delay(now));
            }
        }
    }
}

pub struct Timer {
    state: Arc<RwLock<bool>>,
    trigger: bool,
    schedule_text: String,
    is_every: bool,
    window_text: Option<(&'static str, String)>,
    _scheduler: TokioPeriodicScheduler,
}

impl Timer {
    pub async fn from_config(
        elem: &Element,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let trigger = elem.attr("trigger") == Some("true");

        let at_elem = elem.child("at");
        let every_elem = elem.child("every");
        if at_elem.is_some() && every_elem.is_some() {
            return Err(RuleError::ConflictingTimerSchedule {
                a: "at".to_string(),
                b: "every".to_string(),
            });
        }

        let during_elem = elem.child("during");
        let until_elem = elem.child("until");
        if during_elem.is_some() && until_elem.is_some() {
            return Err(RuleError::ConflictingTimerSchedule {
                a: "during".to_string(),
                b: "until".to_string(),
            });
        }

        let during_secs = match during_elem {
            Some(e) => duration::parse(e.text(), false)?,
            None => 0,
        };

        let (schedule, schedule_text, is_every) = if let Some(at) = at_elem {
            let spec = DailyTime::parse(at.text())?;
            (Schedule::At(spec), spec.to_config_string(), false)
        } else if let Some(every) = every_elem {
            let every_secs = duration::parse(every.text(), false)?;
            let after = if during_secs > 0 {
                if every_secs <= during_secs {
                    return Err(RuleError::EveryNotGreaterThanDuring);
                }
                every_secs - during_secs
            } else {
                every_secs
            };
            (Schedule::Every(after), duration::format(every_secs), true)
        } else {
            return Err(RuleError::MissingTimerSchedule);
        };

        let (window, window_text) = if let Some(until) = until_elem {
            let spec = DailyTime::parse(until.text())?;
            (Window::Until(spec), Some(("until", spec.to_config_string())))
        } else if during_secs > 0 {
            (Window::Duration(during_secs), Some(("during", duration::format(during_secs))))
        } else {
            (Window::Point, None)
        };

        let state = Arc::new(RwLock::new(false));
        let inner = Arc::new(TimerInner {
            trigger,
            schedule,
            window,
            state: state.clone(),
            owner: trigger.then_some(owner),
            phase: Mutex::new(Phase::WaitingForStart),
        });
        let initial_delay = inner.next_start_delay(Utc::now());
        let scheduler = TokioPeriodicScheduler::spawn(inner, initial_delay);

        Ok(Self {
            state,
            trigger,
            schedule_text,
            is_every,
            window_text,
            _scheduler: scheduler,
        })
    }
}

#[async_trait]
impl Condition for Timer {
    // No teardown override: a Timer never registers itself on an `Object`'s
    // listener list, so there's nothing to revoke there. Dropping `self`
    // drops `_scheduler`'s one strong sender, which closes the driver
    // loop's channel and releases `TimerInner.owner` along with it.
    async fn evaluate(&self) -> bool {
        let value = *self.state.read().await;
        tracing::debug!(value, "Timer evaluated");
        value
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "timer");
        if self.trigger {
            elem.set_attr("trigger", "true");
        }
        let mut schedule_elem = Element::new(if self.is_every { "every" } else { "at" });
        schedule_elem.set_text(self.schedule_text.clone());
        elem.push_child(schedule_elem);
        if let Some((name, text)) = &self.window_text {
            let mut window_elem = Element::new(*name);
            window_elem.set_text(text.clone());
            elem.push_child(window_elem);
        }
        elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    struct NoopListener;
    #[async_trait]
    impl ChangeListener for NoopListener {
        async fn on_change(&self, _object_id: Option<&str>) {}
    }

    #[test]
    fn daily_time_parses_hh_mm() {
        let t = DailyTime::parse("08:30").unwrap();
        assert_eq!(t, DailyTime { hour: 8, minute: 30, second: 0 });
    }

    #[test]
    fn daily_time_rejects_bad_ranges() {
        assert!(DailyTime::parse("24:00").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn every_during_window_latches_true_within_window() {
        let elem = Element::parse(r#"<condition type="timer" trigger="true"><every>10s</every><during>2s</during></condition>"#).unwrap();
        let timer = Timer::from_config(&elem, Arc::new(NoopListener)).await.unwrap();
        assert!(!timer.evaluate().await);

        tokio::time::advance(StdDuration::from_secs(9)).await;
        tokio::task::yield_now().await;
        assert!(timer.evaluate().await);

        tokio::time::advance(StdDuration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert!(!timer.evaluate().await);
    }

    #[tokio::test]
    async fn missing_schedule_errors() {
        let elem = Element::parse(r#"<condition type="timer"/>"#).unwrap();
        assert!(Timer::from_config(&elem, Arc::new(NoopListener)).await.is_err());
    }

    #[tokio::test]
    async fn conflicting_at_and_every_errors() {
        let elem = Element::parse(r#"<condition type="timer"><at>08:00</at><every>10s</every></condition>"#).unwrap();
        assert!(Timer::from_config(&elem, Arc::new(NoopListener)).await.is_err());
    }

    #[tokio::test]
    async fn every_not_greater_than_during_errors() {
        let elem = Element::parse(r#"<condition type="timer"><every>2s</every><during>10s</during></condition>"#).unwrap();
        assert!(Timer::from_config(&elem, Arc::new(NoopListener)).await.is_err());
    }
}
