//! A minimal periodic-task driver standing in for the bus stack's scheduler.
//!
//! Mirrors the `reschedule(t)` / `onTimer(now)` contract: a task asks to be
//! woken `t` seconds from now, and gets called back on the scheduler's own
//! task when that time comes. The task can call `reschedule` again from
//! inside `on_timer` to arrange its next wakeup.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;

#[async_trait]
pub trait PeriodicTask: Send + Sync {
    async fn on_timer(&self, scheduler: &TokioPeriodicScheduler);
}

/// Either the one strong handle an owning condition holds (dropping it
/// closes the channel and lets the driver loop exit), or the weak handle
/// the driver loop uses to reschedule itself — a weak sender never keeps
/// the channel open, so it can't prevent the loop (and the `Arc<dyn
/// PeriodicTask>` it holds) from being collected once the owner is gone.
#[derive(Clone)]
enum SchedulerHandle {
    Strong(mpsc::UnboundedSender<i64>),
    Weak(mpsc::WeakUnboundedSender<i64>),
}

impl SchedulerHandle {
    fn send(&self, seconds_from_now: i64) {
        let value = seconds_from_now.max(0);
        match self {
            SchedulerHandle::Strong(tx) => {
                let _ = tx.send(value);
            }
            SchedulerHandle::Weak(tx) => {
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(value);
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct TokioPeriodicScheduler {
    tx: SchedulerHandle,
}

impl TokioPeriodicScheduler {
    /// Spawn the driver loop for `task` and kick off the first wakeup
    /// `initial_delay_secs` from now.
    pub fn spawn(task: Arc<dyn PeriodicTask>, initial_delay_secs: i64) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<i64>();
        let scheduler = TokioPeriodicScheduler { tx: SchedulerHandle::Strong(tx.clone()) };
        let loop_scheduler = TokioPeriodicScheduler { tx: SchedulerHandle::Weak(tx.downgrade()) };
        drop(tx);
        tokio::spawn(async move {
            let mut deadline: Option<tokio::time::Instant> = None;
            loop {
                match deadline {
                    Some(at) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(at) => {
                                deadline = None;
                                task.on_timer(&loop_scheduler).await;
                            }
                            secs = rx.recv() => {
                                match secs {
                                    Some(s) => deadline = Some(tokio::time::Instant::now() + secs_to_std(s)),
                                    None => break,
                                }
                            }
                        }
                    }
                    None => match rx.recv().await {
                        Some(s) => deadline = Some(tokio::time::Instant::now() + secs_to_std(s)),
                        None => break,
                    },
                }
            }
        });
        scheduler.reschedule(initial_delay_secs);
        scheduler
    }

    pub fn reschedule(&self, seconds_from_now: i64) {
        self.tx.send(seconds_from_now);
    }
}

fn secs_to_std(secs: i64) -> StdDuration {
    StdDuration::from_secs(secs.max(0) as u64)
}
