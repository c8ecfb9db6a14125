//! Countdown task driving the attempt clock.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::TickOutcome;

/// A running countdown. Dropping it stops the clock.
#[derive(Debug, Default)]
pub struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    /// A countdown that is not running.
    pub fn idle() -> Self {
        Self { handle: None }
    }

    /// Spawn the clock on the current tokio runtime.
    ///
    /// `tick` is called once per `period`. When it reports
    /// [`TickOutcome::Expired`] the task runs `on_expired` to completion and
    /// ends; [`TickOutcome::Stopped`] ends it immediately.
    pub fn start<T, E, Fut>(period: Duration, mut tick: T, on_expired: E) -> Self
    where
        T: FnMut() -> TickOutcome + Send + 'static,
        E: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match tick() {
                    TickOutcome::Running(_) => {}
                    TickOutcome::Expired => {
                        tracing::info!("time is up");
                        on_expired().await;
                        break;
                    }
                    TickOutcome::Stopped => {
                        tracing::debug!("countdown stopped");
                        break;
                    }
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stop the clock. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the countdown task is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn expires_after_configured_ticks() {
        let ticks = Arc::new(AtomicU32::new(0));
        let expired = Arc::new(AtomicU32::new(0));
        let (t, e) = (Arc::clone(&ticks), Arc::clone(&expired));

        let countdown = Countdown::start(
            Duration::from_secs(1),
            move || {
                let n = t.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 5 {
                    TickOutcome::Expired
                } else {
                    TickOutcome::Running(5 - n)
                }
            },
            move || async move {
                e.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert_eq!(expired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticking() {
        let ticks = Arc::new(AtomicU32::new(0));
        let t = Arc::clone(&ticks);
        let mut countdown = Countdown::start(
            Duration::from_secs(1),
            move || {
                t.fetch_add(1, Ordering::SeqCst);
                TickOutcome::Running(100)
            },
            || async {},
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        countdown.cancel();
        countdown.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_ticking() {
        let ticks = Arc::new(AtomicU32::new(0));
        let t = Arc::clone(&ticks);
        let countdown = Countdown::start(
            Duration::from_secs(1),
            move || {
                t.fetch_add(1, Ordering::SeqCst);
                TickOutcome::Running(100)
            },
            || async {},
        );
        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(countdown);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_outcome_ends_task() {
        let countdown = Countdown::start(Duration::from_secs(1), || TickOutcome::Stopped, || async {});
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!countdown.is_running());
        assert!(!Countdown::idle().is_running());
    }
}
