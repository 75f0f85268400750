// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-period refresh scheduler.
//!
//! The scheduler fires one tick immediately and then one per period. Each
//! tick's work is spawned as its own task, so a slow fetch never delays the
//! next tick; ordering between overlapping ticks is resolved by the tick
//! sequence number (see [`crate::state::RadarState::begin_tick`]).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Radar refresh period (two minutes).
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(120_000);

/// One execution of the refresh cycle.
///
/// Carries the cancellation token through the fetch chain; work must check
/// [`Tick::is_cancelled`] before mutating the map.
#[derive(Debug, Clone)]
pub struct Tick {
    /// Monotonic sequence number, starting at 1.
    pub seq: u64,
    cancel: CancellationToken,
}

impl Tick {
    /// A standalone tick, for driving the pipeline without a scheduler.
    #[must_use]
    pub fn new(seq: u64, cancel: CancellationToken) -> Self {
        Self { seq, cancel }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the scheduler that issued this tick is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

/// Handle returned by [`RefreshScheduler::start`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    token: CancellationToken,
    trigger: Arc<Notify>,
}

impl CancelToken {
    /// Stop future ticks and cancel in-flight ones. Safe to call repeatedly.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            info!("Radar refresh cancelled");
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fire an extra tick now. The fixed period is unaffected.
    pub fn trigger_now(&self) {
        if !self.token.is_cancelled() {
            self.trigger.notify_one();
        }
    }
}

/// Periodic tick source.
#[derive(Debug, Clone, Copy)]
pub struct RefreshScheduler {
    period: Duration,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PERIOD)
    }
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking. `on_tick` runs once immediately and then every period;
    /// each returned future is spawned as its own task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(&self, mut on_tick: F) -> CancelToken
    where
        F: FnMut(Tick) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let trigger = Arc::new(Notify::new());
        let handle = CancelToken {
            token: token.clone(),
            trigger: Arc::clone(&trigger),
        };
        let period = self.period;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seq = 0_u64;

            info!("Radar refresh started (every {}s)", period.as_secs());

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!("Refresh loop exiting after {seq} ticks");
                        return;
                    }
                    _ = interval.tick() => {}
                    () = trigger.notified() => {
                        debug!("Manual refresh requested");
                    }
                }

                if token.is_cancelled() {
                    return;
                }

                seq += 1;
                debug!("Radar refresh tick #{seq}");
                tokio::spawn(on_tick(Tick::new(seq, token.child_token())));
            }
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    fn counting() -> (Arc<AtomicUsize>, impl FnMut(Tick) -> std::future::Ready<()>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        (count, move |_tick: Tick| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_immediately_then_every_period() {
        let (count, on_tick) = counting();
        let token = RefreshScheduler::default().start(on_tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(240)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);

        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_cancel() {
        let (count, on_tick) = counting();
        let token = RefreshScheduler::default().start(on_tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reaches_in_flight_ticks() {
        let seen = Arc::new(Notify::new());
        let observed = Arc::clone(&seen);
        let token = RefreshScheduler::default().start(move |tick: Tick| {
            let observed = Arc::clone(&observed);
            async move {
                tick.cancelled().await;
                assert!(tick.is_cancelled());
                observed.notify_one();
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), seen.notified())
            .await
            .expect("in-flight tick should observe cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_numbers_increase() {
        let last = Arc::new(AtomicU64::new(0));
        let recorder = Arc::clone(&last);
        let token = RefreshScheduler::new(Duration::from_secs(10)).start(move |tick: Tick| {
            let previous = recorder.swap(tick.seq, Ordering::SeqCst);
            assert_eq!(tick.seq, previous + 1);
            std::future::ready(())
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(last.load(Ordering::SeqCst), 4);
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_now_adds_a_tick() {
        let (count, on_tick) = counting();
        let token = RefreshScheduler::default().start(on_tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.trigger_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // Period is still measured from the start
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        token.cancel();
        token.trigger_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
