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

//! Radar overlay component: mount, per-tick pipeline, unmount.
//!
//! Each tick runs `fetch -> validate -> render | render_fault`. The only
//! suspension point is the fetch; everything after it happens inside one
//! map host critical section, after checking that the tick was not
//! cancelled, that the map is still alive and that no newer tick has
//! started.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info};

use crate::error::MapError;
use crate::map::{DisplaySurface, MapHandle, MapHost, MapOptions};
use crate::overlay::{render_fault_into, render_into, RenderSummary};
use crate::protocol::validate;
use crate::scheduler::{CancelToken, RefreshScheduler, Tick, DEFAULT_REFRESH_PERIOD};
use crate::source::RadarSource;
use crate::state::{RadarState, SharedRadarState, StatusProjection};

/// Settings for one mounted overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub refresh_period: Duration,
    pub map: MapOptions,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            refresh_period: DEFAULT_REFRESH_PERIOD,
            map: MapOptions::default(),
        }
    }
}

/// Why a tick finished without changing the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The scheduler was cancelled (unmount) while the tick was in flight.
    Cancelled,
    /// The map host had been destroyed.
    Destroyed,
    /// A newer tick started before this one completed.
    Stale,
}

/// Result of one refresh tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Rendered(RenderSummary),
    Faulted(String),
    Discarded(DiscardReason),
}

/// Run one refresh tick against `handle`.
pub async fn run_tick<S: RadarSource>(
    tick: Tick,
    source: &S,
    handle: &MapHandle,
    state: &SharedRadarState,
) -> TickOutcome {
    if tick.is_cancelled() {
        return TickOutcome::Discarded(DiscardReason::Cancelled);
    }
    if !handle.is_live() {
        return TickOutcome::Discarded(DiscardReason::Destroyed);
    }

    if !state
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .begin_tick(tick.seq)
    {
        debug!("Tick #{} superseded before it started", tick.seq);
        return TickOutcome::Discarded(DiscardReason::Stale);
    }

    let result = source
        .fetch()
        .await
        .and_then(|envelope| validate(envelope, Utc::now()));

    if tick.is_cancelled() {
        debug!("Tick #{} completed after cancellation; discarding", tick.seq);
        return TickOutcome::Discarded(DiscardReason::Cancelled);
    }

    let outcome = handle.with_host(|host| {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_current(tick.seq) {
            state.note_stale();
            return TickOutcome::Discarded(DiscardReason::Stale);
        }

        match result {
            Ok((snapshot, report)) => {
                let summary = render_into(host, &snapshot);
                state.complete_success(tick.seq, Arc::new(snapshot), report);
                TickOutcome::Rendered(summary)
            }
            Err(err) => {
                let message = err.message().to_string();
                render_fault_into(host, &message);
                state.complete_failure(tick.seq, message.clone());
                TickOutcome::Faulted(message)
            }
        }
    });

    match outcome {
        Ok(outcome) => {
            if outcome == TickOutcome::Discarded(DiscardReason::Stale) {
                info!("Discarded stale radar result from tick #{}", tick.seq);
            }
            outcome
        }
        Err(MapError::Destroyed) => {
            debug!("Tick #{} completed after the map was destroyed", tick.seq);
            TickOutcome::Discarded(DiscardReason::Destroyed)
        }
        Err(MapError::Poisoned) => {
            error!("Map host lock poisoned; tick #{} dropped", tick.seq);
            TickOutcome::Discarded(DiscardReason::Destroyed)
        }
    }
}

/// A mounted radar overlay: the map host plus its refresh schedule.
#[derive(Debug)]
pub struct RadarOverlay {
    handle: MapHandle,
    state: SharedRadarState,
    scheduler: CancelToken,
}

impl RadarOverlay {
    /// Create the map on `surface` and start refreshing from `source`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn mount<S: RadarSource>(
        surface: Arc<dyn DisplaySurface>,
        source: Arc<S>,
        config: OverlayConfig,
    ) -> Self {
        let handle = MapHost::initialize(surface, config.map);
        let state = RadarState::shared();

        let tick_handle = handle.clone();
        let tick_state = Arc::clone(&state);
        let scheduler = RefreshScheduler::new(config.refresh_period).start(move |tick: Tick| {
            let source = Arc::clone(&source);
            let handle = tick_handle.clone();
            let state = Arc::clone(&tick_state);
            async move {
                let seq = tick.seq;
                let outcome = run_tick(tick, source.as_ref(), &handle, &state).await;
                debug!("Tick #{seq} finished: {outcome:?}");
            }
        });

        Self {
            handle,
            state,
            scheduler,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &MapHandle {
        &self.handle
    }

    #[must_use]
    pub fn state(&self) -> SharedRadarState {
        Arc::clone(&self.state)
    }

    /// Current status strings for display.
    #[must_use]
    pub fn projection(&self) -> StatusProjection {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .projection()
    }

    /// Fetch now instead of waiting for the next period.
    pub fn refresh_now(&self) {
        self.scheduler.trigger_now();
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.scheduler.is_cancelled() && self.handle.is_live()
    }

    /// Stop refreshing and destroy the map. Safe to call more than once;
    /// returns `true` only for the call that tore the overlay down.
    pub fn unmount(&self) -> bool {
        self.scheduler.cancel();
        let destroyed = self.handle.destroy();
        if destroyed {
            info!("Radar overlay unmounted");
        }
        destroyed
    }
}

impl Drop for RadarOverlay {
    fn drop(&mut self) {
        self.unmount();
    }
}
