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

//! Per-instance radar state and the read-only status projection.
//!
//! Transitions:
//!
//! ```text
//! Loading --success--> Success --next tick--> Loading
//!    \----failure----> Error   --next tick--> Loading
//! ```
//!
//! Only the most recently started tick may complete. A completion for an
//! older tick is stale and is rejected without touching state or layers.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::protocol::{RadarSnapshot, ValidationReport};
use crate::source::HealthReport;

/// Connectivity of the radar feed as of the latest tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Loading,
    Success,
    Error,
}

/// State owned by one radar overlay instance.
#[derive(Debug, Clone, Default)]
pub struct RadarState {
    pub status: Status,
    /// Latest successfully stored snapshot; survives later failures.
    pub snapshot: Option<Arc<RadarSnapshot>>,
    pub last_error: Option<String>,
    pub last_report: Option<ValidationReport>,
    pub last_outcome_at: Option<DateTime<Utc>>,
    pub health: Option<HealthReport>,
    latest_tick: u64,
    stale_discards: u64,
}

/// Thread-safe shared radar state
pub type SharedRadarState = Arc<Mutex<RadarState>>;

impl RadarState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> SharedRadarState {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Record that tick `seq` has started. Ticks older than the latest one
    /// are ignored and return `false`.
    pub fn begin_tick(&mut self, seq: u64) -> bool {
        if seq <= self.latest_tick {
            return false;
        }
        self.latest_tick = seq;
        self.status = Status::Loading;
        true
    }

    /// Whether `seq` is the most recently started tick.
    #[must_use]
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest_tick
    }

    #[must_use]
    pub fn latest_tick(&self) -> u64 {
        self.latest_tick
    }

    /// Completions rejected because a newer tick had started.
    #[must_use]
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    pub fn note_stale(&mut self) {
        self.stale_discards += 1;
    }

    /// Store a successful outcome for tick `seq`.
    pub fn complete_success(
        &mut self,
        seq: u64,
        snapshot: Arc<RadarSnapshot>,
        report: ValidationReport,
    ) -> bool {
        if !self.is_current(seq) {
            self.note_stale();
            return false;
        }
        self.status = Status::Success;
        self.snapshot = Some(snapshot);
        self.last_error = None;
        self.last_report = Some(report);
        self.last_outcome_at = Some(Utc::now());
        true
    }

    /// Store a failed outcome for tick `seq`. The previous snapshot is kept
    /// for the last-update projection.
    pub fn complete_failure(&mut self, seq: u64, message: impl Into<String>) -> bool {
        if !self.is_current(seq) {
            self.note_stale();
            return false;
        }
        self.status = Status::Error;
        self.last_error = Some(message.into());
        self.last_outcome_at = Some(Utc::now());
        true
    }

    pub fn set_health(&mut self, report: HealthReport) {
        self.health = Some(report);
    }

    #[must_use]
    pub fn projection(&self) -> StatusProjection {
        StatusProjection::from_state(self)
    }
}

/// The three status strings shown next to the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusProjection {
    pub status_label: String,
    pub last_update: String,
    pub source_label: String,
}

impl StatusProjection {
    /// Derive the strings from state. Pure: no I/O, no layer access.
    #[must_use]
    pub fn from_state(state: &RadarState) -> Self {
        let status_label = match state.status {
            Status::Loading => "Loading radar data...",
            Status::Success => "Connected",
            Status::Error => "Connection error",
        }
        .to_string();

        let last_update = state.snapshot.as_ref().map_or_else(
            || "Never".to_string(),
            |snapshot| snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );

        let source_label = state.snapshot.as_ref().map_or_else(
            || "Unknown".to_string(),
            |snapshot| {
                let source = snapshot.source.as_deref().unwrap_or("Unknown");
                if snapshot.cached {
                    format!("{source} (cached)")
                } else {
                    source.to_string()
                }
            },
        );

        Self {
            status_label,
            last_update,
            source_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(source: Option<&str>, cached: bool) -> Arc<RadarSnapshot> {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Arc::new(RadarSnapshot {
            timestamp,
            received_at: timestamp,
            source: source.map(str::to_string),
            cached,
            note: None,
            bounds: None,
            features: Vec::new(),
            data_url: None,
            metadata: None,
        })
    }

    #[test]
    fn test_initial_projection() {
        let projection = RadarState::new().projection();
        assert_eq!(projection.status_label, "Loading radar data...");
        assert_eq!(projection.last_update, "Never");
        assert_eq!(projection.source_label, "Unknown");
    }

    #[test]
    fn test_success_then_failure_keeps_snapshot() {
        let mut state = RadarState::new();
        assert!(state.begin_tick(1));
        assert!(state.complete_success(1, snapshot(Some("NOAA MRMS"), false), ValidationReport::default()));
        assert_eq!(state.status, Status::Success);

        let projection = state.projection();
        assert_eq!(projection.status_label, "Connected");
        assert_eq!(projection.last_update, "2024-01-01 00:00:00 UTC");
        assert_eq!(projection.source_label, "NOAA MRMS");

        assert!(state.begin_tick(2));
        assert_eq!(state.status, Status::Loading);
        assert!(state.complete_failure(2, "no data"));
        assert_eq!(state.status, Status::Error);
        assert_eq!(state.last_error.as_deref(), Some("no data"));

        let projection = state.projection();
        assert_eq!(projection.status_label, "Connection error");
        assert_eq!(projection.last_update, "2024-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_cached_source_label() {
        let mut state = RadarState::new();
        state.begin_tick(1);
        state.complete_success(1, snapshot(Some("NOAA MRMS"), true), ValidationReport::default());
        assert_eq!(state.projection().source_label, "NOAA MRMS (cached)");

        state.begin_tick(2);
        state.complete_success(2, snapshot(None, false), ValidationReport::default());
        assert_eq!(state.projection().source_label, "Unknown");
    }

    #[test]
    fn test_stale_completion_rejected() {
        let mut state = RadarState::new();
        state.begin_tick(1);
        state.begin_tick(2);

        assert!(!state.is_current(1));
        assert!(!state.complete_success(1, snapshot(Some("old"), false), ValidationReport::default()));
        assert!(!state.complete_failure(1, "old failure"));
        assert_eq!(state.status, Status::Loading);
        assert!(state.snapshot.is_none());
        assert_eq!(state.stale_discards(), 2);

        assert!(state.complete_success(2, snapshot(Some("new"), false), ValidationReport::default()));
        assert_eq!(state.projection().source_label, "new");
    }

    #[test]
    fn test_begin_tick_ignores_older_sequence() {
        let mut state = RadarState::new();
        assert!(state.begin_tick(3));
        assert!(!state.begin_tick(2));
        assert!(!state.begin_tick(3));
        assert_eq!(state.latest_tick(), 3);
    }
}
