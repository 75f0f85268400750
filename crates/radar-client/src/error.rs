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

//! Error types for the radar client.
//!
//! Only failures that end in the diagnostic overlay are errors here. Degraded
//! payload shapes (missing `features`, malformed individual features) are
//! tolerated during validation and reported through
//! [`ValidationReport`](crate::protocol::ValidationReport) instead.

use std::sync::PoisonError;

use thiserror::Error;

/// Fallback reason used when the service reports a failure without a message.
pub const GENERIC_SERVER_FAILURE: &str = "Radar service reported a failure";

/// Errors that end a refresh tick in the fault view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadarError {
    /// The request was rejected, returned a non-2xx status, or the body
    /// could not be decoded.
    #[error("{0}")]
    Network(String),

    /// The service answered with `success: false`.
    #[error("{0}")]
    ServerReported(String),
}

impl RadarError {
    /// Message text shown in the diagnostic overlay.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            RadarError::Network(message) | RadarError::ServerReported(message) => message,
        }
    }
}

/// Errors returned by operations on a [`MapHandle`](crate::map::MapHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// The map host has been destroyed; the handle is no longer usable.
    #[error("map handle has been destroyed")]
    Destroyed,

    /// A thread panicked while holding the map host lock.
    #[error("map host lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for MapError {
    fn from(_: PoisonError<T>) -> Self {
        MapError::Poisoned
    }
}
