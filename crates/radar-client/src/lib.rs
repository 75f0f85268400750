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

//! Radar reflectivity overlay lifecycle for slippy-map displays.
//!
//! This library owns everything about the radar overlay that involves a
//! decision, independent of any GUI toolkit:
//!
//! - **Protocol layer**: decoding the radar service envelope and defensive
//!   validation into an immutable [`RadarSnapshot`]
//! - **Classification**: mapping reflectivity (dBZ) to an [`IntensityClass`]
//! - **Map host**: the viewport and the owner-tagged layer stack a widget draws
//! - **Overlay renderer / fault presenter**: atomic replacement of the
//!   radar-owned layers with either the data view or a diagnostic view
//! - **Refresh scheduler**: fixed-period ticks with cancellation
//! - **State and projection**: status transitions and the three status strings
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use radar_client::{HeadlessSurface, HttpRadarSource, OverlayConfig, RadarOverlay};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = HttpRadarSource::new(
//!         "http://localhost:5000/api/radar/latest",
//!         Duration::from_secs(30),
//!     )
//!     .expect("http client");
//!
//!     let overlay = RadarOverlay::mount(
//!         Arc::new(HeadlessSurface),
//!         Arc::new(source),
//!         OverlayConfig::default(),
//!     );
//!
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     let status = overlay.projection();
//!     println!("{} | {} | {}", status.status_label, status.last_update, status.source_label);
//!
//!     overlay.unmount();
//! }
//! ```

pub mod controller;
pub mod error;
pub mod geo;
pub mod intensity;
pub mod layers;
pub mod map;
pub mod overlay;
pub mod protocol;
pub mod scheduler;
pub mod source;
pub mod state;

pub use controller::{run_tick, DiscardReason, OverlayConfig, RadarOverlay, TickOutcome};
pub use error::{MapError, RadarError};
pub use geo::{GeoBounds, GeoPoint, WebMercator};
pub use intensity::IntensityClass;
pub use layers::{
    CircleMarker, Layer, LayerGroup, LayerId, LayerKind, LayerOwner, Popup, RectangleLayer, Rgb,
    ShapeStyle, TileLayer, TileProvider,
};
pub use map::{DisplaySurface, HeadlessSurface, MapHandle, MapHost, MapOptions, Viewport};
pub use overlay::{render, render_fault, Provenance, RenderSummary};
pub use protocol::{
    decode_envelope, validate, DataMetadata, RadarEnvelope, RadarPoint, RadarSnapshot,
    ValidationReport,
};
pub use scheduler::{CancelToken, RefreshScheduler, Tick, DEFAULT_REFRESH_PERIOD};
pub use source::{HealthReport, HttpRadarSource, RadarSource};
pub use state::{RadarState, SharedRadarState, Status, StatusProjection};
