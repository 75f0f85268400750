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

//! Overlay renderer and fault presenter.
//!
//! Both replace the radar-owned layer set on the map host in one critical
//! section: remove every [`LayerOwner::Radar`] layer, then add the new set.
//! A success render adds the coverage rectangle plus one marker group; a
//! fault adds a single alert rectangle. Either way exactly one overlay set
//! is attached afterwards.

use log::{debug, info, warn};

use crate::error::MapError;
use crate::geo::{GeoBounds, GeoPoint};
use crate::layers::{
    CircleMarker, LayerGroup, LayerKind, LayerOwner, Popup, RectangleLayer, Rgb, ShapeStyle,
};
use crate::map::{MapHandle, MapHost};
use crate::protocol::{RadarPoint, RadarSnapshot};

/// Padding applied on every side when fitting the view to rendered points.
pub const FIT_PADDING_PX: f32 = 30.0;

/// Fitting to data never zooms in past this level.
pub const FIT_MAX_ZOOM: f64 = 6.0;

/// Source-label marker identifying the authoritative NOAA feed.
const AUTHORITATIVE_MARKER: &str = "MRMS";

const COVERAGE_STROKE: Rgb = Rgb(0x00, 0x66, 0xcc);
const COVERAGE_FILL: Rgb = Rgb(0x33, 0x99, 0xff);
const ALERT_STROKE: Rgb = Rgb(0xff, 0x33, 0x33);
const ALERT_FILL: Rgb = Rgb(0xff, 0x00, 0x00);

const FAULT_TITLE: &str = "Radar Data Unavailable";
const REMEDIATION: [&str; 3] = [
    "Check that the radar data service is running and reachable.",
    "Verify your network connection.",
    "The map retries automatically on the next refresh.",
];

/// Where a snapshot's data comes from, judged by its source label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The recognised NOAA MRMS feed.
    Authoritative,
    /// Any other or unlabelled source.
    Enhanced,
}

impl Provenance {
    #[must_use]
    pub fn from_source(source: Option<&str>) -> Self {
        match source {
            Some(label) if label.to_ascii_uppercase().contains(AUTHORITATIVE_MARKER) => {
                Provenance::Authoritative
            }
            _ => Provenance::Enhanced,
        }
    }

    #[must_use]
    pub fn data_label(self) -> &'static str {
        match self {
            Provenance::Authoritative => "real NOAA MRMS data",
            Provenance::Enhanced => "enhanced radar data",
        }
    }

    #[must_use]
    pub fn marker_radius(self) -> f32 {
        match self {
            Provenance::Authoritative => 6.0,
            Provenance::Enhanced => 5.0,
        }
    }

    #[must_use]
    pub fn marker_fill_opacity(self) -> f32 {
        match self {
            Provenance::Authoritative => 0.8,
            Provenance::Enhanced => 0.7,
        }
    }
}

/// What a success render put on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub coverage: GeoBounds,
    pub markers: usize,
    /// The view was refit to the rendered points.
    pub refit: bool,
}

/// Replace the radar layers on `handle` with `snapshot`.
pub fn render(handle: &MapHandle, snapshot: &RadarSnapshot) -> Result<RenderSummary, MapError> {
    handle.with_host(|host| render_into(host, snapshot))
}

/// Replace the radar layers on `handle` with the diagnostic view.
pub fn render_fault(handle: &MapHandle, message: &str) -> Result<(), MapError> {
    handle.with_host(|host| render_fault_into(host, message))
}

/// [`render`] for a caller that already holds the host.
pub fn render_into(host: &mut MapHost, snapshot: &RadarSnapshot) -> RenderSummary {
    let provenance = Provenance::from_source(snapshot.source.as_deref());
    let coverage = snapshot.bounds.unwrap_or(GeoBounds::CONUS);
    if snapshot.bounds.is_none() {
        debug!("Snapshot has no bounds; using CONUS coverage");
    }

    let markers: Vec<CircleMarker> = snapshot
        .features
        .iter()
        .map(|point| point_marker(point, snapshot, provenance))
        .collect();
    let extent = GeoBounds::from_points(markers.iter().map(|m| m.position));
    let marker_count = markers.len();

    host.replace_owned(
        LayerOwner::Radar,
        vec![
            LayerKind::Rectangle(coverage_rectangle(snapshot, coverage, provenance)),
            LayerKind::Group(LayerGroup { markers }),
        ],
    );

    let refit = match extent {
        Some(extent) => {
            host.fit_bounds(&extent, FIT_PADDING_PX, FIT_MAX_ZOOM);
            true
        }
        None => false,
    };

    info!(
        "Rendered {} radar points from {} ({})",
        marker_count,
        snapshot.source.as_deref().unwrap_or("unknown source"),
        provenance.data_label()
    );

    RenderSummary {
        coverage,
        markers: marker_count,
        refit,
    }
}

/// [`render_fault`] for a caller that already holds the host.
pub fn render_fault_into(host: &mut MapHost, message: &str) {
    warn!("Showing radar fault overlay: {message}");

    let mut lines = vec![format!("Error: {message}"), String::new()];
    lines.extend(REMEDIATION.iter().map(|line| (*line).to_string()));

    host.replace_owned(
        LayerOwner::Radar,
        vec![LayerKind::Rectangle(RectangleLayer {
            bounds: GeoBounds::CONUS,
            style: ShapeStyle {
                stroke: ALERT_STROKE,
                fill: ALERT_FILL,
                weight: 2.0,
                stroke_opacity: 0.9,
                fill_opacity: 0.15,
                dashed: true,
            },
            popup: Some(Popup::new(FAULT_TITLE, lines).opened()),
        })],
    );
}

fn coverage_rectangle(
    snapshot: &RadarSnapshot,
    coverage: GeoBounds,
    provenance: Provenance,
) -> RectangleLayer {
    let freshness = if snapshot.cached { "Cached" } else { "Live" };
    let mut lines = vec![
        format!("Source: {}", snapshot.source.as_deref().unwrap_or("Unknown")),
        format!("Data: {freshness} {}", provenance.data_label()),
        format!("Updated: {}", snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
        format!("Data points: {}", snapshot.features.len()),
    ];
    if let Some(metadata) = &snapshot.metadata {
        match (&metadata.product, &metadata.resolution) {
            (Some(product), Some(resolution)) => {
                lines.push(format!("Product: {product} ({resolution})"));
            }
            (Some(product), None) => lines.push(format!("Product: {product}")),
            _ => {}
        }
    }
    if let Some(note) = &snapshot.note {
        lines.push(format!("Status: {note}"));
    }

    RectangleLayer {
        bounds: coverage,
        style: ShapeStyle {
            stroke: COVERAGE_STROKE,
            fill: COVERAGE_FILL,
            weight: 2.0,
            stroke_opacity: 0.8,
            fill_opacity: 0.05,
            dashed: false,
        },
        popup: Some(Popup::new("Weather Radar Coverage", lines).opened()),
    }
}

fn point_marker(point: &RadarPoint, snapshot: &RadarSnapshot, provenance: Provenance) -> CircleMarker {
    let class = point.intensity();
    let color = class.color();

    let GeoPoint { lat, lon } = point.position;
    let mut lines = vec![
        format!("Intensity: {}", class.label()),
        format!("Location: {lat:.2}, {lon:.2}"),
    ];
    if let Some(system) = &point.system_type {
        lines.push(format!("System: {system}"));
    }
    lines.push(format!(
        "Source: {}",
        snapshot.source.as_deref().unwrap_or("Unknown")
    ));

    CircleMarker {
        position: point.position,
        radius: provenance.marker_radius(),
        style: ShapeStyle {
            stroke: color,
            fill: color,
            weight: 1.0,
            stroke_opacity: 1.0,
            fill_opacity: provenance.marker_fill_opacity(),
            dashed: false,
        },
        popup: Some(Popup::new(format!("{:.1} dBZ", point.reflectivity_dbz), lines)),
    }
}
