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

//! Owner-tagged layer model drawn by the map widget.
//!
//! Every layer carries a [`LayerOwner`]. The radar overlay and the fault view
//! create only [`LayerOwner::Radar`] layers and remove them by tag, so the
//! base tile layer is never touched by a refresh.

use serde::{Deserialize, Serialize};

use crate::geo::{GeoBounds, GeoPoint};

/// Identifier assigned by the map host when a layer is added.
pub type LayerId = u64;

/// Who created a layer, and therefore who may remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerOwner {
    /// The base tile layer attached at initialisation.
    Base,
    /// Layers produced by the overlay renderer or the fault presenter.
    Radar,
}

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const MAGENTA: Rgb = Rgb(0xff, 0x00, 0xff);
    pub const RED: Rgb = Rgb(0xff, 0x00, 0x00);
    pub const ORANGE: Rgb = Rgb(0xff, 0x88, 0x00);
    pub const YELLOW: Rgb = Rgb(0xff, 0xff, 0x00);
    pub const GREEN: Rgb = Rgb(0x00, 0xff, 0x00);
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);

    /// CSS-style hex string, e.g. `#ff8800`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Public slippy-map tile providers for the base layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileProvider {
    #[default]
    OpenStreetMap,
    CartoDark,
}

impl TileProvider {
    /// Get human-readable display name
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "OpenStreetMap",
            TileProvider::CartoDark => "Carto Dark",
        }
    }

    /// Short name used in config files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "osm",
            TileProvider::CartoDark => "carto-dark",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "osm" | "openstreetmap" => Some(TileProvider::OpenStreetMap),
            "carto" | "carto-dark" | "cartodark" => Some(TileProvider::CartoDark),
            _ => None,
        }
    }
}

/// Stroke and fill styling shared by rectangles and point markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub stroke: Rgb,
    pub fill: Rgb,
    pub weight: f32,
    pub stroke_opacity: f32,
    pub fill_opacity: f32,
    pub dashed: bool,
}

/// Text bubble attached to a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
    pub open: bool,
}

impl Popup {
    #[must_use]
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            open: false,
        }
    }

    #[must_use]
    pub fn opened(mut self) -> Self {
        self.open = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub provider: TileProvider,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectangleLayer {
    pub bounds: GeoBounds,
    pub style: ShapeStyle,
    pub popup: Option<Popup>,
}

/// Fixed-radius (screen pixels) point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleMarker {
    pub position: GeoPoint,
    pub radius: f32,
    pub style: ShapeStyle,
    pub popup: Option<Popup>,
}

/// Markers that are added and removed together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerGroup {
    pub markers: Vec<CircleMarker>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Tiles(TileLayer),
    Rectangle(RectangleLayer),
    Group(LayerGroup),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub owner: LayerOwner,
    pub kind: LayerKind,
}

impl Layer {
    /// Popups carried by this layer, including those of grouped markers.
    pub fn popups_mut(&mut self) -> Vec<&mut Popup> {
        match &mut self.kind {
            LayerKind::Tiles(_) => Vec::new(),
            LayerKind::Rectangle(rect) => rect.popup.iter_mut().collect(),
            LayerKind::Group(group) => group
                .markers
                .iter_mut()
                .filter_map(|marker| marker.popup.as_mut())
                .collect(),
        }
    }

    /// The currently open popup of this layer, if any.
    #[must_use]
    pub fn open_popup(&self) -> Option<&Popup> {
        match &self.kind {
            LayerKind::Tiles(_) => None,
            LayerKind::Rectangle(rect) => rect.popup.as_ref().filter(|p| p.open),
            LayerKind::Group(group) => group
                .markers
                .iter()
                .filter_map(|marker| marker.popup.as_ref())
                .find(|p| p.open),
        }
    }
}
