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

//! Map widget: walkers tiles, the radar layer plugin and the bridge that
//! keeps the widget and the radar map host in step.

pub mod plugin;
pub mod tiles;

use radar_client::{DisplaySurface, GeoPoint, LayerKind, MapHandle, TileProvider};
use walkers::{HttpTiles, Map, MapMemory, Tiles};

pub use plugin::RadarLayersPlugin;

/// Display surface backed by the window's egui context.
#[derive(Debug, Clone)]
pub struct EguiSurface(pub egui::Context);

impl DisplaySurface for EguiSurface {
    fn request_repaint(&self) {
        self.0.request_repaint();
    }
}

/// Widget state that survives between frames.
pub struct MapView {
    tiles: Option<HttpTiles>,
    tiles_provider: Option<TileProvider>,
    memory: MapMemory,
    applied_revision: u64,
}

impl MapView {
    pub fn new() -> Self {
        Self {
            tiles: None,
            tiles_provider: None,
            memory: MapMemory::default(),
            applied_revision: 0,
        }
    }

    /// Draw the map for `handle` into the remaining space of `ui`.
    pub fn show(&mut self, ui: &mut egui::Ui, handle: &MapHandle) {
        let Ok((viewport, layers)) =
            handle.read(|host| (host.viewport().clone(), host.layers().to_vec()))
        else {
            ui.centered_and_justified(|ui| {
                ui.label("Map unavailable");
            });
            return;
        };

        let provider = layers
            .iter()
            .find_map(|layer| match &layer.kind {
                LayerKind::Tiles(tiles) => Some(tiles.provider),
                _ => None,
            })
            .unwrap_or_default();
        if self.tiles_provider != Some(provider) {
            self.tiles = Some(tiles::create_tiles(provider, ui.ctx()));
            self.tiles_provider = Some(provider);
        }

        // The host moved the view (startup or fit to data).
        if viewport.revision != self.applied_revision {
            self.memory
                .center_at(walkers::lat_lon(viewport.center.lat, viewport.center.lon));
            if self.memory.set_zoom(viewport.zoom).is_err() {
                log::warn!("Map widget rejected zoom {}", viewport.zoom);
            }
            self.applied_revision = viewport.revision;
        }

        let home = walkers::lat_lon(viewport.center.lat, viewport.center.lon);
        let tiles = self.tiles.as_mut().map(|t| t as &mut dyn Tiles);
        let response = ui.add(
            Map::new(tiles, &mut self.memory, home)
                .with_plugin(RadarLayersPlugin::new(layers, handle.clone())),
        );

        let zoom = self.memory.zoom().clamp(viewport.min_zoom, viewport.max_zoom);
        if (zoom - self.memory.zoom()).abs() > f64::EPSILON {
            let _ = self.memory.set_zoom(zoom);
        }
        let center = self
            .memory
            .detached()
            .map_or(viewport.center, |position| GeoPoint::new(position.y(), position.x()));
        let size = response.rect.size();

        // Losing the race with unmount is fine; the next frame shows nothing.
        let _ = handle.with_host(|host| {
            host.set_viewport_size(size.x, size.y);
            host.sync_view(center, zoom);
        });
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}
