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

//! Map host: the viewport and the layer stack a map widget draws.
//!
//! [`MapHost::initialize`] creates the single host for a display surface and
//! returns a cloneable [`MapHandle`]. Every operation goes through the handle,
//! which serialises access and refuses to run once [`MapHandle::destroy`] has
//! been called, so late completions become no-ops instead of touching a
//! torn-down map.

use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::error::MapError;
use crate::geo::{GeoBounds, GeoPoint, WebMercator};
use crate::layers::{Layer, LayerId, LayerKind, LayerOwner, TileLayer, TileProvider};

/// Geographic centre of the contiguous United States.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(39.8283, -98.5795);
pub const DEFAULT_ZOOM: f64 = 4.0;
pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 10.0;

/// Tile edge length in pixels used for zoom computations.
const TILE_SIZE: f64 = 256.0;

/// Surface the map is mounted into, supplied by the page/window shell.
pub trait DisplaySurface: Send + Sync {
    /// Ask the surface to redraw because layers or the viewport changed.
    fn request_repaint(&self);
}

/// Surface for running without a window (tests, command-line tools).
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

impl DisplaySurface for HeadlessSurface {
    fn request_repaint(&self) {}
}

/// Initial viewport and base layer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: GeoPoint,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub tile_provider: TileProvider,
    /// Initial pixel size, used until the widget reports its real size.
    pub viewport_size: (f32, f32),
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            tile_provider: TileProvider::default(),
            viewport_size: (1400.0, 800.0),
        }
    }
}

/// Programmatic view of the map.
///
/// `revision` increases every time the host moves the view itself (initial
/// view, fit to data). Widgets re-apply the view when it changes and
/// otherwise leave user panning alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub width: f32,
    pub height: f32,
    pub revision: u64,
}

/// Owner of the viewport and every layer drawn on it.
pub struct MapHost {
    surface: Arc<dyn DisplaySurface>,
    viewport: Viewport,
    layers: Vec<Layer>,
    next_layer_id: LayerId,
    changed: bool,
}

impl std::fmt::Debug for MapHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapHost")
            .field("viewport", &self.viewport)
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl MapHost {
    /// Create the host on `surface` with the base tile layer attached.
    #[must_use]
    pub fn initialize(surface: Arc<dyn DisplaySurface>, options: MapOptions) -> MapHandle {
        let min_zoom = options.min_zoom.min(options.max_zoom);
        let max_zoom = options.max_zoom.max(options.min_zoom);
        let mut host = MapHost {
            surface,
            viewport: Viewport {
                center: options.center,
                zoom: options.zoom.clamp(min_zoom, max_zoom),
                min_zoom,
                max_zoom,
                width: options.viewport_size.0,
                height: options.viewport_size.1,
                revision: 1,
            },
            layers: Vec::new(),
            next_layer_id: 1,
            changed: false,
        };
        host.add_layer(
            LayerOwner::Base,
            LayerKind::Tiles(TileLayer {
                provider: options.tile_provider,
            }),
        );
        host.flush();

        info!(
            "Map initialised at {:.4}, {:.4} zoom {} ({})",
            host.viewport.center.lat,
            host.viewport.center.lon,
            host.viewport.zoom,
            options.tile_provider.display_name()
        );

        MapHandle {
            inner: Arc::new(Mutex::new(Some(host))),
        }
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layers created by `owner`, in drawing order.
    pub fn layers_owned_by(&self, owner: LayerOwner) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(move |layer| layer.owner == owner)
    }

    /// Append a layer on top of the stack.
    pub fn add_layer(&mut self, owner: LayerOwner, kind: LayerKind) -> LayerId {
        let id = self.next_layer_id;
        self.next_layer_id += 1;
        self.layers.push(Layer { id, owner, kind });
        self.changed = true;
        id
    }

    /// Remove every layer tagged with `owner`; returns how many were removed.
    pub fn remove_owned(&mut self, owner: LayerOwner) -> usize {
        let before = self.layers.len();
        self.layers.retain(|layer| layer.owner != owner);
        let removed = before - self.layers.len();
        if removed > 0 {
            self.changed = true;
        }
        removed
    }

    /// Remove-then-add for `owner` as one step on the host.
    pub fn replace_owned(&mut self, owner: LayerOwner, kinds: Vec<LayerKind>) -> Vec<LayerId> {
        let removed = self.remove_owned(owner);
        debug!("Replacing {removed} {owner:?} layers with {}", kinds.len());
        kinds
            .into_iter()
            .map(|kind| self.add_layer(owner, kind))
            .collect()
    }

    /// Swap the base tile provider without touching other layers.
    pub fn set_tile_provider(&mut self, provider: TileProvider) {
        for layer in &mut self.layers {
            if let LayerKind::Tiles(tiles) = &mut layer.kind {
                if tiles.provider != provider {
                    tiles.provider = provider;
                    self.changed = true;
                }
            }
        }
    }

    /// Move the view programmatically.
    pub fn set_view(&mut self, center: GeoPoint, zoom: f64) {
        self.viewport.center = center;
        self.viewport.zoom = zoom.clamp(self.viewport.min_zoom, self.viewport.max_zoom);
        self.viewport.revision += 1;
        self.changed = true;
    }

    /// Record where the user has panned/zoomed to. Does not bump the
    /// revision, so the widget is not told to move.
    pub fn sync_view(&mut self, center: GeoPoint, zoom: f64) {
        self.viewport.center = center;
        self.viewport.zoom = zoom.clamp(self.viewport.min_zoom, self.viewport.max_zoom);
    }

    /// Pixel size of the widget, reported every frame.
    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.viewport.width = width.max(1.0);
        self.viewport.height = height.max(1.0);
    }

    /// Fit the view to `bounds` with `padding_px` on each side, never zooming
    /// in beyond `max_zoom`. Zoom snaps down to a whole level.
    pub fn fit_bounds(&mut self, bounds: &GeoBounds, padding_px: f32, max_zoom: f64) {
        let zoom = self.bounds_zoom(bounds, padding_px).min(max_zoom);
        self.set_view(bounds.mercator_center(), zoom);
    }

    /// Largest whole zoom at which `bounds` fits inside the padded viewport.
    #[must_use]
    pub fn bounds_zoom(&self, bounds: &GeoBounds, padding_px: f32) -> f64 {
        let available_w = f64::from((self.viewport.width - 2.0 * padding_px).max(1.0));
        let available_h = f64::from((self.viewport.height - 2.0 * padding_px).max(1.0));

        let span_x = (WebMercator::lon_to_x(bounds.north_east.lon, 0)
            - WebMercator::lon_to_x(bounds.south_west.lon, 0))
        .abs()
            * TILE_SIZE;
        let span_y = (WebMercator::lat_to_y(bounds.south_west.lat, 0)
            - WebMercator::lat_to_y(bounds.north_east.lat, 0))
        .abs()
            * TILE_SIZE;

        if span_x <= f64::EPSILON && span_y <= f64::EPSILON {
            return self.viewport.max_zoom;
        }

        let scale = (available_w / span_x).min(available_h / span_y);
        scale.log2().floor()
    }

    /// Open one popup and close every other, like a web map does.
    ///
    /// `marker` selects a marker within a group layer; `None` targets the
    /// layer's own popup. Returns `false` if nothing matched.
    pub fn open_popup(&mut self, layer_id: LayerId, marker: Option<usize>) -> bool {
        let exists = self.layers.iter().any(|layer| {
            layer.id == layer_id
                && match (&layer.kind, marker) {
                    (LayerKind::Rectangle(rect), None) => rect.popup.is_some(),
                    (LayerKind::Group(group), Some(index)) => group
                        .markers
                        .get(index)
                        .is_some_and(|m| m.popup.is_some()),
                    _ => false,
                }
        });
        if !exists {
            return false;
        }

        self.close_popups();
        for layer in &mut self.layers {
            if layer.id != layer_id {
                continue;
            }
            match (&mut layer.kind, marker) {
                (LayerKind::Rectangle(rect), None) => {
                    if let Some(popup) = rect.popup.as_mut() {
                        popup.open = true;
                    }
                }
                (LayerKind::Group(group), Some(index)) => {
                    if let Some(popup) = group.markers.get_mut(index).and_then(|m| m.popup.as_mut()) {
                        popup.open = true;
                    }
                }
                _ => {}
            }
        }
        self.changed = true;
        true
    }

    pub fn close_popups(&mut self) {
        for layer in &mut self.layers {
            for popup in layer.popups_mut() {
                if popup.open {
                    popup.open = false;
                    self.changed = true;
                }
            }
        }
    }

    /// Notify the surface if anything changed since the last flush.
    fn flush(&mut self) {
        if self.changed {
            self.changed = false;
            self.surface.request_repaint();
        }
    }
}

/// Cloneable handle to the single map host.
#[derive(Debug, Clone)]
pub struct MapHandle {
    inner: Arc<Mutex<Option<MapHost>>>,
}

impl MapHandle {
    /// Run `f` with exclusive access to the host. Changes made by `f` are
    /// pushed to the display surface when it returns.
    pub fn with_host<R>(&self, f: impl FnOnce(&mut MapHost) -> R) -> Result<R, MapError> {
        let mut guard = self.inner.lock()?;
        let host = guard.as_mut().ok_or(MapError::Destroyed)?;
        let result = f(host);
        host.flush();
        Ok(result)
    }

    /// Run `f` with shared access to the host.
    pub fn read<R>(&self, f: impl FnOnce(&MapHost) -> R) -> Result<R, MapError> {
        let guard = self.inner.lock()?;
        let host = guard.as_ref().ok_or(MapError::Destroyed)?;
        Ok(f(host))
    }

    /// Whether the host is still alive.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Tear the host down and release its layers. Returns `true` only for
    /// the call that actually destroyed it; later calls are no-ops.
    pub fn destroy(&self) -> bool {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.take() {
            Some(host) => {
                info!("Map destroyed ({} layers released)", host.layers.len());
                true
            }
            None => false,
        }
    }
}
