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

//! Base map tile sources.

use std::path::PathBuf;

use radar_client::TileProvider;
use walkers::sources::{Attribution, OpenStreetMap, TileSource};
use walkers::{HttpOptions, HttpTiles, TileId};

use crate::config::APP_NAME;

/// Tile source for Carto CDN dark basemap tiles
/// Uses subdomain load balancing across a-d.basemaps.cartocdn.com
#[derive(Debug, Clone, Copy, Default)]
pub struct CartoDarkSource;

impl TileSource for CartoDarkSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((tile_id.x + tile_id.y) % 4) as usize];

        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            subdomain, tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenStreetMap contributors, © CARTO",
            url: "https://carto.com/attributions",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// On-disk cache directory for one provider's tiles.
#[must_use]
pub fn cache_dir(provider: TileProvider) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_NAME)
        .join("tiles")
        .join(provider.as_str())
}

/// Create cached HTTP tiles for `provider`.
pub fn create_tiles(provider: TileProvider, ctx: &egui::Context) -> HttpTiles {
    let http_options = HttpOptions {
        cache: Some(cache_dir(provider)),
        ..Default::default()
    };

    log::info!("Loading {} tiles", provider.display_name());
    match provider {
        TileProvider::OpenStreetMap => HttpTiles::with_options(OpenStreetMap, http_options, ctx.clone()),
        TileProvider::CartoDark => HttpTiles::with_options(CartoDarkSource, http_options, ctx.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carto_url_spreads_subdomains() {
        let url = CartoDarkSource.tile_url(TileId { x: 3, y: 2, zoom: 4 });
        assert_eq!(url, "https://b.basemaps.cartocdn.com/dark_all/4/3/2.png");

        let url = CartoDarkSource.tile_url(TileId { x: 4, y: 0, zoom: 5 });
        assert!(url.starts_with("https://a."));
    }

    #[test]
    fn test_cache_dir_is_per_provider() {
        let osm = cache_dir(TileProvider::OpenStreetMap);
        let carto = cache_dir(TileProvider::CartoDark);
        assert_ne!(osm, carto);
        assert!(osm.ends_with("tiles/osm"));
        assert!(carto.to_string_lossy().contains(APP_NAME));
    }
}
