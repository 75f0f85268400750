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

//! Application configuration management.
//!
//! Persistent settings are stored as TOML through `confy`. Every field has
//! a serde default so older or hand-edited files keep loading.

use std::time::Duration;

use radar_client::{MapOptions, OverlayConfig, TileProvider, DEFAULT_REFRESH_PERIOD};
use serde::{Deserialize, Serialize};

/// Name used for the config directory and the tile cache.
pub const APP_NAME: &str = "mrms-radar-desktop";

/// Default radar endpoint of a locally running radar service
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/radar/latest";

/// Default health endpoint of the same service
pub const DEFAULT_HEALTH_ENDPOINT: &str = "http://localhost:5000/health";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// URL returning the latest radar envelope
    #[serde(default = "default_endpoint")]
    pub endpoint_url: String,

    /// URL of the service health check (empty disables it)
    #[serde(default = "default_health_url")]
    pub health_url: String,

    /// Seconds between radar refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base map tiles
    #[serde(default)]
    pub tile_provider: TileProvider,

    /// Status pane visible at startup
    #[serde(default = "default_true")]
    pub status_pane_visible: bool,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_health_url() -> String {
    DEFAULT_HEALTH_ENDPOINT.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_PERIOD.as_secs()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            endpoint_url: default_endpoint(),
            health_url: default_health_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            tile_provider: TileProvider::default(),
            status_pane_visible: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Refresh period, never shorter than one second.
    #[must_use]
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Health URL, or `None` when the check is disabled.
    #[must_use]
    pub fn health_endpoint(&self) -> Option<&str> {
        Some(self.health_url.trim()).filter(|url| !url.is_empty())
    }

    /// Overlay settings derived from this configuration.
    #[must_use]
    pub fn overlay_config(&self) -> OverlayConfig {
        OverlayConfig {
            refresh_period: self.refresh_period(),
            map: MapOptions {
                tile_provider: self.tile_provider,
                ..MapOptions::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"endpoint_url": "http://radar.local/api/radar/latest"}"#)
                .unwrap();
        assert_eq!(config.endpoint_url, "http://radar.local/api/radar/latest");
        assert_eq!(config.health_url, DEFAULT_HEALTH_ENDPOINT);
        assert_eq!(config.refresh_interval_secs, 120);
        assert_eq!(config.tile_provider, TileProvider::OpenStreetMap);
        assert!(config.status_pane_visible);
    }

    #[test]
    fn test_overlay_config_uses_interval_and_tiles() {
        let config = AppConfig {
            refresh_interval_secs: 0,
            tile_provider: TileProvider::CartoDark,
            ..AppConfig::default()
        };
        let overlay = config.overlay_config();
        assert_eq!(overlay.refresh_period, Duration::from_secs(1));
        assert_eq!(overlay.map.tile_provider, TileProvider::CartoDark);
        assert_eq!(overlay.map.zoom, 4.0);
    }

    #[test]
    fn test_blank_health_url_disables_check() {
        let config = AppConfig {
            health_url: "  ".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.health_endpoint(), None);
        assert_eq!(
            AppConfig::default().health_endpoint(),
            Some(DEFAULT_HEALTH_ENDPOINT)
        );
    }
}
