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

mod app;
mod config;
mod map;
mod status_pane;

use clap::Parser;
use config::AppConfig;
use log::{info, warn};
use mimalloc::MiMalloc;
use radar_client::{HttpRadarSource, TileProvider};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Desktop viewer for NOAA MRMS radar reflectivity.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Radar endpoint URL (overrides the config file for this run)
    #[arg(long)]
    endpoint: Option<String>,

    /// Seconds between radar refreshes
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Base map tiles: osm or carto-dark
    #[arg(long, value_parser = parse_tiles)]
    tiles: Option<TileProvider>,
}

fn parse_tiles(name: &str) -> Result<TileProvider, String> {
    TileProvider::from_name(name).ok_or_else(|| format!("unknown tile provider '{name}'"))
}

impl Cli {
    /// Apply command-line overrides on top of the stored configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint_url.clone_from(endpoint);
        }
        if let Some(secs) = self.interval_secs {
            config.refresh_interval_secs = secs;
        }
        if let Some(tiles) = self.tiles {
            config.tile_provider = tiles;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Could not load config, using defaults: {e}");
        AppConfig::default()
    });
    cli.apply(&mut config);

    info!(
        "Starting MRMS Radar Desktop ({}, every {}s)",
        config.endpoint_url, config.refresh_interval_secs
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("radar-worker")
        .build()?;

    let mut source = HttpRadarSource::new(config.endpoint_url.clone(), config.request_timeout())?;
    if let Some(url) = config.health_endpoint() {
        source = source.with_health_endpoint(url);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_title("MRMS Radar Desktop"),
        ..Default::default()
    };

    eframe::run_native(
        "MRMS Radar Desktop",
        options,
        Box::new(move |cc| Ok(Box::new(app::RadarApp::new(cc, runtime, config, source)))),
    )?;
    Ok(())
}
