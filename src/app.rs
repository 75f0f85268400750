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

//! Main window: map, radar overlay and status pane.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use log::{error, info, warn};
use radar_client::{
    HttpRadarSource, LayerKind, RadarOverlay, RadarState, SharedRadarState, TileProvider,
};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::map::{EguiSurface, MapView};
use crate::status_pane::{PaneAction, StatusPane};

/// Fields drop in order: the overlay unmounts before the runtime shuts down.
pub struct RadarApp {
    overlay: RadarOverlay,
    map_view: MapView,
    status_pane: StatusPane,
    health_task: Option<JoinHandle<()>>,
    config: AppConfig,
    runtime: Runtime,
}

impl RadarApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Runtime,
        config: AppConfig,
        source: HttpRadarSource,
    ) -> Self {
        let surface = Arc::new(EguiSurface(cc.egui_ctx.clone()));

        // Mounting spawns the refresh loop, so it needs the runtime entered.
        let overlay = {
            let _guard = runtime.enter();
            RadarOverlay::mount(surface, Arc::new(source.clone()), config.overlay_config())
        };

        let health_task = config.health_endpoint().map(|_| {
            runtime.spawn(health_loop(
                source,
                overlay.state(),
                config.refresh_period(),
                cc.egui_ctx.clone(),
            ))
        });

        info!("Radar overlay mounted for {}", config.endpoint_url);

        Self {
            overlay,
            map_view: MapView::new(),
            status_pane: StatusPane::new(config.status_pane_visible),
            health_task,
            config,
            runtime,
        }
    }

    fn handle_action(&mut self, action: PaneAction) {
        match action {
            PaneAction::RefreshNow => {
                info!("Manual radar refresh requested");
                self.overlay.refresh_now();
            }
            PaneAction::SetTileProvider(provider) => self.set_tile_provider(provider),
            PaneAction::SaveSettings => {
                self.config.status_pane_visible = self.status_pane.visible;
                match self.config.save() {
                    Ok(()) => {
                        if let Ok(path) = AppConfig::get_config_path() {
                            info!("Settings saved to {}", path.display());
                        }
                    }
                    Err(e) => error!("Failed to save settings: {e}"),
                }
            }
        }
    }

    fn set_tile_provider(&mut self, provider: TileProvider) {
        self.config.tile_provider = provider;
        if let Err(e) = self
            .overlay
            .handle()
            .with_host(|host| host.set_tile_provider(provider))
        {
            warn!("Could not switch base map: {e}");
        }
    }

    fn current_tile_provider(&self) -> TileProvider {
        self.overlay
            .handle()
            .read(|host| {
                host.layers().iter().find_map(|layer| match &layer.kind {
                    LayerKind::Tiles(tiles) => Some(tiles.provider),
                    _ => None,
                })
            })
            .ok()
            .flatten()
            .unwrap_or(self.config.tile_provider)
    }
}

/// Poll the service health endpoint once per refresh period.
async fn health_loop(
    source: HttpRadarSource,
    state: SharedRadarState,
    period: Duration,
    ctx: egui::Context,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match source.health().await {
            Ok(report) => {
                if !report.is_healthy() {
                    warn!("Radar service reports status '{}'", report.status);
                }
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_health(report);
                ctx.request_repaint();
            }
            Err(e) => warn!("{e}"),
        }
    }
}

impl eframe::App for RadarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep "last update" and health fresh even when nothing else repaints.
        ctx.request_repaint_after(Duration::from_secs(1));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.map_view.show(ui, self.overlay.handle());
            });

        let state: RadarState = self
            .overlay
            .state()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let provider = self.current_tile_provider();
        if let Some(action) = self.status_pane.render(ctx, &state, provider) {
            self.handle_action(action);
        }
    }
}

impl Drop for RadarApp {
    fn drop(&mut self) {
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
        self.overlay.unmount();
        info!("Radar app closed ({} worker threads)", self.runtime.metrics().num_workers());
    }
}
