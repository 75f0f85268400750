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

use chrono::Duration;
use radar_client::{
    IntensityClass, Provenance, RadarSnapshot, RadarState, Status, StatusProjection,
    TileProvider,
};

/// Something the user asked for from the pane this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneAction {
    RefreshNow,
    SetTileProvider(TileProvider),
    SaveSettings,
}

const LABEL: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);
const VALUE: egui::Color32 = egui::Color32::from_rgb(200, 200, 200);
const HEADING: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);

pub struct StatusPane {
    pub visible: bool,
    pub collapsed: bool,
}

impl StatusPane {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            collapsed: false,
        }
    }

    /// Render the status pane as a floating window
    pub fn render(
        &mut self,
        ctx: &egui::Context,
        state: &RadarState,
        tile_provider: TileProvider,
    ) -> Option<PaneAction> {
        if !self.visible {
            // Show a small button to re-open the status pane when hidden
            egui::Window::new("show_status")
                .title_bar(false)
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
                .fixed_size(egui::vec2(140.0, 35.0))
                .resizable(false)
                .frame(pane_frame(ctx, 200))
                .show(ctx, |ui| {
                    if ui
                        .button(
                            egui::RichText::new("📡 Show Radar Status")
                                .color(egui::Color32::from_rgb(150, 200, 220))
                                .size(11.0),
                        )
                        .clicked()
                    {
                        self.visible = true;
                    }
                });
            return None;
        }

        let projection = state.projection();
        let mut action = None;
        let screen_height = ctx.screen_rect().height();

        egui::Window::new("Radar Status")
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
            .fixed_size(egui::vec2(
                304.0,
                if self.collapsed { 40.0 } else { screen_height.min(520.0) },
            ))
            .resizable(false)
            .collapsible(false)
            .frame(pane_frame(ctx, 230))
            .show(ctx, |ui| {
                self.render_header(ui);

                if self.collapsed {
                    return;
                }

                ui.separator();

                egui::ScrollArea::vertical()
                    .max_height(screen_height.min(470.0))
                    .show(ui, |ui| {
                        render_status_section(ui, state, &projection);
                        ui.add_space(6.0);
                        render_data_section(ui, state);
                        ui.add_space(6.0);
                        render_legend_section(ui);
                        ui.add_space(6.0);
                        render_service_section(ui, state);
                        ui.add_space(6.0);
                        action = render_controls_section(ui, tile_provider);
                    });
            });

        action
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("◈ RADAR")
                    .color(egui::Color32::from_rgb(100, 180, 220))
                    .size(12.0)
                    .strong(),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .button(
                        egui::RichText::new("✕")
                            .size(12.0)
                            .color(egui::Color32::from_rgb(200, 100, 100)),
                    )
                    .on_hover_text("Hide status pane")
                    .clicked()
                {
                    self.visible = false;
                }

                ui.add_space(4.0);

                let collapse_icon = if self.collapsed { "▼" } else { "▲" };
                if ui
                    .button(egui::RichText::new(collapse_icon).size(10.0))
                    .on_hover_text(if self.collapsed { "Expand" } else { "Collapse" })
                    .clicked()
                {
                    self.collapsed = !self.collapsed;
                }
            });
        });
    }
}

fn pane_frame(ctx: &egui::Context, alpha: u8) -> egui::Frame {
    egui::Frame::window(&ctx.style())
        .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, alpha))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 80, 100)))
        .corner_radius(6.0)
}

fn section_heading(ui: &mut egui::Ui, text: &str) {
    ui.label(egui::RichText::new(text).color(HEADING).size(10.0).strong());
    ui.add_space(3.0);
}

fn field(ui: &mut egui::Ui, label: &str, value: impl Into<String>) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(label).color(LABEL).size(9.0));
        ui.label(egui::RichText::new(value.into()).color(VALUE).size(9.0).monospace());
    });
}

/// Icon and color for the connection indicator.
pub fn status_indicator(status: Status) -> (&'static str, egui::Color32) {
    match status {
        Status::Loading => ("◐", egui::Color32::from_rgb(255, 200, 100)),
        Status::Success => ("●", egui::Color32::from_rgb(100, 255, 100)),
        Status::Error => ("✕", egui::Color32::from_rgb(255, 100, 100)),
    }
}

fn render_status_section(ui: &mut egui::Ui, state: &RadarState, projection: &StatusProjection) {
    section_heading(ui, "STATUS");

    ui.horizontal(|ui| {
        let (icon, color) = status_indicator(state.status);
        ui.label(egui::RichText::new(icon).color(color).size(10.0));
        ui.label(
            egui::RichText::new(&projection.status_label)
                .color(color)
                .size(10.0)
                .monospace()
                .strong(),
        );
    });

    field(ui, "Last update:", projection.last_update.as_str());
    field(ui, "Source:", projection.source_label.as_str());

    if let (Status::Error, Some(message)) = (state.status, state.last_error.as_deref()) {
        ui.label(
            egui::RichText::new(truncate(message, 44))
                .color(egui::Color32::from_rgb(255, 140, 140))
                .size(8.5),
        )
        .on_hover_text(message);
    }
}

fn render_data_section(ui: &mut egui::Ui, state: &RadarState) {
    section_heading(ui, "DATA");

    let Some(snapshot) = state.snapshot.as_deref() else {
        ui.label(
            egui::RichText::new("No radar data yet")
                .color(egui::Color32::from_rgb(100, 100, 100))
                .size(8.0)
                .italics(),
        );
        return;
    };

    let provenance = Provenance::from_source(snapshot.source.as_deref());
    field(ui, "Received:", received_label(snapshot));
    field(ui, "Points:", snapshot.features.len().to_string());
    field(ui, "Data:", provenance.data_label());
    if let Some(report) = &state.last_report {
        if report.dropped_features > 0 {
            field(
                ui,
                "Dropped:",
                format!("{} of {}", report.dropped_features, report.total_features),
            );
        }
        if report.features_missing {
            field(ui, "Features:", "missing in payload");
        }
    }
    if let Some(metadata) = &snapshot.metadata {
        if let Some(product) = &metadata.product {
            field(ui, "Product:", product.as_str());
        }
        if let Some(resolution) = &metadata.resolution {
            field(ui, "Resolution:", resolution.as_str());
        }
    }
    if let Some(note) = &snapshot.note {
        field(ui, "Note:", truncate(note, 36));
    }
    if state.stale_discards() > 0 {
        field(ui, "Stale skipped:", state.stale_discards().to_string());
    }
}

/// Receipt time, plus how far it trails the data when that is a minute or more.
pub fn received_label(snapshot: &RadarSnapshot) -> String {
    let received = snapshot.received_at.format("%H:%M:%S UTC");
    let lag = snapshot.received_at.signed_duration_since(snapshot.timestamp);
    if lag >= Duration::minutes(1) {
        format!("{received} ({} min after data)", lag.num_minutes())
    } else {
        received.to_string()
    }
}

/// Reflectivity range covered by one class, for the legend.
pub fn legend_range(class: IntensityClass) -> String {
    let stronger = IntensityClass::all()
        .into_iter()
        .filter(|other| other > &class)
        .filter_map(IntensityClass::threshold)
        .reduce(f64::min);
    match (class.threshold(), stronger) {
        (Some(low), Some(high)) => format!("{low:.0}-{high:.0} dBZ"),
        (Some(low), None) => format!("≥ {low:.0} dBZ"),
        (None, Some(high)) => format!("< {high:.0} dBZ"),
        (None, None) => "any".to_string(),
    }
}

fn render_legend_section(ui: &mut egui::Ui) {
    section_heading(ui, "LEGEND");

    for class in IntensityClass::all() {
        ui.horizontal(|ui| {
            let rgb = class.color();
            let (rect, _response) =
                ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
            ui.painter()
                .circle_filled(rect.center(), 5.0, egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2));
            ui.label(egui::RichText::new(class.label()).color(VALUE).size(9.0));
            ui.label(
                egui::RichText::new(legend_range(class))
                    .color(LABEL)
                    .size(8.5)
                    .monospace(),
            );
        });
    }
}

fn render_service_section(ui: &mut egui::Ui, state: &RadarState) {
    section_heading(ui, "SERVICE");

    let Some(health) = &state.health else {
        ui.label(
            egui::RichText::new("Health not checked")
                .color(egui::Color32::from_rgb(100, 100, 100))
                .size(8.0)
                .italics(),
        );
        return;
    };

    ui.horizontal(|ui| {
        let (icon, color) = if health.is_healthy() {
            ("✓", egui::Color32::from_rgb(100, 255, 100))
        } else {
            ("⚠", egui::Color32::from_rgb(255, 200, 100))
        };
        ui.label(egui::RichText::new(icon).color(color).size(10.0));
        ui.label(egui::RichText::new(&health.status).color(VALUE).size(9.0).monospace());
    });
    if let Some(source) = &health.data_source {
        field(ui, "Feed:", truncate(source, 32));
    }
    if let Some(interval) = &health.update_interval {
        field(ui, "Updates:", interval.as_str());
    }
}

fn render_controls_section(ui: &mut egui::Ui, current: TileProvider) -> Option<PaneAction> {
    section_heading(ui, "CONTROLS");

    let mut action = None;
    ui.horizontal(|ui| {
        if ui.button("⟳ Refresh now").clicked() {
            action = Some(PaneAction::RefreshNow);
        }
        if ui
            .button("💾 Save")
            .on_hover_text("Save settings to the config file")
            .clicked()
        {
            action = Some(PaneAction::SaveSettings);
        }
    });

    let mut selected = current;
    egui::ComboBox::from_label(egui::RichText::new("Base map").color(LABEL).size(9.0))
        .selected_text(selected.display_name())
        .show_ui(ui, |ui| {
            for provider in [TileProvider::OpenStreetMap, TileProvider::CartoDark] {
                ui.selectable_value(&mut selected, provider, provider.display_name());
            }
        });
    if selected != current {
        action = Some(PaneAction::SetTileProvider(selected));
    }

    action
}

/// Shorten `text` to at most `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot_received(data: (u32, u32), received: (u32, u32)) -> RadarSnapshot {
        RadarSnapshot {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, data.0, data.1, 0).unwrap(),
            received_at: Utc.with_ymd_and_hms(2024, 6, 1, received.0, received.1, 0).unwrap(),
            source: None,
            cached: false,
            note: None,
            bounds: None,
            features: Vec::new(),
            data_url: None,
            metadata: None,
        }
    }

    #[test]
    fn test_received_label() {
        assert_eq!(received_label(&snapshot_received((12, 0), (12, 0))), "12:00:00 UTC");
        assert_eq!(
            received_label(&snapshot_received((11, 48), (12, 2))),
            "12:02:00 UTC (14 min after data)"
        );
        // Data stamped ahead of the local clock shows no lag.
        assert_eq!(received_label(&snapshot_received((12, 5), (12, 0))), "12:00:00 UTC");
    }

    #[test]
    fn test_legend_ranges() {
        assert_eq!(legend_range(IntensityClass::Extreme), "≥ 50 dBZ");
        assert_eq!(legend_range(IntensityClass::Heavy), "40-50 dBZ");
        assert_eq!(legend_range(IntensityClass::Light), "20-30 dBZ");
        assert_eq!(legend_range(IntensityClass::VeryLight), "< 20 dBZ");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Connection refused by host", 10), "Connect...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_status_indicator_colors() {
        assert_eq!(status_indicator(Status::Success).0, "●");
        assert_eq!(status_indicator(Status::Error).0, "✕");
        assert_ne!(
            status_indicator(Status::Loading).1,
            status_indicator(Status::Error).1
        );
    }
}
