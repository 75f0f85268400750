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

//! Walkers plugin that draws the map host's layers.

use radar_client::{
    CircleMarker, GeoBounds, GeoPoint, Layer, LayerId, LayerKind, MapHandle, Popup, Rgb,
    ShapeStyle,
};
use walkers::{MapMemory, Plugin, Projector};

/// Extra pixels around a marker that still count as a click on it
const CLICK_TOLERANCE_PX: f32 = 4.0;

const POPUP_WIDTH: f32 = 260.0;

/// Clickable area of something that carries a popup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitShape {
    Circle { center: egui::Pos2, radius: f32 },
    Rect(egui::Rect),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTarget {
    pub layer: LayerId,
    pub marker: Option<usize>,
    pub shape: HitShape,
}

/// Pick the popup owner under `click`: the nearest marker first, then the
/// topmost rectangle.
#[must_use]
pub fn pick(targets: &[HitTarget], click: egui::Pos2) -> Option<(LayerId, Option<usize>)> {
    let nearest_marker = targets
        .iter()
        .filter_map(|target| match target.shape {
            HitShape::Circle { center, radius } => {
                let distance = center.distance(click);
                (distance <= radius + CLICK_TOLERANCE_PX).then_some((target, distance))
            }
            HitShape::Rect(_) => None,
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(target, _)| (target.layer, target.marker));

    nearest_marker.or_else(|| {
        targets.iter().rev().find_map(|target| match target.shape {
            HitShape::Rect(rect) if rect.contains(click) => Some((target.layer, target.marker)),
            _ => None,
        })
    })
}

fn color(rgb: Rgb, opacity: f32) -> egui::Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(rgb.0, rgb.1, rgb.2, alpha)
}

fn screen_pos(projector: &Projector, point: GeoPoint) -> egui::Pos2 {
    let v = projector.project(walkers::lat_lon(point.lat, point.lon));
    egui::pos2(v.x, v.y)
}

fn screen_rect(projector: &Projector, bounds: &GeoBounds) -> egui::Rect {
    egui::Rect::from_two_pos(
        screen_pos(projector, bounds.north_west()),
        screen_pos(projector, bounds.south_east()),
    )
}

/// Draws radar and fault layers on top of the base tiles and turns clicks
/// into popup changes on the host.
#[derive(Debug)]
pub struct RadarLayersPlugin {
    layers: Vec<Layer>,
    handle: MapHandle,
}

impl RadarLayersPlugin {
    pub fn new(layers: Vec<Layer>, handle: MapHandle) -> Self {
        Self { layers, handle }
    }
}

impl Plugin for RadarLayersPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &MapMemory,
    ) {
        let painter = ui.painter();
        let clip = ui.clip_rect();
        let mut targets = Vec::new();
        let mut open_popups = Vec::new();

        for layer in &self.layers {
            match &layer.kind {
                LayerKind::Tiles(_) => {}
                LayerKind::Rectangle(rect) => {
                    let area = screen_rect(projector, &rect.bounds);
                    draw_rectangle(painter, area, &rect.style);
                    if let Some(popup) = &rect.popup {
                        targets.push(HitTarget {
                            layer: layer.id,
                            marker: None,
                            shape: HitShape::Rect(area),
                        });
                        if popup.open {
                            open_popups.push((area.center(), popup));
                        }
                    }
                }
                LayerKind::Group(group) => {
                    for (index, marker) in group.markers.iter().enumerate() {
                        let center = screen_pos(projector, marker.position);
                        if !clip.expand(marker.radius).contains(center) {
                            continue;
                        }
                        draw_marker(painter, center, marker);
                        if let Some(popup) = &marker.popup {
                            targets.push(HitTarget {
                                layer: layer.id,
                                marker: Some(index),
                                shape: HitShape::Circle {
                                    center,
                                    radius: marker.radius,
                                },
                            });
                            if popup.open {
                                open_popups.push((center - egui::vec2(0.0, marker.radius), popup));
                            }
                        }
                    }
                }
            }
        }

        for (anchor, popup) in open_popups {
            draw_popup(painter, anchor, popup);
        }

        if response.clicked() {
            if let Some(click) = response.interact_pointer_pos() {
                let picked = pick(&targets, click);
                let result = self.handle.with_host(|host| match picked {
                    Some((layer, marker)) => {
                        host.open_popup(layer, marker);
                    }
                    None => host.close_popups(),
                });
                if let Err(err) = result {
                    log::debug!("Ignoring map click: {err}");
                }
            }
        }
    }
}

fn draw_rectangle(painter: &egui::Painter, area: egui::Rect, style: &ShapeStyle) {
    painter.rect_filled(area, 0.0, color(style.fill, style.fill_opacity));

    let stroke = egui::Stroke::new(style.weight, color(style.stroke, style.stroke_opacity));
    let outline = [
        area.left_top(),
        area.right_top(),
        area.right_bottom(),
        area.left_bottom(),
        area.left_top(),
    ];
    if style.dashed {
        painter.extend(egui::Shape::dashed_line(&outline, stroke, 10.0, 10.0));
    } else {
        painter.add(egui::Shape::line(outline.to_vec(), stroke));
    }
}

fn draw_marker(painter: &egui::Painter, center: egui::Pos2, marker: &CircleMarker) {
    let style = &marker.style;
    painter.circle_filled(center, marker.radius, color(style.fill, style.fill_opacity));
    painter.circle_stroke(
        center,
        marker.radius,
        egui::Stroke::new(style.weight, color(style.stroke, style.stroke_opacity)),
    );
}

fn draw_popup(painter: &egui::Painter, anchor: egui::Pos2, popup: &Popup) {
    let title = painter.layout(
        popup.title.clone(),
        egui::FontId::proportional(12.0),
        egui::Color32::WHITE,
        POPUP_WIDTH,
    );
    let body = painter.layout(
        popup.lines.join("\n"),
        egui::FontId::proportional(10.5),
        egui::Color32::from_rgb(200, 200, 200),
        POPUP_WIDTH,
    );

    let padding = egui::vec2(8.0, 6.0);
    let gap = if popup.lines.is_empty() { 0.0 } else { 4.0 };
    let size = egui::vec2(
        title.size().x.max(body.size().x),
        title.size().y + gap + body.size().y,
    ) + padding * 2.0;
    let bubble = egui::Rect::from_min_size(
        anchor - egui::vec2(size.x / 2.0, size.y + 8.0),
        size,
    );

    painter.rect_filled(
        bubble,
        4.0,
        egui::Color32::from_rgba_unmultiplied(25, 30, 35, 230),
    );
    painter.add(egui::Shape::convex_polygon(
        vec![
            anchor,
            anchor + egui::vec2(-6.0, -8.0),
            anchor + egui::vec2(6.0, -8.0),
        ],
        egui::Color32::from_rgba_unmultiplied(25, 30, 35, 230),
        egui::Stroke::NONE,
    ));

    let title_pos = bubble.min + padding;
    let body_pos = title_pos + egui::vec2(0.0, title.size().y + gap);
    painter.galley(title_pos, title, egui::Color32::WHITE);
    painter.galley(body_pos, body, egui::Color32::from_rgb(200, 200, 200));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(layer: LayerId, index: usize, x: f32, y: f32) -> HitTarget {
        HitTarget {
            layer,
            marker: Some(index),
            shape: HitShape::Circle {
                center: egui::pos2(x, y),
                radius: 5.0,
            },
        }
    }

    fn rect(layer: LayerId) -> HitTarget {
        HitTarget {
            layer,
            marker: None,
            shape: HitShape::Rect(egui::Rect::from_min_max(
                egui::pos2(0.0, 0.0),
                egui::pos2(500.0, 500.0),
            )),
        }
    }

    #[test]
    fn test_pick_prefers_nearest_marker_over_rectangle() {
        let targets = [rect(1), marker(2, 0, 100.0, 100.0), marker(2, 1, 106.0, 100.0)];
        assert_eq!(pick(&targets, egui::pos2(105.0, 100.0)), Some((2, Some(1))));
        assert_eq!(pick(&targets, egui::pos2(99.0, 101.0)), Some((2, Some(0))));
    }

    #[test]
    fn test_pick_falls_back_to_topmost_rectangle() {
        let targets = [rect(1), rect(3), marker(2, 0, 100.0, 100.0)];
        assert_eq!(pick(&targets, egui::pos2(300.0, 300.0)), Some((3, None)));
        assert_eq!(pick(&targets, egui::pos2(600.0, 600.0)), None);
    }

    #[test]
    fn test_marker_tolerance() {
        let targets = [marker(2, 0, 100.0, 100.0)];
        assert!(pick(&targets, egui::pos2(108.0, 100.0)).is_some());
        assert!(pick(&targets, egui::pos2(110.0, 100.0)).is_none());
    }

    #[test]
    fn test_opacity_maps_to_alpha() {
        assert_eq!(color(Rgb::RED, 1.0), egui::Color32::from_rgba_unmultiplied(255, 0, 0, 255));
        assert_eq!(color(Rgb::GREEN, 0.0).a(), 0);
    }
}
