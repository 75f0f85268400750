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

//! Geographic primitives and Web Mercator projection utilities.

use serde::{Deserialize, Serialize};

/// Latitude limit of the Web Mercator projection.
const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Geographic rectangle described by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl GeoBounds {
    /// Continental United States coverage, used whenever a payload carries
    /// no bounds of its own.
    pub const CONUS: GeoBounds = GeoBounds {
        south_west: GeoPoint::new(24.396_308, -125.0),
        north_east: GeoPoint::new(49.384_358, -66.934_57),
    };

    /// Build bounds from two arbitrary corners, normalising their order.
    #[must_use]
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            south_west: GeoPoint::new(a.lat.min(b.lat), a.lon.min(b.lon)),
            north_east: GeoPoint::new(a.lat.max(b.lat), a.lon.max(b.lon)),
        }
    }

    /// Smallest bounds containing every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_corners(first, first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grow the bounds to include `point`.
    pub fn extend(&mut self, point: GeoPoint) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lon = self.south_west.lon.min(point.lon);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lon = self.north_east.lon.max(point.lon);
    }

    #[must_use]
    pub fn north_west(&self) -> GeoPoint {
        GeoPoint::new(self.north_east.lat, self.south_west.lon)
    }

    #[must_use]
    pub fn south_east(&self) -> GeoPoint {
        GeoPoint::new(self.south_west.lat, self.north_east.lon)
    }

    /// Midpoint in Web Mercator space, which is where a map fitted to these
    /// bounds centres itself.
    #[must_use]
    pub fn mercator_center(&self) -> GeoPoint {
        let x = (WebMercator::lon_to_x(self.south_west.lon, 0)
            + WebMercator::lon_to_x(self.north_east.lon, 0))
            / 2.0;
        let y = (WebMercator::lat_to_y(self.south_west.lat, 0)
            + WebMercator::lat_to_y(self.north_east.lat, 0))
            / 2.0;
        GeoPoint::new(WebMercator::tile_to_lat(y, 0), WebMercator::tile_to_lon(x, 0))
    }
}

/// Web Mercator projection utilities
#[derive(Debug, Clone, Copy)]
pub struct WebMercator;

impl WebMercator {
    /// Convert latitude to Web Mercator Y in tile units at `zoom`
    /// (0.0 to 1.0 at zoom 0)
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
        let n = 2_f64.powi(i32::from(zoom));
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * n
    }

    /// Convert longitude to Web Mercator X in tile units at `zoom`
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        ((lon + 180.0) / 360.0) * n
    }

    /// Convert tile coordinates back to latitude
    #[must_use]
    pub fn tile_to_lat(y: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        let lat_rad = ((std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh()).atan();
        lat_rad.to_degrees()
    }

    /// Convert tile coordinates back to longitude
    #[must_use]
    pub fn tile_to_lon(x: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        x / n * 360.0 - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_covers_all() {
        let bounds = GeoBounds::from_points([
            GeoPoint::new(39.8, -98.5),
            GeoPoint::new(32.5, -86.0),
            GeoPoint::new(44.0, -110.5),
        ])
        .unwrap();

        assert_eq!(bounds.south_west, GeoPoint::new(32.5, -110.5));
        assert_eq!(bounds.north_east, GeoPoint::new(44.0, -86.0));
        assert!(GeoBounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_from_corners_normalises_order() {
        let bounds = GeoBounds::from_corners(GeoPoint::new(49.0, -67.0), GeoPoint::new(24.0, -125.0));
        assert_eq!(bounds.south_west, GeoPoint::new(24.0, -125.0));
        assert_eq!(bounds.north_east, GeoPoint::new(49.0, -67.0));
    }

    #[test]
    fn test_mercator_round_trip() {
        let y = WebMercator::lat_to_y(39.8283, 4);
        let x = WebMercator::lon_to_x(-98.5795, 4);
        assert!((WebMercator::tile_to_lat(y, 4) - 39.8283).abs() < 1e-9);
        assert!((WebMercator::tile_to_lon(x, 4) + 98.5795).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_bounds_center_is_the_point() {
        let point = GeoPoint::new(39.8, -98.5);
        let center = GeoBounds::from_corners(point, point).mercator_center();
        assert!((center.lat - 39.8).abs() < 1e-9);
        assert!((center.lon + 98.5).abs() < 1e-9);
    }
}
