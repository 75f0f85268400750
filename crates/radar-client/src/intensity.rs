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

//! Reflectivity intensity classification.

use crate::layers::Rgb;

/// Precipitation intensity band derived from reflectivity (dBZ).
///
/// Bands are closed-open and evaluated top-down, so exactly 50, 40, 30 and 20
/// dBZ belong to the higher band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntensityClass {
    VeryLight,
    Light,
    Moderate,
    Heavy,
    Extreme,
}

impl IntensityClass {
    /// Classify a reflectivity value. Non-finite input is treated as no return.
    #[must_use]
    pub fn classify(dbz: f64) -> Self {
        match dbz {
            v if v >= 50.0 => IntensityClass::Extreme,
            v if v >= 40.0 => IntensityClass::Heavy,
            v if v >= 30.0 => IntensityClass::Moderate,
            v if v >= 20.0 => IntensityClass::Light,
            _ => IntensityClass::VeryLight,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            IntensityClass::Extreme => "Extreme",
            IntensityClass::Heavy => "Heavy",
            IntensityClass::Moderate => "Moderate",
            IntensityClass::Light => "Light",
            IntensityClass::VeryLight => "Very Light",
        }
    }

    /// Marker colour for this band.
    #[must_use]
    pub fn color(self) -> Rgb {
        match self {
            IntensityClass::Extreme => Rgb::MAGENTA,
            IntensityClass::Heavy => Rgb::RED,
            IntensityClass::Moderate => Rgb::ORANGE,
            IntensityClass::Light => Rgb::YELLOW,
            IntensityClass::VeryLight => Rgb::GREEN,
        }
    }

    /// All bands from strongest to weakest, for legends.
    #[must_use]
    pub fn all() -> [IntensityClass; 5] {
        [
            IntensityClass::Extreme,
            IntensityClass::Heavy,
            IntensityClass::Moderate,
            IntensityClass::Light,
            IntensityClass::VeryLight,
        ]
    }

    /// Lower threshold of the band, in dBZ.
    #[must_use]
    pub fn threshold(self) -> Option<f64> {
        match self {
            IntensityClass::Extreme => Some(50.0),
            IntensityClass::Heavy => Some(40.0),
            IntensityClass::Moderate => Some(30.0),
            IntensityClass::Light => Some(20.0),
            IntensityClass::VeryLight => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_closed_open() {
        assert_eq!(IntensityClass::classify(50.0), IntensityClass::Extreme);
        assert_eq!(IntensityClass::classify(49.999), IntensityClass::Heavy);
        assert_eq!(IntensityClass::classify(40.0), IntensityClass::Heavy);
        assert_eq!(IntensityClass::classify(39.9), IntensityClass::Moderate);
        assert_eq!(IntensityClass::classify(30.0), IntensityClass::Moderate);
        assert_eq!(IntensityClass::classify(29.9), IntensityClass::Light);
        assert_eq!(IntensityClass::classify(20.0), IntensityClass::Light);
        assert_eq!(IntensityClass::classify(19.99), IntensityClass::VeryLight);
    }

    #[test]
    fn test_extremes_and_defaults() {
        assert_eq!(IntensityClass::classify(75.0), IntensityClass::Extreme);
        assert_eq!(IntensityClass::classify(0.0), IntensityClass::VeryLight);
        assert_eq!(IntensityClass::classify(-12.5), IntensityClass::VeryLight);
        assert_eq!(IntensityClass::classify(f64::NAN), IntensityClass::VeryLight);
    }

    #[test]
    fn test_colors_and_labels() {
        let expected = [
            (55.0, "Extreme", "#ff00ff"),
            (45.0, "Heavy", "#ff0000"),
            (35.0, "Moderate", "#ff8800"),
            (25.0, "Light", "#ffff00"),
            (5.0, "Very Light", "#00ff00"),
        ];
        for (dbz, label, hex) in expected {
            let class = IntensityClass::classify(dbz);
            assert_eq!(class.label(), label);
            assert_eq!(class.color().to_hex(), hex);
        }
    }

    #[test]
    fn test_all_is_ordered_strongest_first() {
        let all = IntensityClass::all();
        assert!(all.windows(2).all(|pair| pair[0] > pair[1]));
        assert_eq!(all[0].threshold(), Some(50.0));
        assert_eq!(all[4].threshold(), None);
    }
}
