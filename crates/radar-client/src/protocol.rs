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

//! Radar service envelope decoding and defensive validation.
//!
//! The service publishes a JSON envelope wrapping a GeoJSON feature
//! collection:
//!
//! ```text
//! { "success": true, "timestamp": "...", "source": "NOAA MRMS", "cached": false,
//!   "note": "...", "bounds": [[lat, lng], [lat, lng]],
//!   "data": { "type": "FeatureCollection", "features": [ ... ], "metadata": { ... } } }
//! ```
//!
//! Validation never fails on shape problems inside `data`: a missing or
//! non-array `features` becomes an empty sequence, and any feature without a
//! well-formed `[lng, lat]` pair is dropped and counted.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RadarError, GENERIC_SERVER_FAILURE};
use crate::geo::{GeoBounds, GeoPoint};
use crate::intensity::IntensityClass;

/// Response envelope as published by the radar service.
///
/// Every field stays untyped so a wrongly typed value degrades to its
/// default in [`validate`] instead of rejecting the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarEnvelope {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub bounds: Option<Value>,
    #[serde(default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub cached: Option<Value>,
    #[serde(default)]
    pub note: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    /// Upstream file the service derived this snapshot from.
    #[serde(default)]
    pub data_url: Option<Value>,
}

impl RadarEnvelope {
    /// Only a literal `true` counts as success.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.success.as_ref().and_then(Value::as_bool).unwrap_or(false)
    }

    /// The service's `error` text, if it is a non-blank string.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        non_blank(self.error.as_ref())
    }
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Descriptive block the service attaches to the feature collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMetadata {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub total_points: Option<u64>,
}

/// One reflectivity observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarPoint {
    pub position: GeoPoint,
    pub reflectivity_dbz: f64,
    pub system_type: Option<String>,
}

impl RadarPoint {
    #[must_use]
    pub fn intensity(&self) -> IntensityClass {
        IntensityClass::classify(self.reflectivity_dbz)
    }
}

/// Validated result of one successful fetch. Never mutated after
/// construction; a newer snapshot replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarSnapshot {
    pub timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub source: Option<String>,
    pub cached: bool,
    pub note: Option<String>,
    pub bounds: Option<GeoBounds>,
    pub features: Vec<RadarPoint>,
    pub data_url: Option<String>,
    pub metadata: Option<DataMetadata>,
}

/// Counts gathered while validating a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Entries present in `features` (0 when the field was unusable).
    pub total_features: usize,
    pub valid_points: usize,
    pub dropped_features: usize,
    /// `features` was absent or not an array and was read as empty.
    pub features_missing: bool,
}

/// Decode a response body into an envelope.
pub fn decode_envelope(body: &str) -> Result<RadarEnvelope, RadarError> {
    serde_json::from_str(body)
        .map_err(|e| RadarError::Network(format!("Invalid response from radar service: {e}")))
}

/// Turn an envelope into a snapshot, or the failure it reports.
pub fn validate(
    envelope: RadarEnvelope,
    received_at: DateTime<Utc>,
) -> Result<(RadarSnapshot, ValidationReport), RadarError> {
    if !envelope.succeeded() {
        let message = envelope
            .error_message()
            .unwrap_or(GENERIC_SERVER_FAILURE)
            .to_string();
        return Err(RadarError::ServerReported(message));
    }

    let mut report = ValidationReport::default();
    let features = match envelope
        .data
        .as_ref()
        .and_then(|data| data.get("features"))
        .and_then(Value::as_array)
    {
        Some(raw) => {
            report.total_features = raw.len();
            raw.iter().filter_map(parse_feature).collect::<Vec<_>>()
        }
        None => {
            warn!("Radar payload has no usable features array; rendering an empty dataset");
            report.features_missing = true;
            Vec::new()
        }
    };
    report.valid_points = features.len();
    report.dropped_features = report.total_features - report.valid_points;
    if report.dropped_features > 0 {
        debug!(
            "Dropped {} malformed radar features of {}",
            report.dropped_features, report.total_features
        );
    }

    let metadata = envelope
        .data
        .as_ref()
        .and_then(|data| data.get("metadata"))
        .and_then(|meta| serde_json::from_value::<DataMetadata>(meta.clone()).ok());

    let snapshot = RadarSnapshot {
        timestamp: parse_timestamp(envelope.timestamp.as_ref().and_then(Value::as_str))
            .unwrap_or(received_at),
        received_at,
        source: non_blank(envelope.source.as_ref()).map(str::to_owned),
        cached: envelope.cached.as_ref().and_then(Value::as_bool).unwrap_or(false),
        note: non_blank(envelope.note.as_ref()).map(str::to_owned),
        bounds: envelope.bounds.as_ref().and_then(parse_bounds),
        features,
        data_url: non_blank(envelope.data_url.as_ref()).map(str::to_owned),
        metadata,
    };

    Ok((snapshot, report))
}

/// Materialise a feature only if it has a two-element numeric `[lng, lat]`.
fn parse_feature(feature: &Value) -> Option<RadarPoint> {
    let coordinates = feature.get("geometry")?.get("coordinates")?.as_array()?;
    let [lng, lat] = coordinates.as_slice() else {
        return None;
    };
    let position = GeoPoint::new(lat.as_f64()?, lng.as_f64()?);
    if !position.is_finite() {
        return None;
    }

    let properties = feature.get("properties");
    let reflectivity_dbz = properties
        .and_then(|p| p.get("reflectivity"))
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);
    let system_type = properties
        .and_then(|p| p.get("systemType"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Some(RadarPoint {
        position,
        reflectivity_dbz,
        system_type,
    })
}

/// Bounds are `[[lat, lng], [lat, lng]]`; anything else counts as absent.
fn parse_bounds(value: &Value) -> Option<GeoBounds> {
    let corners = value.as_array()?;
    let [a, b] = corners.as_slice() else {
        return None;
    };
    let corner = |v: &Value| -> Option<GeoPoint> {
        let pair = v.as_array()?;
        let [lat, lng] = pair.as_slice() else {
            return None;
        };
        let point = GeoPoint::new(lat.as_f64()?, lng.as_f64()?);
        point.is_finite().then_some(point)
    };
    Some(GeoBounds::from_corners(corner(a)?, corner(b)?))
}

/// RFC 3339, or the offset-less ISO form the service emits (read as UTC).
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn envelope(value: Value) -> RadarEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_feature_payload() {
        let env = envelope(json!({
            "success": true,
            "timestamp": "2024-01-01T00:00:00Z",
            "data": {"features": [
                {"geometry": {"coordinates": [-98.5, 39.8]}, "properties": {"reflectivity": 55}}
            ]}
        }));

        let (snapshot, report) = validate(env, received()).unwrap();
        assert_eq!(snapshot.features.len(), 1);
        assert_eq!(snapshot.features[0].position, GeoPoint::new(39.8, -98.5));
        assert_eq!(snapshot.features[0].reflectivity_dbz, 55.0);
        assert_eq!(snapshot.features[0].intensity(), IntensityClass::Extreme);
        assert_eq!(
            snapshot.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(report.valid_points, 1);
        assert_eq!(report.dropped_features, 0);
    }

    #[test]
    fn test_server_reported_failure() {
        let err = validate(envelope(json!({"success": false, "error": "no data"})), received())
            .unwrap_err();
        assert_eq!(err, RadarError::ServerReported("no data".to_string()));

        let err = validate(envelope(json!({"success": false})), received()).unwrap_err();
        assert_eq!(err.message(), GENERIC_SERVER_FAILURE);
    }

    #[test]
    fn test_missing_success_is_a_failure() {
        let err = validate(envelope(json!({"data": {"features": []}})), received()).unwrap_err();
        assert!(matches!(err, RadarError::ServerReported(_)));
    }

    #[test]
    fn test_missing_or_non_array_features_is_empty() {
        for data in [json!({}), json!({"features": null}), json!({"features": {"a": 1}}), json!("x")] {
            let (snapshot, report) =
                validate(envelope(json!({"success": true, "data": data})), received()).unwrap();
            assert!(snapshot.features.is_empty());
            assert!(report.features_missing);
        }

        let (snapshot, report) = validate(envelope(json!({"success": true})), received()).unwrap();
        assert!(snapshot.features.is_empty());
        assert!(report.features_missing);
    }

    #[test]
    fn test_malformed_features_are_dropped_and_counted() {
        let env = envelope(json!({
            "success": true,
            "data": {"features": [
                {"geometry": {"coordinates": [-98.5, 39.8]}},
                {"geometry": {"coordinates": [-98.5]}},
                {"geometry": {"coordinates": [-98.5, 39.8, 100.0]}},
                {"geometry": {"coordinates": "-98.5,39.8"}},
                {"geometry": {}},
                {"properties": {"reflectivity": 40}},
                {"geometry": {"coordinates": ["-98.5", 39.8]}},
                42,
                {"geometry": {"coordinates": [-86.0, 32.5]}, "properties": {"reflectivity": 41.5, "systemType": "stratiform"}}
            ]}
        }));

        let (snapshot, report) = validate(env, received()).unwrap();
        assert_eq!(report.total_features, 9);
        assert_eq!(report.valid_points, 2);
        assert_eq!(report.dropped_features, 7);
        assert!(!report.features_missing);
        assert_eq!(snapshot.features[1].system_type.as_deref(), Some("stratiform"));
    }

    #[test]
    fn test_reflectivity_defaults_to_zero() {
        let env = envelope(json!({
            "success": true,
            "data": {"features": [
                {"geometry": {"coordinates": [-98.5, 39.8]}},
                {"geometry": {"coordinates": [-98.5, 39.8]}, "properties": {"reflectivity": "high"}}
            ]}
        }));
        let (snapshot, _) = validate(env, received()).unwrap();
        assert!(snapshot.features.iter().all(|p| p.reflectivity_dbz == 0.0));
        assert!(snapshot.features.iter().all(|p| p.intensity() == IntensityClass::VeryLight));
    }

    #[test]
    fn test_bounds_parsing() {
        let env = envelope(json!({
            "success": true,
            "bounds": [[24.396308, -125.0], [49.384358, -66.93457]],
            "data": {"features": []}
        }));
        let (snapshot, _) = validate(env, received()).unwrap();
        assert_eq!(snapshot.bounds, Some(GeoBounds::CONUS));

        for bad in [json!([[1.0, 2.0]]), json!([[1.0], [2.0, 3.0]]), json!("conus"), json!(null)] {
            let env = envelope(json!({"success": true, "bounds": bad}));
            let (snapshot, _) = validate(env, received()).unwrap();
            assert!(snapshot.bounds.is_none());
        }
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(
            parse_timestamp(Some("2024-01-01T06:30:00+02:00")),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 4, 30, 0).unwrap())
        );
        let naive = parse_timestamp(Some("2024-01-01T12:00:00.123456")).unwrap();
        assert_eq!(naive.format("%H:%M:%S").to_string(), "12:00:00");
        assert_eq!(
            parse_timestamp(Some("2024-01-01T12:00:00")),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp(Some("yesterday")), None);
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_receipt() {
        let (snapshot, _) =
            validate(envelope(json!({"success": true, "data": {"features": []}})), received())
                .unwrap();
        assert_eq!(snapshot.timestamp, received());
    }

    #[test]
    fn test_provenance_fields_and_metadata() {
        let env = envelope(json!({
            "success": true,
            "source": "NOAA MRMS",
            "cached": true,
            "note": "Real MRMS Data - Enhanced Simulation",
            "dataUrl": "https://noaa-mrms-pds.s3.amazonaws.com/",
            "data": {
                "type": "FeatureCollection",
                "features": [],
                "metadata": {"product": "RALA", "resolution": "0.50 km", "dataType": "REAL_MRMS_SIMULATION", "totalPoints": 0}
            }
        }));
        let (snapshot, _) = validate(env, received()).unwrap();
        assert_eq!(snapshot.source.as_deref(), Some("NOAA MRMS"));
        assert!(snapshot.cached);
        assert_eq!(snapshot.data_url.as_deref(), Some("https://noaa-mrms-pds.s3.amazonaws.com/"));
        let metadata = snapshot.metadata.unwrap();
        assert_eq!(metadata.product.as_deref(), Some("RALA"));
        assert_eq!(metadata.total_points, Some(0));
    }

    #[test]
    fn test_non_string_timestamp_falls_back_to_receipt() {
        let env = decode_envelope(
            r#"{"success":true,"timestamp":1704067200,"data":{"features":[{"geometry":{"coordinates":[-98.5,39.8]},"properties":{"reflectivity":55}}]}}"#,
        )
        .unwrap();
        let (snapshot, report) = validate(env, received()).unwrap();
        assert_eq!(snapshot.timestamp, received());
        assert_eq!(report.valid_points, 1);
        assert_eq!(snapshot.features[0].intensity(), IntensityClass::Extreme);
    }

    #[test]
    fn test_wrongly_typed_provenance_fields_default() {
        let env = decode_envelope(
            r#"{"success":true,"cached":"false","source":42,"note":["x"],"dataUrl":false,"data":{"features":[]}}"#,
        )
        .unwrap();
        let (snapshot, _) = validate(env, received()).unwrap();
        assert!(!snapshot.cached);
        assert!(snapshot.source.is_none());
        assert!(snapshot.note.is_none());
        assert!(snapshot.data_url.is_none());
    }

    #[test]
    fn test_non_boolean_success_is_a_failure() {
        let env = decode_envelope(r#"{"success":"true","error":500}"#).unwrap();
        let err = validate(env, received()).unwrap_err();
        assert_eq!(err, RadarError::ServerReported(GENERIC_SERVER_FAILURE.to_string()));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_envelope("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, RadarError::Network(_)));
    }
}
