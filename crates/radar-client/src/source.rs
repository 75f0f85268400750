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

//! Upstream radar data source.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::RadarError;
use crate::protocol::{decode_envelope, RadarEnvelope};

/// Something that can produce the latest radar envelope.
pub trait RadarSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<RadarEnvelope, RadarError>> + Send;
}

/// Reply from the radar service's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub update_interval: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Radar source backed by the HTTP radar service.
#[derive(Debug, Clone)]
pub struct HttpRadarSource {
    client: reqwest::Client,
    endpoint: String,
    health_endpoint: Option<String>,
}

impl HttpRadarSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RadarError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mrms-radar-desktop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RadarError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            health_endpoint: None,
        })
    }

    #[must_use]
    pub fn with_health_endpoint(mut self, url: impl Into<String>) -> Self {
        self.health_endpoint = Some(url.into());
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query the service health endpoint.
    pub async fn health(&self) -> Result<HealthReport, RadarError> {
        let url = self
            .health_endpoint
            .as_deref()
            .ok_or_else(|| RadarError::Network("No health endpoint configured".to_string()))?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RadarError::Network(format!("Health check failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RadarError::Network(format!("Health check returned HTTP {status}")));
        }
        response
            .json::<HealthReport>()
            .await
            .map_err(|e| RadarError::Network(format!("Invalid health response: {e}")))
    }
}

impl RadarSource for HttpRadarSource {
    async fn fetch(&self) -> Result<RadarEnvelope, RadarError> {
        debug!("Fetching radar data from {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!("Radar request failed: {e}");
                RadarError::Network(format!("Failed to reach radar service: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RadarError::Network(format!("Failed to read radar response: {e}")))?;

        if !status.is_success() {
            return Err(RadarError::Network(http_failure_message(status, &body)));
        }

        decode_envelope(&body)
    }
}

/// Prefer the service's own `error` text; fall back to the status line.
fn http_failure_message(status: StatusCode, body: &str) -> String {
    decode_envelope(body)
        .ok()
        .and_then(|envelope| envelope.error_message().map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one request with a canned response; the task yields the
    /// request head, lowercased.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/radar/latest", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&request).to_lowercase()
        });
        (url, server)
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_json_and_decodes() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"success": true, "source": "NOAA MRMS", "data": {"features": [{"geometry": {"coordinates": [-98.5, 39.8]}, "properties": {"reflectivity": 55}}]}}"#,
        )
        .await;
        let source = HttpRadarSource::new(url, Duration::from_secs(5)).unwrap();

        let envelope = source.fetch().await.unwrap();
        assert!(envelope.succeeded());

        let request = server.await.unwrap();
        assert!(request.starts_with("get /api/radar/latest "));
        assert!(request.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_network_error() {
        let (url, server) = serve_once(
            "503 Service Unavailable",
            r#"{"success": false, "error": "MRMS bucket unreachable"}"#,
        )
        .await;
        let source = HttpRadarSource::new(url, Duration::from_secs(5)).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert_eq!(err, RadarError::Network("MRMS bucket unreachable".to_string()));
        server.await.unwrap();
    }

    #[test]
    fn test_http_failure_uses_server_error() {
        let body = r#"{"success": false, "error": "MRMS bucket unreachable", "timestamp": "2024-01-01T00:00:00"}"#;
        assert_eq!(
            http_failure_message(StatusCode::INTERNAL_SERVER_ERROR, body),
            "MRMS bucket unreachable"
        );
    }

    #[test]
    fn test_http_failure_falls_back_to_status() {
        assert_eq!(
            http_failure_message(StatusCode::BAD_GATEWAY, "<html>502</html>"),
            "HTTP 502 Bad Gateway"
        );
        assert_eq!(
            http_failure_message(StatusCode::NOT_FOUND, r#"{"success": false, "error": "  "}"#),
            "HTTP 404 Not Found"
        );
    }

    #[test]
    fn test_health_report_decoding() {
        let report: HealthReport = serde_json::from_str(
            r#"{"status": "healthy", "service": "MRMS Radar API",
                "data_source": "NOAA MRMS ReflectivityAtLowestAltitude",
                "update_interval": "2 minutes", "timestamp": "2024-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.update_interval.as_deref(), Some("2 minutes"));
    }

    #[tokio::test]
    async fn test_health_without_endpoint() {
        let source = HttpRadarSource::new("http://localhost:5000/api/radar/latest", Duration::from_secs(1))
            .unwrap();
        assert!(matches!(source.health().await, Err(RadarError::Network(_))));
    }
}
