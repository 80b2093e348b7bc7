use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use url::Url;

use crate::{FailureKind, FetchError};

/// Produces the timestamp stamped on outbound frames.
pub type Timestamp = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct EngineSettings {
    /// HTTP base of the server, e.g. `http://localhost:8000`.
    pub server_url: String,
    /// Path of the WebSocket endpoint on the same host.
    pub ws_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub timestamp: Timestamp,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            ws_path: "/ws".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            timestamp: Arc::new(unix_timestamp),
        }
    }
}

impl fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSettings")
            .field("server_url", &self.server_url)
            .field("ws_path", &self.ws_path)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl EngineSettings {
    /// WebSocket endpoint: `ws` for `http` servers, `wss` for `https`.
    pub fn websocket_url(&self) -> Result<Url, FetchError> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(FetchError::new(
                    FailureKind::InvalidUrl,
                    format!("unsupported scheme {other:?}"),
                ))
            }
        };
        url.set_scheme(scheme).map_err(|()| {
            FetchError::new(FailureKind::InvalidUrl, format!("cannot use scheme {scheme}"))
        })?;
        url.set_path(&self.ws_path);
        Ok(url)
    }

    /// `server_url` with `segments` appended; each segment is percent-encoded.
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url()?;
        url.path_segments_mut()
            .map_err(|()| FetchError::new(FailureKind::InvalidUrl, "server url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn base_url(&self) -> Result<Url, FetchError> {
        Url::parse(&self.server_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

fn unix_timestamp() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", elapsed.as_secs(), elapsed.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::EngineSettings;
    use crate::FailureKind;

    fn settings(server_url: &str) -> EngineSettings {
        EngineSettings {
            server_url: server_url.to_string(),
            ..EngineSettings::default()
        }
    }

    #[test]
    fn websocket_url_follows_http_scheme() {
        let url = settings("http://localhost:8000").websocket_url().unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws");

        let url = settings("https://agents.example.com/").websocket_url().unwrap();
        assert_eq!(url.as_str(), "wss://agents.example.com/ws");
    }

    #[test]
    fn websocket_url_rejects_other_schemes() {
        let err = settings("ftp://example.com").websocket_url().unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }

    #[test]
    fn api_url_appends_encoded_segments() {
        let url = settings("http://localhost:8000/")
            .api_url(&["api", "reports", "BRK B", "2024-05-10", "market"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/reports/BRK%20B/2024-05-10/market"
        );
    }
}
