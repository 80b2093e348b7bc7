use agentwatch_logging::{sync_debug, sync_warn};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{EngineSettings, FailureKind, FetchError, FinalAnalysisBody};

/// HTTP side of the server API.
#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    /// `GET /api/reports/{ticker}/{date}/{key}`; returns the report content.
    async fn fetch_report(&self, ticker: &str, date: &str, key: &str)
        -> Result<String, FetchError>;

    /// `GET /api/final-analysis/{ticker}/{date}`.
    async fn fetch_final_analysis(
        &self,
        ticker: &str,
        date: &str,
    ) -> Result<FinalAnalysisBody, FetchError>;

    /// `POST /api/analyze`; returns the server's acknowledgement message.
    async fn start_analysis(&self, body: &Value) -> Result<String, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    success: bool,
    report_content: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinalAnalysisResponse {
    #[serde(default = "assume_success")]
    success: bool,
    final_analysis: Option<Value>,
    recommendation: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    status: Option<String>,
    message: Option<String>,
}

/// FastAPI error body.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: Value,
}

fn assume_success() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    settings: EngineSettings,
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(settings: EngineSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn read<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<T, FetchError> {
        sync_debug!("requesting {}", url);
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorDetail>(&bytes)
                .map(|body| display_value(&body.detail))
                .unwrap_or_else(|_| status.to_string());
            sync_warn!("{} answered {}: {}", url, status, message);
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ApiClient for ReqwestApiClient {
    async fn fetch_report(
        &self,
        ticker: &str,
        date: &str,
        key: &str,
    ) -> Result<String, FetchError> {
        let url = self
            .settings
            .api_url(&["api", "reports", ticker, date, key])?;
        let body: ReportResponse = self.read(self.client.get(url.clone()), &url).await?;

        match (body.success, body.report_content) {
            (true, Some(content)) => Ok(content),
            (true, None) => Err(FetchError::new(
                FailureKind::Rejected,
                format!("{key} report has no content"),
            )),
            (false, _) => Err(FetchError::new(
                FailureKind::Rejected,
                body.message
                    .or(body.error)
                    .unwrap_or_else(|| format!("{key} report unavailable")),
            )),
        }
    }

    async fn fetch_final_analysis(
        &self,
        ticker: &str,
        date: &str,
    ) -> Result<FinalAnalysisBody, FetchError> {
        let url = self
            .settings
            .api_url(&["api", "final-analysis", ticker, date])?;
        let body: FinalAnalysisResponse = self.read(self.client.get(url.clone()), &url).await?;

        let analysis = body
            .final_analysis
            .as_ref()
            .map(display_value)
            .filter(|text| !text.trim().is_empty());
        match (body.success, analysis) {
            (true, Some(final_analysis)) => Ok(FinalAnalysisBody {
                final_analysis,
                recommendation: body.recommendation.unwrap_or_else(|| "HOLD".to_string()),
            }),
            (true, None) => Err(FetchError::new(
                FailureKind::Rejected,
                "final analysis not available yet",
            )),
            (false, _) => Err(FetchError::new(
                FailureKind::Rejected,
                body.message
                    .or(body.error)
                    .unwrap_or_else(|| "final analysis unavailable".to_string()),
            )),
        }
    }

    async fn start_analysis(&self, body: &Value) -> Result<String, FetchError> {
        let url = self.settings.api_url(&["api", "analyze"])?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        let request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        let answer: AnalyzeResponse = self.read(request, &url).await?;

        Ok(answer
            .message
            .or(answer.status)
            .unwrap_or_else(|| "analysis started".to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
