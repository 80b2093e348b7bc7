//! RON configuration for the agentwatch binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use agentwatch_core::{AnalysisForm, ConnectionSettings, ReconnectPolicy};
use agentwatch_engine::EngineSettings;
use chrono::Utc;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "agentwatch.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 3_000,
            backoff_factor: 1.5,
            max_delay_ms: 30_000,
        }
    }
}

/// Initial values of the analysis form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    pub ticker: String,
    pub date: String,
    pub analysts: Vec<String>,
    pub research_depth: u8,
    pub llm_provider: String,
    pub backend_url: String,
    pub shallow_thinker: String,
    pub deep_thinker: String,
}

impl Default for FormDefaults {
    fn default() -> Self {
        let form = AnalysisForm::default();
        Self {
            ticker: form.ticker,
            date: form.date,
            analysts: form.analysts,
            research_depth: form.research_depth,
            llm_provider: form.llm_provider,
            backend_url: form.backend_url,
            shallow_thinker: form.shallow_thinker,
            deep_thinker: form.deep_thinker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub ws_path: String,
    pub connect_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub reconnect: ReconnectConfig,
    pub request_timeout_ms: u64,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub defaults: FormDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            ws_path: "/ws".to_string(),
            connect_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
            reconnect: ReconnectConfig::default(),
            request_timeout_ms: 30_000,
            log_destination: LogDestination::File,
            log_level: "info".to_string(),
            defaults: FormDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or `agentwatch.ron` when no path is given. Only a missing
    /// default file falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let config: Self =
            ron::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level_filter()?;
        if self.reconnect.base_delay_ms == 0 {
            return Err(ConfigError::Invalid("reconnect.base_delay_ms must be > 0".into()));
        }
        let factor = self.reconnect.backoff_factor;
        if factor.is_nan() || factor < 1.0 {
            return Err(ConfigError::Invalid(
                "reconnect.backoff_factor must be >= 1.0".into(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(ConfigError::Invalid(
                "reconnect.max_delay_ms must be >= base_delay_ms".into(),
            ));
        }
        if self.heartbeat_interval_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_interval_ms and connect_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", self.log_level)))
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
                backoff_factor: self.reconnect.backoff_factor,
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            },
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            server_url: self.server_url.clone(),
            ws_path: self.ws_path.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            timestamp: Arc::new(|| Utc::now().to_rfc3339()),
        }
    }

    pub fn analysis_form(&self) -> AnalysisForm {
        let defaults = self.defaults.clone();
        AnalysisForm {
            ticker: defaults.ticker.trim().to_ascii_uppercase(),
            date: defaults.date,
            analysts: defaults.analysts,
            research_depth: defaults.research_depth,
            llm_provider: defaults.llm_provider,
            backend_url: defaults.backend_url,
            shallow_thinker: defaults.shallow_thinker,
            deep_thinker: defaults.deep_thinker,
        }
    }
}
