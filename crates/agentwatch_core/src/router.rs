//! Inbound frame decoding and validation.
//!
//! Frames are decoded in two steps: the `type` field is checked against the
//! known envelope types first, so an unknown type is reported as such instead
//! of as a payload error, then the payload is deserialized for that type.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use agentwatch_logging::{sync_trace, sync_warn};

use crate::{AgentId, AgentStatus, Context, FinalResults};

const KNOWN_TYPES: [&str; 12] = [
    "connection_established",
    "pong",
    "echo",
    "status",
    "agent_status",
    "analysis_start",
    "analysis_complete",
    "analysis_cancelled",
    "context_change",
    "error",
    "server_shutdown",
    "ping",
];

/// A validated inbound message, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    ConnectionEstablished { message: String },
    Pong,
    Echo,
    Status { message: String },
    AgentStatus { agent: AgentId, status: AgentStatus },
    AnalysisStart { context: Context },
    AnalysisComplete(FinalResults),
    AnalysisCancelled { message: String },
    ContextChange { context: Context },
    Error { message: String },
    ServerShutdown { message: String },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("frame is not a JSON object: {0}")]
    Malformed(String),
    #[error("envelope has no type")]
    Untyped,
    #[error("unrecognized message type {0:?}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {message}")]
    InvalidPayload { kind: String, message: String },
    #[error("unknown agent {0:?}")]
    UnknownAgent(String),
    #[error("illegal status {status:?} for agent {agent:?}")]
    IllegalStatus { agent: String, status: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    ConnectionEstablished {
        message: String,
    },
    Pong {
        message: String,
    },
    Echo {},
    Status {
        message: String,
    },
    AgentStatus {
        agent: String,
        status: String,
    },
    AnalysisStart {
        ticker: String,
        date: String,
    },
    AnalysisComplete {
        final_state: Value,
        decision: Value,
        recommendation: Value,
    },
    AnalysisCancelled {
        #[serde(default)]
        message: String,
    },
    ContextChange {
        ticker: String,
        date: String,
    },
    Error {
        message: String,
    },
    ServerShutdown {
        message: String,
    },
    Ping {},
}

/// Decodes and validates one frame.
pub fn decode(frame: &str) -> Result<Inbound, RouteError> {
    let value: Value =
        serde_json::from_str(frame).map_err(|err| RouteError::Malformed(err.to_string()))?;
    if !value.is_object() {
        return Err(RouteError::Malformed("expected an object".into()));
    }
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_owned(),
        None => return Err(RouteError::Untyped),
    };
    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(RouteError::UnknownType(kind));
    }

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|err| RouteError::InvalidPayload {
            kind: kind.clone(),
            message: err.to_string(),
        })?;

    let inbound = match envelope {
        Envelope::ConnectionEstablished { message } => Inbound::ConnectionEstablished { message },
        Envelope::Pong { message } => {
            sync_trace!("pong: {}", message);
            Inbound::Pong
        }
        Envelope::Echo {} => Inbound::Echo,
        Envelope::Status { message } => Inbound::Status { message },
        Envelope::AgentStatus { agent, status } => validate_status(agent, status)?,
        Envelope::AnalysisStart { ticker, date } => Inbound::AnalysisStart {
            context: Context::new(ticker, date),
        },
        Envelope::AnalysisComplete {
            final_state,
            decision,
            recommendation,
        } => Inbound::AnalysisComplete(FinalResults {
            final_state,
            decision: display_value(&decision),
            recommendation: display_value(&recommendation),
        }),
        Envelope::AnalysisCancelled { message } => Inbound::AnalysisCancelled { message },
        Envelope::ContextChange { ticker, date } => Inbound::ContextChange {
            context: Context::new(ticker, date),
        },
        Envelope::Error { message } => Inbound::Error { message },
        Envelope::ServerShutdown { message } => Inbound::ServerShutdown { message },
        Envelope::Ping {} => Inbound::Ping,
    };
    Ok(inbound)
}

/// Decodes a frame, logging and discarding anything that fails validation.
pub fn route(frame: &str) -> Option<Inbound> {
    match decode(frame) {
        Ok(inbound) => {
            sync_trace!("routed {:?}", inbound);
            Some(inbound)
        }
        Err(err @ (RouteError::UnknownAgent(_) | RouteError::IllegalStatus { .. })) => {
            sync_warn!("rejected status update: {}", err);
            None
        }
        Err(err) => {
            sync_warn!("discarding inbound frame: {}", err);
            None
        }
    }
}

fn validate_status(agent: String, status: String) -> Result<Inbound, RouteError> {
    let Some(agent_id) = AgentId::from_name(&agent) else {
        return Err(RouteError::UnknownAgent(agent));
    };
    let Some(status_value) = AgentStatus::parse(&status) else {
        return Err(RouteError::IllegalStatus { agent, status });
    };
    Ok(Inbound::AgentStatus {
        agent: agent_id,
        status: status_value,
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
