use std::fmt;

use serde_json::json;
use thiserror::Error;

pub type SocketId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    ConnectTimeout(SocketId),
    Reconnect,
    Heartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundFrame {
    Ping,
    Pong,
}

impl OutboundFrame {
    /// Wire form: `{"type": "...", "timestamp": "..."}`.
    pub fn to_json(self, timestamp: &str) -> String {
        let kind = match self {
            OutboundFrame::Ping => "ping",
            OutboundFrame::Pong => "pong",
        };
        json!({ "type": kind, "timestamp": timestamp }).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalAnalysisBody {
    pub final_analysis: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SocketOpened {
        socket: SocketId,
    },
    FrameReceived {
        socket: SocketId,
        text: String,
    },
    /// `code` is the server's close code; `None` for client-initiated
    /// closes and for connections that dropped without a close frame.
    SocketClosed {
        socket: SocketId,
        code: Option<u16>,
    },
    SocketError {
        socket: SocketId,
        message: String,
    },
    TimerFired(TimerKey),
    ReportFetched {
        ticker: String,
        date: String,
        key: String,
        result: Result<String, FetchError>,
    },
    FinalAnalysisFetched {
        ticker: String,
        date: String,
        result: Result<FinalAnalysisBody, FetchError>,
    },
    AnalysisRequested(Result<String, FetchError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The server answered but reported `success: false`.
    Rejected,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Decode => write!(f, "undecodable response"),
        }
    }
}
