use std::time::Duration;

use crate::{AnalysisRequest, ConnId, Context, ReportRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenSocket { conn: ConnId },
    CloseSocket { conn: ConnId },
    SendFrame { conn: ConnId, frame: Outbound },
    /// Starting a timer that is already armed replaces it.
    StartTimer { timer: Timer, after: Duration },
    CancelTimer { timer: Timer },
    FetchReport(ReportRequest),
    FetchFinalAnalysis(Context),
    StartAnalysis(AnalysisRequest),
}

/// Client to server envelopes. The runtime stamps them with the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound {
    Ping,
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    ConnectTimeout(ConnId),
    Reconnect,
    Heartbeat,
}
