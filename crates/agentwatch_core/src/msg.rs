#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Open the server connection (startup or user request).
    Connect,
    /// User asked to close the connection for good.
    Disconnect,
    /// User edited the ticker field.
    TickerEdited(String),
    /// User edited the analysis date field.
    DateEdited(String),
    /// User replaced the analyst selection.
    AnalystsEdited(Vec<String>),
    /// User changed the research depth.
    DepthEdited(u8),
    /// User clicked Start.
    StartAnalysisClicked,
    /// User opened an agent's result.
    OpenReport(crate::AgentId),
    /// User retried a failed report fetch.
    RetryReport(crate::ReportKey),
    /// User opened the final analysis for the live context.
    OpenFinalAnalysis,
    /// User-triggered connection test.
    PingClicked,
    /// Transport: a socket finished its handshake.
    SocketOpened { conn: crate::ConnId },
    /// Transport: a socket closed, with the close code when one was received.
    SocketClosed {
        conn: crate::ConnId,
        code: Option<u16>,
    },
    /// Transport: a socket failed.
    SocketError {
        conn: crate::ConnId,
        message: String,
    },
    /// Transport: one text frame, in arrival order.
    FrameReceived { conn: crate::ConnId, text: String },
    /// A timer armed through `Effect::StartTimer` elapsed.
    TimerFired(crate::Timer),
    /// Outcome of `POST /api/analyze`.
    AnalysisRequestAnswered(Result<String, String>),
    /// Outcome of a report fetch issued for `request`.
    ReportFetched {
        request: crate::ReportRequest,
        result: Result<String, String>,
    },
    /// Outcome of a final analysis fetch.
    FinalAnalysisFetched {
        context: crate::Context,
        result: Result<crate::FinalAnalysis, String>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
