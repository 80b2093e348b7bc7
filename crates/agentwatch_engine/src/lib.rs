//! Agentwatch engine: socket transport, HTTP API calls and timers.
mod api;
mod engine;
mod settings;
mod sink;
mod socket;
mod timers;
mod types;

pub use api::{ApiClient, ReqwestApiClient};
pub use engine::{EngineCommand, EngineError, EngineHandle};
pub use settings::{EngineSettings, Timestamp};
pub use sink::{ChannelEventSink, EventSink};
pub use socket::{run_socket, SocketCommand};
pub use types::{
    EngineEvent, FailureKind, FetchError, FinalAnalysisBody, OutboundFrame, SocketId, TimerKey,
};
