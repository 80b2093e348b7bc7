//! Agentwatch core: pure synchronization state machine and view-model helpers.
//!
//! Nothing in this crate performs IO. The runtime feeds `Msg` values into
//! [`update`] one at a time, in arrival order, and executes the returned
//! [`Effect`]s.
mod agent;
mod cache;
mod connection;
mod effect;
mod form;
mod job;
mod msg;
mod registry;
mod report;
pub mod router;
mod state;
mod update;
mod view_model;

pub use agent::{AgentId, AgentStatus, ReportKey};
pub use cache::{Context, ReportCache};
pub use connection::{
    ConnId, ConnectionManager, ConnectionSettings, ConnectionState, ReconnectPolicy,
    NORMAL_CLOSURE,
};
pub use effect::{Effect, Outbound, Timer};
pub use form::{AnalysisForm, AnalysisRequest, FormError, ANALYST_OPTIONS, RESEARCH_DEPTHS};
pub use job::{FinalAnalysis, FinalResults, JobState, StatusLog, STATUS_LOG_CAPACITY};
pub use msg::Msg;
pub use registry::{AgentStatusRegistry, StatusChange};
pub use report::{FinalAnalysisView, ReportPanel, ReportRequest, ReportView};
pub use router::{Inbound, RouteError};
pub use state::{AppState, Notice};
pub use update::update;
pub use view_model::{AgentRowView, AppViewModel, FormView, ReportPaneView};
