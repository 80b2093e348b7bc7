use crate::report::{FinalAnalysisView, ReportView};
use crate::{AgentId, AgentStatus, ConnectionState, Context, FormError, JobState, ReportKey};

/// Read-only snapshot handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionState,
    pub reconnect_attempt: u32,
    pub reconnect_pending: bool,
    pub job: JobState,
    pub context: Option<Context>,
    pub agents: Vec<AgentRowView>,
    pub report: Option<ReportPaneView>,
    pub final_analysis: FinalAnalysisView,
    pub decision: Option<String>,
    pub recommendation: Option<String>,
    pub status_log: Vec<String>,
    pub form: FormView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRowView {
    pub agent: AgentId,
    pub status: AgentStatus,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaneView {
    pub key: ReportKey,
    pub view: ReportView,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormView {
    pub ticker: String,
    pub date: String,
    pub analysts: Vec<String>,
    pub research_depth: u8,
    pub errors: Vec<FormError>,
}
