use std::time::Duration;

use crate::report::{FinalAnalysisView, ReportPanel};
use crate::view_model::{AgentRowView, AppViewModel, FormView, ReportPaneView};
use crate::{
    AgentId, AgentStatusRegistry, AnalysisForm, ConnectionManager, ConnectionSettings, Context,
    FinalResults, FormError, JobState, ReportCache, StatusChange, StatusLog,
};

/// One-shot, user-visible notifications. Drained by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected { reconnected: bool },
    ConnectionLost { retry_in: Option<Duration> },
    ServerShutdown(String),
    JobFailed(String),
    JobCancelled(String),
    JobCompleted { recommendation: String },
    FormRejected(Vec<FormError>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub(crate) connection: ConnectionManager,
    pub(crate) registry: AgentStatusRegistry,
    pub(crate) cache: ReportCache,
    pub(crate) reports: ReportPanel,
    pub(crate) final_analysis: FinalAnalysisView,
    pub(crate) form: AnalysisForm,
    pub(crate) form_errors: Vec<FormError>,
    pub(crate) job: JobState,
    pub(crate) results: Option<FinalResults>,
    pub(crate) status_log: StatusLog,
    notices: Vec<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with explicit connection timings and form defaults from config.
    pub fn with_settings(settings: ConnectionSettings, form: AnalysisForm) -> Self {
        Self {
            connection: ConnectionManager::new(settings),
            form,
            ..Self::default()
        }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn registry(&self) -> &AgentStatusRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn reports(&self) -> &ReportPanel {
        &self.reports
    }

    pub fn job(&self) -> JobState {
        self.job
    }

    pub fn form(&self) -> &AnalysisForm {
        &self.form
    }

    pub fn results(&self) -> Option<&FinalResults> {
        self.results.as_ref()
    }

    pub fn status_log(&self) -> &StatusLog {
        &self.status_log
    }

    pub fn view(&self) -> AppViewModel {
        let selected = self.reports.selected();
        AppViewModel {
            connection: self.connection.state(),
            reconnect_attempt: self.connection.attempt(),
            reconnect_pending: self.connection.reconnect_pending(),
            job: self.job,
            context: self.cache.context().cloned(),
            agents: self
                .registry
                .iter()
                .map(|(agent, status)| AgentRowView {
                    agent,
                    status,
                    available: status.is_available(),
                })
                .collect(),
            report: selected.and_then(|key| {
                self.reports.view(key).map(|view| ReportPaneView {
                    key,
                    view: view.clone(),
                })
            }),
            final_analysis: self.final_analysis.clone(),
            decision: self.results.as_ref().map(|r| r.decision.clone()),
            recommendation: self.results.as_ref().map(|r| r.recommendation.clone()),
            status_log: self.status_log.iter().map(ToOwned::to_owned).collect(),
            form: FormView {
                ticker: self.form.ticker.clone(),
                date: self.form.date.clone(),
                analysts: self.form.analysts.clone(),
                research_depth: self.form.research_depth,
                errors: self.form_errors.clone(),
            },
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn take_status_changes(&mut self) -> Vec<StatusChange> {
        self.registry.take_changes()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
        self.dirty = true;
    }

    /// Switches the live context. A real change evicts every cached report
    /// and the per-report views that belonged to the old context.
    pub(crate) fn apply_context(&mut self, context: &Context) -> bool {
        self.form.ticker = context.ticker.clone();
        self.form.date = context.date.clone();
        self.mark_dirty();
        if !self.cache.set_context(&context.ticker, &context.date) {
            return false;
        }
        self.reports.clear();
        self.final_analysis = FinalAnalysisView::None;
        true
    }

    pub(crate) fn is_available(&self, agent: AgentId) -> bool {
        self.registry.is_available(agent)
    }
}
