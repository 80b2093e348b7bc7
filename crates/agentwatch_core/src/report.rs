use std::collections::BTreeMap;

use crate::{Context, FinalAnalysis, ReportKey};

/// Fetch command for one report. Re-issuing it is always safe: the result is
/// keyed by the same (context, key) and stale contexts are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportRequest {
    pub context: Context,
    pub key: ReportKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportView {
    Loading(ReportRequest),
    Loaded { content: String },
    Failed { message: String, retry: ReportRequest },
}

/// Per-key presentation state of opened reports for the live context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportPanel {
    views: BTreeMap<ReportKey, ReportView>,
    selected: Option<ReportKey>,
}

impl ReportPanel {
    pub fn view(&self, key: ReportKey) -> Option<&ReportView> {
        self.views.get(&key)
    }

    pub fn selected(&self) -> Option<ReportKey> {
        self.selected
    }

    pub fn select(&mut self, key: ReportKey) {
        self.selected = Some(key);
    }

    pub fn is_loading(&self, key: ReportKey) -> bool {
        matches!(self.views.get(&key), Some(ReportView::Loading(_)))
    }

    pub fn set(&mut self, key: ReportKey, view: ReportView) {
        self.views.insert(key, view);
    }

    pub fn retry_command(&self, key: ReportKey) -> Option<&ReportRequest> {
        match self.views.get(&key) {
            Some(ReportView::Failed { retry, .. }) => Some(retry),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.views.clear();
        self.selected = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FinalAnalysisView {
    #[default]
    None,
    Loading(Context),
    Loaded(FinalAnalysis),
    Failed { message: String, retry: Context },
}
