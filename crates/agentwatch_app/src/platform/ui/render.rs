use agentwatch_core::{
    AgentStatus, AppViewModel, ConnectionState, FinalAnalysisView, JobState, Notice, ReportView,
};

/// Renders the full view as terminal lines.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    let connection = match view.connection {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Open => "connected",
        ConnectionState::Closing => "closing",
        ConnectionState::Closed if view.reconnect_pending => "disconnected (retry scheduled)",
        ConnectionState::Closed => "disconnected",
    };
    let context = view
        .context
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    lines.push(format!(
        "== {} | job: {} | context: {} ==",
        connection,
        job_label(view.job),
        context
    ));
    if view.reconnect_attempt > 0 {
        lines.push(format!("   reconnect attempt {}", view.reconnect_attempt));
    }

    for row in &view.agents {
        let marker = match row.status {
            AgentStatus::Pending => "  ",
            AgentStatus::InProgress => "..",
            AgentStatus::Completed => "ok",
            AgentStatus::Error => "!!",
        };
        let hint = if row.available { "  (open)" } else { "" };
        lines.push(format!(
            "   [{}] {:<22} {}{}",
            marker,
            row.agent.name(),
            row.status,
            hint
        ));
    }

    if let Some(recommendation) = view.recommendation.as_deref().filter(|r| !r.is_empty()) {
        lines.push(format!("   recommendation: {recommendation}"));
    }
    if let Some(last) = view.status_log.last() {
        lines.push(format!("   last status: {last}"));
    }

    if let Some(pane) = &view.report {
        lines.push(format!("-- {} report --", pane.key));
        match &pane.view {
            ReportView::Loading(_) => lines.push("   loading...".to_string()),
            ReportView::Loaded { content } => {
                lines.extend(content.lines().map(|line| format!("   {line}")));
            }
            ReportView::Failed { message, .. } => {
                lines.push(format!("   failed: {message} (type `retry {}`)", pane.key));
            }
        }
    }

    match &view.final_analysis {
        FinalAnalysisView::None => {}
        FinalAnalysisView::Loading(_) => lines.push("-- final analysis: loading... --".into()),
        FinalAnalysisView::Loaded(analysis) => {
            lines.push(format!(
                "-- final analysis ({}) --",
                analysis.recommendation
            ));
            lines.extend(
                analysis
                    .final_analysis
                    .lines()
                    .map(|line| format!("   {line}")),
            );
        }
        FinalAnalysisView::Failed { message, .. } => {
            lines.push(format!("-- final analysis failed: {message} --"));
        }
    }

    let form = &view.form;
    lines.push(format!(
        "   form: ticker={} date={} analysts={} depth={}",
        or_dash(&form.ticker),
        or_dash(&form.date),
        form.analysts.join(","),
        form.research_depth
    ));
    lines.extend(form.errors.iter().map(|err| format!("   ! {err}")));
    lines
}

/// One-line rendering of a notification.
pub fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::Connected { reconnected: false } => "* connected".to_string(),
        Notice::Connected { reconnected: true } => "* reconnected".to_string(),
        Notice::ConnectionLost {
            retry_in: Some(delay),
        } => format!(
            "* connection lost; retrying in {:.1}s",
            delay.as_secs_f64()
        ),
        Notice::ConnectionLost { retry_in: None } => "* connection closed".to_string(),
        Notice::ServerShutdown(message) => format!("* server shutting down: {message}"),
        Notice::JobFailed(message) => format!("* analysis failed: {message}"),
        Notice::JobCancelled(message) => format!("* analysis cancelled: {message}"),
        Notice::JobCompleted { recommendation } => {
            format!("* analysis complete: {recommendation}")
        }
        Notice::FormRejected(errors) => format!("* form rejected ({} problem(s))", errors.len()),
    }
}

fn job_label(job: JobState) -> &'static str {
    match job {
        JobState::Idle => "idle",
        JobState::Starting => "starting",
        JobState::Running => "running",
        JobState::Completed => "completed",
        JobState::Failed => "failed",
        JobState::Cancelled => "cancelled",
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
