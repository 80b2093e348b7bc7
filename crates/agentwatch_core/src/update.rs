use agentwatch_logging::{sync_debug, sync_info, sync_warn};

use crate::report::{FinalAnalysisView, ReportView};
use crate::router::{self, Inbound};
use crate::{
    AgentId, AgentStatus, AppState, ConnId, ConnectionState, Context, Effect, JobState, Msg,
    Notice, Outbound, ReportKey, ReportRequest, Timer,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Connect => state.connection.connect(),
        Msg::Disconnect => {
            let effects = state.connection.disconnect();
            state.mark_dirty();
            effects
        }
        Msg::TickerEdited(raw) => {
            let ticker = raw.trim().to_ascii_uppercase();
            let context = Context::new(ticker, state.form.date.clone());
            state.apply_context(&context);
            Vec::new()
        }
        Msg::DateEdited(raw) => {
            let context = Context::new(state.form.ticker.clone(), raw.trim());
            state.apply_context(&context);
            Vec::new()
        }
        Msg::AnalystsEdited(analysts) => {
            state.form.analysts = analysts;
            state.mark_dirty();
            Vec::new()
        }
        Msg::DepthEdited(depth) => {
            state.form.research_depth = depth;
            state.mark_dirty();
            Vec::new()
        }
        Msg::StartAnalysisClicked => start_analysis(&mut state),
        Msg::OpenReport(agent) => open_report(&mut state, agent),
        Msg::RetryReport(key) => retry_report(&mut state, key),
        Msg::OpenFinalAnalysis => open_final_analysis(&mut state),
        Msg::PingClicked => state.connection.send(Outbound::Ping).into_iter().collect(),
        Msg::SocketOpened { conn } => socket_opened(&mut state, conn),
        Msg::SocketClosed { conn, code } => {
            let was_live = is_live(&state, conn);
            let effects = state.connection.on_close(conn, code);
            if was_live {
                connection_lost(&mut state);
            }
            effects
        }
        Msg::SocketError { conn, message } => {
            let was_live = is_live(&state, conn);
            let effects = state.connection.on_error(conn, &message);
            if was_live {
                connection_lost(&mut state);
            }
            effects
        }
        Msg::FrameReceived { conn, text } => {
            if !state.connection.is_current(conn) {
                sync_debug!("dropping frame from stale connection #{}", conn);
                Vec::new()
            } else {
                match router::route(&text) {
                    Some(inbound) => dispatch(&mut state, inbound),
                    None => Vec::new(),
                }
            }
        }
        Msg::TimerFired(timer) => match timer {
            Timer::ConnectTimeout(conn) => state.connection.on_connect_timeout(conn),
            Timer::Reconnect => {
                let effects = state.connection.on_reconnect_due();
                state.mark_dirty();
                effects
            }
            Timer::Heartbeat => state.connection.on_heartbeat_due(),
        },
        Msg::AnalysisRequestAnswered(result) => {
            analysis_request_answered(&mut state, result);
            Vec::new()
        }
        Msg::ReportFetched { request, result } => {
            report_fetched(&mut state, request, result);
            Vec::new()
        }
        Msg::FinalAnalysisFetched { context, result } => {
            if state.cache.context() != Some(&context) {
                sync_debug!("discarding final analysis for stale context {}", context);
            } else {
                state.final_analysis = match result {
                    Ok(analysis) => FinalAnalysisView::Loaded(analysis),
                    Err(message) => FinalAnalysisView::Failed {
                        message,
                        retry: context,
                    },
                };
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Handles one validated inbound message. Exactly one arm runs per message.
fn dispatch(state: &mut AppState, inbound: Inbound) -> Vec<Effect> {
    match inbound {
        Inbound::ConnectionEstablished { message } => {
            state.connection.on_established();
            sync_info!("server: {}", message);
            state.status_log.push(message);
            state.mark_dirty();
            Vec::new()
        }
        Inbound::Pong => {
            sync_debug!("heartbeat acknowledged");
            Vec::new()
        }
        Inbound::Echo => {
            sync_debug!("server echo");
            Vec::new()
        }
        Inbound::Status { message } => {
            state.status_log.push(message);
            state.mark_dirty();
            Vec::new()
        }
        Inbound::AgentStatus { agent, status } => {
            if state.registry.set(agent, status) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Inbound::AnalysisStart { context } => {
            sync_info!("analysis started for {}", context);
            begin_run(state, &context);
            state.job = JobState::Running;
            Vec::new()
        }
        Inbound::AnalysisComplete(results) => {
            for agent in results.completed_agents() {
                state.registry.set(agent, AgentStatus::Completed);
            }
            state.job = JobState::Completed;
            let recommendation = results.recommendation.clone();
            sync_info!("analysis complete: {}", recommendation);
            state.results = Some(results);
            state.notify(Notice::JobCompleted { recommendation });
            Vec::new()
        }
        Inbound::AnalysisCancelled { message } => {
            state.job = JobState::Cancelled;
            state.status_log.push(message.clone());
            state.notify(Notice::JobCancelled(message));
            Vec::new()
        }
        Inbound::ContextChange { context } => {
            state.apply_context(&context);
            Vec::new()
        }
        Inbound::Error { message } => {
            sync_warn!("server error: {}", message);
            if state.job.in_progress() {
                state.job = JobState::Failed;
            }
            state.notify(Notice::JobFailed(message));
            Vec::new()
        }
        Inbound::ServerShutdown { message } => {
            sync_info!("server shutting down: {}", message);
            let effects = state.connection.note_server_shutdown();
            state.notify(Notice::ServerShutdown(message));
            effects
        }
        Inbound::Ping => state.connection.send(Outbound::Pong).into_iter().collect(),
    }
}

fn is_live(state: &AppState, conn: ConnId) -> bool {
    state.connection.is_current(conn) && state.connection.state() != ConnectionState::Closed
}

fn socket_opened(state: &mut AppState, conn: ConnId) -> Vec<Effect> {
    let was_connecting = state.connection.is_current(conn)
        && state.connection.state() == ConnectionState::Connecting;
    let effects = state.connection.on_open(conn);
    if was_connecting && state.connection.state() == ConnectionState::Open {
        let reconnected = state.connection.opens() > 1;
        if reconnected && state.job.in_progress() {
            state
                .status_log
                .push("Reconnected; waiting for fresh agent status");
        }
        state.notify(Notice::Connected { reconnected });
    }
    effects
}

fn connection_lost(state: &mut AppState) {
    let retry_in = state
        .connection
        .reconnect_pending()
        .then(|| state.connection.last_delay())
        .flatten();
    state.notify(Notice::ConnectionLost { retry_in });
}

fn start_analysis(state: &mut AppState) -> Vec<Effect> {
    if state.job.in_progress() {
        sync_warn!("start ignored: an analysis is already in progress");
        return Vec::new();
    }
    let request = match state.form.validate() {
        Ok(request) => request,
        Err(errors) => {
            sync_warn!("analysis form rejected: {} problem(s)", errors.len());
            state.form_errors = errors.clone();
            state.notify(Notice::FormRejected(errors));
            return Vec::new();
        }
    };

    state.form_errors.clear();
    begin_run(
        state,
        &Context::new(request.ticker.clone(), request.analysis_date.clone()),
    );
    state.job = JobState::Starting;
    vec![Effect::StartAnalysis(request)]
}

/// Forgets the previous run's statuses and views. Cached reports are only
/// evicted when the context actually changes.
fn begin_run(state: &mut AppState, context: &Context) {
    state.registry.reset();
    state.results = None;
    if !state.apply_context(context) {
        state.reports.clear();
        state.final_analysis = FinalAnalysisView::None;
    }
    state.mark_dirty();
}

fn analysis_request_answered(state: &mut AppState, result: Result<String, String>) {
    if state.job != JobState::Starting {
        sync_debug!("late analysis acknowledgement ignored ({:?})", state.job);
        return;
    }
    match result {
        Ok(message) => {
            state.job = JobState::Running;
            state.status_log.push(message);
            state.mark_dirty();
        }
        Err(message) => {
            sync_warn!("analysis request failed: {}", message);
            state.job = JobState::Failed;
            state.notify(Notice::JobFailed(message));
        }
    }
}

fn open_report(state: &mut AppState, agent: AgentId) -> Vec<Effect> {
    if !state.is_available(agent) {
        sync_warn!(
            "report for {} requested while {}",
            agent,
            state.registry.status(agent)
        );
        return Vec::new();
    }
    let key = agent.report_key();
    state.reports.select(key);
    state.mark_dirty();

    if let Some(content) = state.cache.get(key) {
        let content = content.to_owned();
        state.reports.set(key, ReportView::Loaded { content });
        return Vec::new();
    }
    if state.reports.is_loading(key) {
        sync_debug!("{} report already loading", key);
        return Vec::new();
    }
    let Some(context) = state.cache.context().cloned() else {
        sync_warn!("cannot fetch {} report without a ticker and date", key);
        return Vec::new();
    };
    issue_fetch(state, ReportRequest { context, key })
}

fn retry_report(state: &mut AppState, key: ReportKey) -> Vec<Effect> {
    let Some(request) = state.reports.retry_command(key).cloned() else {
        sync_debug!("nothing to retry for {}", key);
        return Vec::new();
    };
    if state.cache.context() != Some(&request.context) {
        sync_debug!("retry for {} dropped: context changed", key);
        return Vec::new();
    }
    state.reports.select(key);
    state.mark_dirty();
    issue_fetch(state, request)
}

fn issue_fetch(state: &mut AppState, request: ReportRequest) -> Vec<Effect> {
    state
        .reports
        .set(request.key, ReportView::Loading(request.clone()));
    vec![Effect::FetchReport(request)]
}

fn report_fetched(state: &mut AppState, request: ReportRequest, result: Result<String, String>) {
    if state.cache.context() != Some(&request.context) {
        sync_debug!(
            "discarding {} report for stale context {}",
            request.key,
            request.context
        );
        return;
    }
    let key = request.key;
    let view = match result {
        Ok(content) => {
            state.cache.set(key, content.clone());
            ReportView::Loaded { content }
        }
        Err(message) => {
            sync_warn!("{} report failed: {}", key, message);
            ReportView::Failed {
                message,
                retry: request,
            }
        }
    };
    state.reports.set(key, view);
    state.mark_dirty();
}

fn open_final_analysis(state: &mut AppState) -> Vec<Effect> {
    let Some(context) = state.cache.context().cloned() else {
        sync_warn!("final analysis requested without a ticker and date");
        return Vec::new();
    };
    if matches!(state.final_analysis, FinalAnalysisView::Loading(_)) {
        return Vec::new();
    }
    state.final_analysis = FinalAnalysisView::Loading(context.clone());
    state.mark_dirty();
    vec![Effect::FetchFinalAnalysis(context)]
}
