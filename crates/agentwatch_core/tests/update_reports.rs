use std::sync::Once;

use agentwatch_core::{
    update, AgentId, AppState, Context, Effect, FinalAnalysis, FinalAnalysisView, Msg, ReportKey,
    ReportRequest, ReportView,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(agentwatch_logging::initialize_for_tests);
}

fn frame(text: &str) -> Msg {
    Msg::FrameReceived {
        conn: 1,
        text: text.to_string(),
    }
}

fn completed(agent: &str) -> Msg {
    frame(&format!(
        r#"{{"type":"agent_status","agent":"{agent}","status":"completed"}}"#
    ))
}

fn aapl() -> Context {
    Context::new("AAPL", "2024-05-10")
}

fn running_aapl() -> AppState {
    let (state, _) = update(AppState::new(), Msg::Connect);
    let (state, _) = update(state, Msg::SocketOpened { conn: 1 });
    let (state, _) = update(
        state,
        frame(r#"{"type":"analysis_start","ticker":"AAPL","date":"2024-05-10"}"#),
    );
    state
}

fn market_request() -> ReportRequest {
    ReportRequest {
        context: aapl(),
        key: ReportKey::Market,
    }
}

#[test]
fn unavailable_agent_issues_no_fetch() {
    init_logging();
    let (state, effects) = update(running_aapl(), Msg::OpenReport(AgentId::MarketAnalyst));
    assert!(effects.is_empty());
    assert_eq!(state.reports().view(ReportKey::Market), None);
}

#[test]
fn first_open_fetches_and_second_open_hits_cache() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Market Analyst"));
    let (state, effects) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    assert_eq!(effects, vec![Effect::FetchReport(market_request())]);
    assert_eq!(
        state.reports().view(ReportKey::Market),
        Some(&ReportView::Loading(market_request()))
    );

    // A second click while loading does not duplicate the request.
    let (state, effects) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Ok("## Market\nUptrend".into()),
        },
    );
    assert_eq!(state.cache().get(ReportKey::Market), Some("## Market\nUptrend"));

    let (state, effects) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    assert!(effects.is_empty());
    let pane = state.view().report.expect("selected report");
    assert_eq!(pane.key, ReportKey::Market);
    assert_eq!(
        pane.view,
        ReportView::Loaded {
            content: "## Market\nUptrend".into()
        }
    );
}

#[test]
fn agents_sharing_a_report_share_its_fetch() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Bull Researcher"));
    let (state, _) = update(state, completed("Bear Researcher"));
    let (state, effects) = update(state, Msg::OpenReport(AgentId::BullResearcher));
    assert_eq!(effects.len(), 1);
    let (_state, effects) = update(state, Msg::OpenReport(AgentId::BearResearcher));
    assert!(effects.is_empty());
}

#[test]
fn failed_fetch_offers_retry() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Market Analyst"));
    let (state, _) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    let (state, effects) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Err("No market report found".into()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.reports().view(ReportKey::Market),
        Some(&ReportView::Failed {
            message: "No market report found".into(),
            retry: market_request(),
        })
    );
    assert!(!state.cache().has(ReportKey::Market));

    let (state, effects) = update(state, Msg::RetryReport(ReportKey::Market));
    assert_eq!(effects, vec![Effect::FetchReport(market_request())]);
    let (state, _) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Ok("recovered".into()),
        },
    );
    assert_eq!(state.cache().get(ReportKey::Market), Some("recovered"));

    // Nothing left to retry once loaded.
    let (_state, effects) = update(state, Msg::RetryReport(ReportKey::Market));
    assert!(effects.is_empty());
}

#[test]
fn late_result_for_old_context_is_discarded() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Market Analyst"));
    let (state, _) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    let (state, _) = update(state, Msg::TickerEdited("msft".into()));
    assert_eq!(
        state.cache().context(),
        Some(&Context::new("MSFT", "2024-05-10"))
    );

    let (state, _) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Ok("AAPL market".into()),
        },
    );
    assert!(state.cache().is_empty());
    assert_eq!(state.reports().view(ReportKey::Market), None);
}

#[test]
fn context_change_evicts_cached_reports() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Market Analyst"));
    let (state, _) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    let (state, _) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Ok("AAPL market".into()),
        },
    );
    assert!(state.cache().has(ReportKey::Market));

    let (state, _) = update(state, Msg::DateEdited("2024-05-10".into()));
    assert!(state.cache().has(ReportKey::Market));

    let (state, _) = update(state, Msg::DateEdited("2024-05-11".into()));
    assert!(state.cache().is_empty());
    assert_eq!(state.view().report, None);

    // Back to the original context: still a miss, so a fresh fetch.
    let (state, _) = update(state, Msg::DateEdited("2024-05-10".into()));
    let (_state, effects) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    assert_eq!(effects, vec![Effect::FetchReport(market_request())]);
}

#[test]
fn restart_for_same_context_keeps_cached_reports() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Market Analyst"));
    let (state, _) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    let (state, _) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Ok("AAPL market".into()),
        },
    );

    let (state, _) = update(
        state,
        frame(r#"{"type":"analysis_start","ticker":"AAPL","date":"2024-05-10"}"#),
    );
    assert_eq!(state.cache().get(ReportKey::Market), Some("AAPL market"));
    assert_eq!(state.view().report, None);
    assert!(!state.registry().is_available(AgentId::MarketAnalyst));

    // Once the agent completes again the cached copy is served without a fetch.
    let (state, _) = update(state, completed("Market Analyst"));
    let (state, effects) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    assert!(effects.is_empty());
    assert_eq!(
        state.reports().view(ReportKey::Market),
        Some(&ReportView::Loaded {
            content: "AAPL market".into()
        })
    );
}

#[test]
fn retry_after_context_change_is_dropped() {
    init_logging();
    let (state, _) = update(running_aapl(), completed("Market Analyst"));
    let (state, _) = update(state, Msg::OpenReport(AgentId::MarketAnalyst));
    let (state, _) = update(
        state,
        Msg::ReportFetched {
            request: market_request(),
            result: Err("timeout".into()),
        },
    );
    let (state, _) = update(state, Msg::TickerEdited("TSLA".into()));
    let (_state, effects) = update(state, Msg::RetryReport(ReportKey::Market));
    assert!(effects.is_empty());
}

#[test]
fn final_analysis_is_fetched_once_per_request() {
    init_logging();
    let (state, effects) = update(running_aapl(), Msg::OpenFinalAnalysis);
    assert_eq!(effects, vec![Effect::FetchFinalAnalysis(aapl())]);
    let (state, effects) = update(state, Msg::OpenFinalAnalysis);
    assert!(effects.is_empty());

    let analysis = FinalAnalysis {
        final_analysis: "Hold for now".into(),
        recommendation: "HOLD".into(),
    };
    let (state, _) = update(
        state,
        Msg::FinalAnalysisFetched {
            context: aapl(),
            result: Ok(analysis.clone()),
        },
    );
    assert_eq!(state.view().final_analysis, FinalAnalysisView::Loaded(analysis));
}

#[test]
fn report_without_context_is_not_fetched() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::Connect);
    let (state, _) = update(state, Msg::SocketOpened { conn: 1 });
    let (state, _) = update(state, completed("Trader"));
    let (_state, effects) = update(state, Msg::OpenReport(AgentId::Trader));
    assert!(effects.is_empty());

    let (_state, effects) = update(AppState::new(), Msg::OpenFinalAnalysis);
    assert!(effects.is_empty());
}
