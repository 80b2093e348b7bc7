use std::time::Duration;

use agentwatch_engine::{ApiClient, EngineSettings, FailureKind, FinalAnalysisBody, ReqwestApiClient};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestApiClient {
    let settings = EngineSettings {
        server_url: server.uri(),
        ..EngineSettings::default()
    };
    ReqwestApiClient::new(settings).expect("client")
}

#[tokio::test]
async fn report_content_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/AAPL/2024-05-10/market"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "agent": "market",
            "report_content": "## Market\nUptrend",
            "report_type": "market_report"
        })))
        .mount(&server)
        .await;

    let content = client_for(&server)
        .fetch_report("AAPL", "2024-05-10", "market")
        .await
        .expect("report");
    assert_eq!(content, "## Market\nUptrend");
}

#[tokio::test]
async fn unsuccessful_report_is_rejected_with_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/AAPL/2024-05-10/trader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "agent": "trader",
            "error": "not_found",
            "message": "No trader report found for AAPL on 2024-05-10"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_report("AAPL", "2024-05-10", "trader")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
    assert_eq!(err.message, "No trader report found for AAPL on 2024-05-10");
}

#[tokio::test]
async fn http_errors_surface_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/aapl/2024-05-10/news"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Invalid ticker format: aapl. Must be 1-5 uppercase letters."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reports/AAPL/2024-05-10/news"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .fetch_report("aapl", "2024-05-10", "news")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert!(err.message.starts_with("Invalid ticker format"));

    let err = client
        .fetch_report("AAPL", "2024-05-10", "news")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn slow_report_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/AAPL/2024-05-10/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({ "success": true, "report_content": "late" })),
        )
        .mount(&server)
        .await;

    let settings = EngineSettings {
        server_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..EngineSettings::default()
    };
    let err = ReqwestApiClient::new(settings)
        .expect("client")
        .fetch_report("AAPL", "2024-05-10", "final")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn garbage_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/AAPL/2024-05-10/market"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_report("AAPL", "2024-05-10", "market")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn final_analysis_defaults_recommendation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/final-analysis/MSFT/2024-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "ticker": "MSFT",
            "date": "2024-01-02",
            "final_analysis": "Strong cloud growth.",
            "source": "database"
        })))
        .mount(&server)
        .await;

    let analysis = client_for(&server)
        .fetch_final_analysis("MSFT", "2024-01-02")
        .await
        .expect("final analysis");
    assert_eq!(
        analysis,
        FinalAnalysisBody {
            final_analysis: "Strong cloud growth.".into(),
            recommendation: "HOLD".into(),
        }
    );
}

#[tokio::test]
async fn missing_final_analysis_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/final-analysis/MSFT/2024-01-03"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": "No analysis session found for MSFT on 2024-01-03"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_final_analysis("MSFT", "2024-01-03")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.message, "No analysis session found for MSFT on 2024-01-03");
}

#[tokio::test]
async fn start_analysis_posts_request_body() {
    let server = MockServer::start().await;
    let body = json!({
        "ticker": "NVDA",
        "analysis_date": "2024-06-03",
        "analysts": ["market", "news"],
        "research_depth": 3,
        "llm_provider": "openai",
        "backend_url": "https://api.openai.com/v1",
        "shallow_thinker": "gpt-4o-mini",
        "deep_thinker": "o4-mini"
    });
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .and(header("content-type", "application/json"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "started",
            "message": "Analysis started successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message = client_for(&server)
        .start_analysis(&body)
        .await
        .expect("started");
    assert_eq!(message, "Analysis started successfully");
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    let settings = EngineSettings {
        server_url: "http://127.0.0.1:9".to_string(),
        ..EngineSettings::default()
    };
    let err = ReqwestApiClient::new(settings)
        .expect("client")
        .fetch_report("AAPL", "2024-05-10", "market")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::Network | FailureKind::Timeout));
}
