use campaign_ops::core::gateway::ping;
use campaign_ops::OpsError;
use httpmock::prelude::*;

#[tokio::test]
async fn test_ping_reports_success() {
    let server = MockServer::start();
    let stage_mock = server.mock(|when, then| {
        when.method(GET).path("/prod/health");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"ok": true}));
    });

    let result = ping(&reqwest::Client::new(), &server.url("/prod/health"))
        .await
        .unwrap();

    stage_mock.assert();
    assert_eq!(result.status, 200);
    assert!(result.is_success());
    assert!(result.body_bytes > 0);
}

#[tokio::test]
async fn test_ping_reports_server_error_without_failing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/prod/send");
        then.status(502).body("Bad Gateway");
    });

    let result = ping(&reqwest::Client::new(), &server.url("/prod/send"))
        .await
        .unwrap();

    assert_eq!(result.status, 502);
    assert!(!result.is_success());
    assert_eq!(result.body_bytes, "Bad Gateway".len());
}

#[tokio::test]
async fn test_ping_rejects_invalid_url() {
    let result = ping(&reqwest::Client::new(), "not a url").await;
    assert!(matches!(
        result,
        Err(OpsError::InvalidConfigValueError { .. })
    ));
}

#[tokio::test]
async fn test_ping_transport_failure_is_an_error() {
    // 沒有服務監聽的埠
    let result = ping(&reqwest::Client::new(), "http://127.0.0.1:1/prod").await;
    assert!(matches!(result, Err(OpsError::HttpError(_))));
}
