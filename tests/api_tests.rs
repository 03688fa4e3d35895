mod common;

use std::sync::Arc;

use common::{FakeSpeech, greeting_store, stitcher, test_config};
use lambda_runtime::{Context, LambdaEvent};
use serde_json::{Value, json};
use stitcher::api::handler;
use stitcher::api::helpers::{err_response, job_response};
use stitcher::core::models::JobResult;

fn body_of(response: &Value) -> JobResult {
    assert_eq!(response["statusCode"], 200);
    assert_eq!(response["headers"]["Content-Type"], "application/json");
    serde_json::from_str(response["body"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_proxy_event_round_trip() {
    let app = stitcher(test_config(), Arc::new(greeting_store()), Arc::new(FakeSpeech::new(0.5)));
    let event = LambdaEvent::new(
        json!({
            "headers": { "x-amzn-trace-id": "Root=1-test" },
            "body": r#"{"message":"hello shreeshail","audios":"clips","output":"output/test_1.mp3"}"#,
            "isBase64Encoded": false
        }),
        Context::default(),
    );

    let response = handler(&app, event).await.unwrap();
    let result = body_of(&response);

    assert!(result.success, "{}", result.message);
    assert_eq!(result.output_file.as_deref(), Some("output/test_1.mp3"));
    assert!(result.audio_data.is_some());
}

#[tokio::test]
async fn test_malformed_body_is_a_200_validation_error() {
    let store = Arc::new(greeting_store());
    let speech = Arc::new(FakeSpeech::new(0.5));
    let app = stitcher(test_config(), store.clone(), speech.clone());
    let event = LambdaEvent::new(json!({ "body": "{\"message\": " }), Context::default());

    let response = handler(&app, event).await.unwrap();
    let result = body_of(&response);

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("ValidationError"));
    assert_eq!(store.adapter_calls(), 0);
    assert_eq!(speech.calls(), 0);
}

#[tokio::test]
async fn test_logical_failures_keep_status_200() {
    let app = stitcher(test_config(), Arc::new(greeting_store()), Arc::new(FakeSpeech::new(0.5)));
    let event = LambdaEvent::new(
        json!({ "message": "hello", "audios": "no-such-bucket", "output": "out.mp3" }),
        Context::default(),
    );

    let response = handler(&app, event).await.unwrap();
    let result = body_of(&response);

    assert_eq!(result.error.as_deref(), Some("NotFoundError"));
}

#[test]
fn test_job_response_shape() {
    let result = JobResult {
        success: true,
        message: "Audio file created successfully".to_string(),
        output_file: Some("out.mp3".to_string()),
        audio_size_bytes: Some(3),
        audio_data: Some("YWJj".to_string()),
        ..JobResult::default()
    };
    let response = job_response(&result);
    let body: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();

    assert_eq!(response["statusCode"], 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["audio_size_bytes"], 3);
    assert!(body.get("note").is_none());
    assert!(body.get("error").is_none());
}

#[test]
fn test_err_response_includes_success_flag() {
    let response = err_response(500, "boom");
    let body: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
    assert_eq!(response["statusCode"], 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "boom");
}
