//! Backend HTTP API behaviour

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn test_health_and_index() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], backend::SERVICE_NAME);

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["health"], "/health");
}

#[tokio::test]
async fn test_analyze_stores_result() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/analyze", json!({ "content": "# Plan\nbuild the api", "input_type": "markdown" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"]["word_count"], 5);
    assert_eq!(body["analysis"]["input_type"], "markdown");
    assert_eq!(body["analysis"]["markdown_features"]["headers"]["total"], 1);
    assert_eq!(body["analysis"]["basic_stats"]["paragraphs"], 1);
    assert!(body["analysis"].get("json_structure").is_none());

    let id = body["processing_id"].as_str().unwrap().to_string();
    let (status, body) = app.get(&format!("/api/status/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["processing_id"], id.as_str());
}

#[tokio::test]
async fn test_analyze_describes_json_and_xml_inputs() {
    let app = TestApp::new();

    let (_, body) = app
        .post("/api/analyze", json!({ "content": "{\"tags\": [\"a\"]}", "input_type": "json" }))
        .await;
    let json_structure = &body["analysis"]["json_structure"];
    assert_eq!(json_structure["valid"], true);
    assert_eq!(json_structure["type"], "object");
    assert_eq!(json_structure["depth"], 2);

    let (status, body) = app
        .post("/api/analyze", json!({ "content": "<task><step/>", "input_type": "xml" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["xml_structure"]["valid"], false);
    assert!(body["analysis"]["xml_structure"]["error"].is_string());
}

#[tokio::test]
async fn test_request_validation() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/analyze", json!({ "content": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "content field is required");

    let (status, body) = app.post_raw("/api/analyze", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .post("/api/generate", json!({ "analysis": {}, "output_id": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "analysis field is required");

    let (status, body) = app
        .post(
            "/api/generate",
            json!({ "analysis": { "word_count": 1 }, "output_id": "x", "template": "fancy" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown template: fancy");
}

#[tokio::test]
async fn test_generate_is_retrievable_by_output_id() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/generate",
            json!({ "analysis": { "word_count": 3, "input_type": "text" }, "output_id": "out-1", "template": "analysis_report" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output_id"], "out-1");
    assert_eq!(body["template"], "analysis_report");
    assert!(body["xml_output"].as_str().unwrap().starts_with("<AnalysisReport id=\"out-1\""));

    let (status, body) = app.get("/api/data/out-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["template"], "analysis_report");
}

#[tokio::test]
async fn test_process_then_list_and_delete() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/process", json!({ "content": "one two three" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let processing_id = body["processing_id"].as_str().unwrap().to_string();
    let output_id = body["output_id"].as_str().unwrap().to_string();
    assert_ne!(processing_id, output_id);
    assert!(body["xml_output"].as_str().unwrap().contains(&output_id));

    let (_, list) = app.get("/api/data").await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["data"][0]["id"], processing_id.as_str());
    assert_eq!(list["data"][0]["word_count"], 3);

    let (status, body) = app.delete(&format!("/api/data/{processing_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Data {processing_id} deleted"));

    let (status, body) = app.get(&format!("/api/data/{processing_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Data {processing_id} not found"));
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/status/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Processing ID nope not found");

    let (status, _) = app.delete("/api/data/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_templates() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/templates").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["default", "task_packet", "analysis_report"]);
}
