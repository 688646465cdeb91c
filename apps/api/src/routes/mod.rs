pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::document::handlers as document;
use crate::session::handlers as session;
use crate::state::AppState;

/// Headroom above the file limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/upload", post(document::handle_upload))
        .route("/chat", post(chat::handle_chat))
        .route("/download", post(document::handle_download))
        .route("/status/:session_id", get(session::handle_status))
        .route("/debug/:session_id", get(session::handle_debug))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::chat::KeywordChatResolver;
    use crate::config::Config;
    use crate::document::fixtures::docx_from_lines;
    use crate::document::{extract_text, DocxPackage, DOCX_MIME};
    use crate::extraction::HeuristicDescriber;
    use crate::session::InMemorySessionStore;

    fn app_with(config: Config) -> Router {
        let sessions = Arc::new(InMemorySessionStore::new(config.session_timeout()));
        build_router(AppState {
            config,
            sessions,
            describer: Arc::new(HeuristicDescriber),
            resolver: Arc::new(KeywordChatResolver),
        })
    }

    fn app() -> Router {
        app_with(Config::default())
    }

    fn upload_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let boundary = "docassist-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {DOCX_MIME}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(app: &Router, lines: &[&str]) -> Value {
        let response = app
            .clone()
            .oneshot(upload_request("file", "safe.docx", &docx_from_lines(lines)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "keyword");
        assert_eq!(body["service"], "docassist-api");
    }

    #[tokio::test]
    async fn test_upload_returns_placeholders_in_document_order() {
        let body = upload(
            &app(),
            &["Between [Company Name] and [Investor Name]", "Dated [Date], [Company Name]"],
        )
        .await;
        assert_eq!(body["filename"], "safe.docx");
        assert!(body["session_id"].as_str().unwrap().parse::<Uuid>().is_ok());
        let names: Vec<&str> = body["placeholders"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Company Name", "Investor Name", "Date"]);
        assert_eq!(body["placeholders"][2]["type"], "date");
        assert_eq!(body["placeholders"][0]["filled"], false);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_docx_name() {
        let response = app()
            .oneshot(upload_request("file", "contract.pdf", b"%PDF"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let response = app()
            .oneshot(upload_request("attachment", "safe.docx", b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_unreadable_package() {
        let response = app()
            .oneshot(upload_request("file", "broken.docx", b"not a zip archive"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_over_size_limit() {
        let app = app_with(Config {
            max_file_size_mb: 0,
            ..Config::default()
        });
        let response = app
            .oneshot(upload_request("file", "safe.docx", &docx_from_lines(&["[A]"])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app();
        let id = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(get_request(&format!("/status/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Session expired or invalid");

        let response = app
            .oneshot(json_request(
                "/chat",
                json!({"session_id": id, "message": "hi", "placeholders": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_404() {
        let app = app_with(Config {
            session_timeout_minutes: 1,
            ..Config::default()
        });
        let body = upload(&app, &["[Date]"]).await;
        let id = body["session_id"].as_str().unwrap().to_string();

        tokio::time::advance(Duration::from_secs(61)).await;
        let response = app
            .oneshot(get_request(&format!("/status/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_rejected() {
        let app = app();
        let body = upload(&app, &["[Date]"]).await;
        let response = app
            .oneshot(json_request(
                "/chat",
                json!({"session_id": body["session_id"], "message": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_session_flow() {
        let app = app();
        let uploaded = upload(
            &app,
            &["This agreement is made by [Company Name].", "Effective as of [Date]."],
        )
        .await;
        let session_id = uploaded["session_id"].clone();

        // Client claims Date is already filled; the server must ignore that.
        let mut forged = uploaded["placeholders"].clone();
        forged[1]["filled"] = json!(true);
        forged[1]["value"] = json!("forged");

        let response = app
            .clone()
            .oneshot(json_request(
                "/chat",
                json!({
                    "session_id": session_id,
                    "message": "The company is Acme Corp",
                    "placeholders": forged,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let turn = body_json(response).await;
        assert_eq!(turn["filled_values"], json!({"Company Name": "Acme Corp"}));
        assert_eq!(turn["placeholders"][0]["value"], "Acme Corp");
        assert_eq!(turn["placeholders"][1]["filled"], false);
        assert_eq!(turn["next_question"], "Date");

        let response = app
            .clone()
            .oneshot(json_request("/download", json!({"session_id": session_id})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Please fill remaining fields: Date");

        let response = app
            .clone()
            .oneshot(json_request(
                "/chat",
                json!({
                    "session_id": session_id,
                    "message": "The date is January 1, 2025",
                    "placeholders": turn["placeholders"],
                }),
            ))
            .await
            .unwrap();
        let turn = body_json(response).await;
        assert_eq!(turn["filled_values"], json!({"Date": "January 1, 2025"}));
        assert!(turn["next_question"].is_null());

        let id = session_id.as_str().unwrap();
        let status = body_json(
            app.clone()
                .oneshot(get_request(&format!("/status/{id}")))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status["progress"], "2/2");
        assert_eq!(status["completed"], true);

        let debug = body_json(
            app.clone()
                .oneshot(get_request(&format!("/debug/{id}")))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(debug["conversation_history_length"], 4);
        assert_eq!(debug["unfilled_placeholders"], json!([]));

        let response = app
            .oneshot(json_request("/download", json!({"session_id": session_id})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], DOCX_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"completed_safe.docx\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = extract_text(&DocxPackage::from_bytes(&bytes).unwrap()).unwrap();
        assert_eq!(
            text,
            "This agreement is made by Acme Corp.\nEffective as of January 1, 2025."
        );
    }

    #[tokio::test]
    async fn test_chat_after_completion_short_circuits() {
        let app = app();
        let uploaded = upload(&app, &["[Date]"]).await;
        let session_id = uploaded["session_id"].clone();

        for message in ["tomorrow", "anything else"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "/chat",
                    json!({"session_id": session_id, "message": message}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let turn = body_json(response).await;
            if message == "anything else" {
                assert_eq!(
                    turn["assistant_message"],
                    "All fields are now filled! Ready to download your document."
                );
                assert_eq!(turn["filled_values"], json!({}));
                assert_eq!(turn["placeholders"][0]["value"], "tomorrow");
            }
        }
    }
}
