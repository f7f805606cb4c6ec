pub mod health;
pub mod ui;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index_handler))
        .route("/health", get(health::health_handler))
        .route("/api/v1/options", get(handlers::handle_options))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/setup", post(handlers::handle_setup))
        .route(
            "/api/v1/sessions/:id/messages",
            post(handlers::handle_send_message),
        )
        .route("/api/v1/sessions/:id/stop", post(handlers::handle_stop))
        .route(
            "/api/v1/sessions/:id/feedback",
            post(handlers::handle_feedback),
        )
        .route(
            "/api/v1/sessions/:id/transcript",
            get(handlers::handle_download_transcript),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use futures::StreamExt;
    use serde_json::{json, Value};
    use tower::util::ServiceExt; // for `oneshot` method

    use super::build_router;
    use crate::config::Config;
    use crate::interview::feedback::FeedbackTemplate;
    use crate::interview::store::SessionStore;
    use crate::llm_client::scripted::{ScriptedProvider, ScriptedTurn};
    use crate::state::AppState;

    fn setup_app(provider: ScriptedProvider) -> axum::Router {
        let config =
            Config::from_lookup(|key: &str| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()))
                .unwrap();
        let state = AppState {
            sessions: SessionStore::new(Duration::from_secs(60)),
            llm: Arc::new(provider),
            config,
            feedback_template: Arc::new(FeedbackTemplate::default()),
        };
        build_router(state)
    }

    async fn call(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        (status, bytes.to_vec())
    }

    async fn call_json(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = call(app, method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, value)
    }

    fn profile() -> Value {
        json!({
            "name": "Ada",
            "experience": "Three years building forecasting models",
            "skills": "Python, SQL",
            "level": "Mid-level",
            "position": "Data Scientist",
            "company": "Spotify"
        })
    }

    /// Creates a session and completes setup; returns its base URI.
    async fn start_interview(app: &axum::Router) -> String {
        let (status, created) = call_json(app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let base = format!("/api/v1/sessions/{}", created["id"].as_str().unwrap());
        let (status, body) = call_json(app, "POST", &format!("{base}/setup"), Some(profile())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "interviewing");
        base
    }

    async fn send(app: &axum::Router, base: &str, text: &str) -> String {
        let (status, body) = call(
            app,
            "POST",
            &format!("{base}/messages"),
            Some(json!({ "content": text })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        String::from_utf8(body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = setup_app(ScriptedProvider::new());
        let (status, body) = call_json(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_page_has_stop_control() {
        let app = setup_app(ScriptedProvider::new());
        let (status, body) = call(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("id=\"stop-btn\""));
        assert!(html.contains("Escape"));
    }

    #[tokio::test]
    async fn test_options_lists_catalogs() {
        let app = setup_app(ScriptedProvider::new());
        let (_, body) = call_json(&app, "GET", "/api/v1/options", None).await;
        assert_eq!(body["levels"], json!(["Junior", "Mid-level", "Senior"]));
        assert_eq!(body["max_candidate_messages"], 5);
        assert!(body["companies"].as_array().unwrap().contains(&json!("Spotify")));
    }

    #[tokio::test]
    async fn test_new_session_starts_in_setup() {
        let app = setup_app(ScriptedProvider::new());
        let (status, body) = call_json(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["phase"], "setup");
        assert_eq!(body["candidate_messages"], 0);
        assert_eq!(body["stop_requested"], false);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = setup_app(ScriptedProvider::new());
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, body) = call_json(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_setup_rejects_missing_name() {
        let app = setup_app(ScriptedProvider::new());
        let (_, created) = call_json(&app, "POST", "/api/v1/sessions", None).await;
        let uri = format!("/api/v1/sessions/{}/setup", created["id"].as_str().unwrap());
        let mut form = profile();
        form["name"] = json!("");
        let (status, body) = call_json(&app, "POST", &uri, Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_stop_during_setup_is_conflict() {
        let app = setup_app(ScriptedProvider::new());
        let (_, created) = call_json(&app, "POST", "/api/v1/sessions", None).await;
        let uri = format!("/api/v1/sessions/{}/stop", created["id"].as_str().unwrap());
        let (status, _) = call_json(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_message_streams_reply_events() {
        let provider =
            ScriptedProvider::new().with_turn(ScriptedTurn::Chunks(vec!["Welcome, ", "Ada."]));
        let app = setup_app(provider);
        let base = start_interview(&app).await;

        let sse = send(&app, &base, "Hi, I'm Ada.").await;
        assert!(sse.contains("event: chunk"));
        assert!(sse.contains("Welcome, "));
        assert!(sse.contains("event: finished"));

        let (_, snapshot) = call_json(&app, "GET", &base, None).await;
        assert_eq!(snapshot["candidate_messages"], 1);
        assert_eq!(snapshot["messages"][1]["role"], "interviewer");
        assert_eq!(snapshot["messages"][1]["content"], "Welcome, Ada.");
    }

    #[tokio::test]
    async fn test_stop_while_streaming_keeps_partial_reply() {
        let provider = ScriptedProvider::new()
            .with_turn(ScriptedTurn::Stall(vec!["Let me ", "think"]));
        let app = setup_app(provider);
        let base = start_interview(&app).await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("{base}/messages"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "content": "Hi, I'm Ada." }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut events = response.into_body().into_data_stream();

        // Wait until both chunks reached the page; the provider then stalls.
        let mut sse = String::new();
        while !sse.contains("think") {
            let frame = events.next().await.expect("stream open").unwrap();
            sse.push_str(&String::from_utf8_lossy(&frame));
        }

        let (status, snapshot) = call_json(&app, "POST", &format!("{base}/stop"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["phase"], "stopped");

        while let Some(frame) = events.next().await {
            sse.push_str(&String::from_utf8_lossy(&frame.unwrap()));
        }
        assert!(sse.contains("event: finished"));
        assert!(sse.contains("\"phase\":\"stopped\""));

        let (_, snapshot) = call_json(&app, "GET", &base, None).await;
        assert_eq!(snapshot["messages"][1]["content"], "Let me think");
        assert_eq!(snapshot["candidate_messages"], 1);
        assert_eq!(snapshot["feedback_available"], true);
        assert_eq!(snapshot["stop_requested"], true);
    }

    #[tokio::test]
    async fn test_stop_at_zero_messages_offers_no_feedback() {
        let provider = ScriptedProvider::new().with_completion("Overal Score: 5");
        let app = setup_app(provider.clone());
        let base = start_interview(&app).await;

        let (status, snapshot) = call_json(&app, "POST", &format!("{base}/stop"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["phase"], "stopped");
        assert_eq!(snapshot["feedback_available"], false);
        assert_eq!(snapshot["notice"], "Interview was stopped before it began.");

        let (status, _) = call_json(&app, "POST", &format!("{base}/feedback"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_five_messages_complete_then_feedback() {
        let provider = ScriptedProvider::new().with_completion("Overal Score: 8\nFeedback: Solid.");
        let app = setup_app(provider.clone());
        let base = start_interview(&app).await;

        for i in 0..5 {
            send(&app, &base, &format!("answer {i}")).await;
        }
        let (_, snapshot) = call_json(&app, "GET", &base, None).await;
        assert_eq!(snapshot["phase"], "completed");
        assert_eq!(snapshot["feedback_available"], true);

        let (status, _) = call(
            &app,
            "POST",
            &format!("{base}/messages"),
            Some(json!({ "content": "one more" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, snapshot) = call_json(&app, "POST", &format!("{base}/feedback"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["phase"], "feedback");
        assert_eq!(snapshot["feedback"], "Overal Score: 8\nFeedback: Solid.");

        // Stored feedback is returned without another provider call.
        let calls = provider.request_count();
        let (status, _) = call_json(&app, "POST", &format!("{base}/feedback"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(provider.request_count(), calls);
    }

    #[tokio::test]
    async fn test_stop_after_two_messages_then_download_transcript() {
        let provider = ScriptedProvider::new().with_completion("Overal Score: 6");
        let app = setup_app(provider);
        let base = start_interview(&app).await;

        send(&app, &base, "first").await;
        send(&app, &base, "second").await;
        let (_, snapshot) = call_json(&app, "POST", &format!("{base}/stop"), None).await;
        assert_eq!(snapshot["phase"], "stopped");
        assert_eq!(snapshot["feedback_available"], true);

        let (status, body) = call(&app, "GET", &format!("{base}/transcript"), None).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("system: "));
        assert!(text.contains("candidate: first"));
        assert!(text.contains("candidate: second"));
    }

    #[tokio::test]
    async fn test_transcript_unavailable_while_interviewing() {
        let app = setup_app(ScriptedProvider::new());
        let base = start_interview(&app).await;
        let (status, _) = call(&app, "GET", &format!("{base}/transcript"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_provider_failure_ends_session() {
        let provider = ScriptedProvider::new().with_turn(ScriptedTurn::Refuse);
        let app = setup_app(provider);
        let base = start_interview(&app).await;

        let sse = send(&app, &base, "hello").await;
        assert!(sse.contains("event: failed"));

        let (_, snapshot) = call_json(&app, "GET", &base, None).await;
        assert_eq!(snapshot["phase"], "failed");
        assert!(snapshot["error"]
            .as_str()
            .unwrap()
            .starts_with("Assistant response failed"));
    }

    #[tokio::test]
    async fn test_feedback_failure_is_terminal() {
        let provider = ScriptedProvider::new().with_failing_completion(500);
        let app = setup_app(provider);
        let base = start_interview(&app).await;
        send(&app, &base, "hello").await;
        call_json(&app, "POST", &format!("{base}/stop"), None).await;

        let (status, body) = call_json(&app, "POST", &format!("{base}/feedback"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Feedback generation failed"));

        let (_, snapshot) = call_json(&app, "GET", &base, None).await;
        assert_eq!(snapshot["phase"], "failed");
    }

    #[tokio::test]
    async fn test_delete_restarts() {
        let app = setup_app(ScriptedProvider::new());
        let base = start_interview(&app).await;
        let (status, _) = call(&app, "DELETE", &base, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
