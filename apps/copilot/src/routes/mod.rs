pub mod health;
pub mod jobs;

use axum::{
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health::health_handler))
        .route("/api/v1/session", get(handlers::handle_get_session))
        .route(
            "/api/v1/session/job-description",
            put(handlers::handle_set_job_description),
        )
        .route(
            "/api/v1/session/resume",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/session/analyze", post(handlers::handle_analyze))
        .route(
            "/api/v1/session/cover-letter",
            post(handlers::handle_cover_letter),
        )
        .route("/api/v1/jobs", get(jobs::handle_list_jobs))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Json,
    };
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::backend_client::BackendClient;
    use crate::config::Config;
    use crate::ingestion::{FileIngestionPipeline, DOCX_MIME};

    const BOUNDARY: &str = "copilot-test-boundary";

    fn test_config(backend_url: &str) -> Config {
        Config {
            backend_url: backend_url.to_string(),
            port: 0,
            max_upload_bytes: 1024 * 1024,
            rust_log: "debug".to_string(),
        }
    }

    fn app_state(backend_url: &str) -> AppState {
        AppState::new(
            test_config(backend_url),
            BackendClient::new(backend_url).unwrap(),
            FileIngestionPipeline::default(),
        )
    }

    /// A fake analysis service on an ephemeral port.
    async fn spawn_backend() -> String {
        let router = Router::new()
            .route(
                "/analyze-job",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["job_description"], "Rust and Kafka");
                    Json(json!({ "match_score": 42.0, "missing_keywords": ["kafka"] }))
                }),
            )
            .route(
                "/generate-cover-letter",
                post(|| async { Json(json!({ "cover_letter": "Dear team," })) }),
            )
            .route(
                "/jobs",
                get(|| async {
                    Json(json!([{ "id": 1, "title": "Rust Engineer", "company": "Acme", "description": "Rust" }]))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A base URL with nothing listening behind it.
    async fn dead_backend() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn upload_request(content_type: &str, file_name: &str, body: &[u8]) -> Request<Body> {
        let mut payload = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(body);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/session/resume")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(payload))
            .unwrap()
    }

    /// Sends the part headers and the file body as separate chunks, the way
    /// a client streams a large upload.
    fn streamed_upload_request(content_type: &str, file_name: &str, body_len: usize) -> Request<Body> {
        let head = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        );
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from(head)),
            Ok(Bytes::from(vec![b'a'; body_len])),
            Ok(Bytes::from(format!("\r\n--{BOUNDARY}--\r\n"))),
        ];

        Request::builder()
            .method("POST")
            .uri("/api/v1/session/resume")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn session(state: &AppState) -> Value {
        send(state, empty_request("GET", "/api/v1/session")).await.1
    }

    async fn set_job_description(state: &AppState, text: &str) {
        let (status, _) = send(
            state,
            json_request(
                "PUT",
                "/api/v1/session/job-description",
                json!({ "job_description": text }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let state = app_state(&dead_backend().await);
        let (status, body) = send(&state, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let state = app_state(&dead_backend().await);
        let response = build_router(state)
            .oneshot(empty_request("GET", "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_fresh_session_has_actions_disabled() {
        let state = app_state(&dead_backend().await);
        let body = session(&state).await;
        assert_eq!(body["actions_enabled"], false);
        assert_eq!(body["resume"], Value::Null);
        assert_eq!(body["analysis"]["status"], "idle");
    }

    #[tokio::test]
    async fn test_plain_text_upload_becomes_resume() {
        let state = app_state(&dead_backend().await);
        let (status, body) = send(&state, upload_request("text/plain", "cv.txt", b"hello\nworld")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resume"]["text"], "hello\nworld");
        assert_eq!(body["resume"]["display_name"], "cv.txt");
        assert_eq!(body["current"], true);

        let snapshot = session(&state).await;
        assert_eq!(snapshot["resume"]["text"], "hello\nworld");
        assert_eq!(snapshot["selected_file"], "cv.txt");
        assert_eq!(snapshot["ingestion"]["status"], "succeeded");
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_415_and_keeps_previous_resume() {
        let state = app_state(&dead_backend().await);
        send(&state, upload_request("text/plain", "cv.txt", b"Rust")).await;

        let (status, body) = send(&state, upload_request("image/png", "photo.png", b"\x89PNG")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FILE_TYPE");

        let snapshot = session(&state).await;
        assert_eq!(snapshot["resume"]["text"], "Rust");
        assert_eq!(snapshot["selected_file"], "photo.png");
        assert_eq!(snapshot["ingestion"]["status"], "failed");
        assert_eq!(
            snapshot["ingestion"]["payload"]["error"],
            "Only PDF, DOCX, or TXT files are supported."
        );
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_422_and_visible_in_session() {
        let state = app_state(&dead_backend().await);
        let (status, body) =
            send(&state, upload_request("application/pdf", "cv.pdf", b"garbage bytes")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "EXTRACTION_FAILED");

        let snapshot = session(&state).await;
        assert_eq!(snapshot["ingestion"]["status"], "failed");
        assert_eq!(snapshot["resume"], Value::Null);
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_422() {
        let state = app_state(&dead_backend().await);
        let (status, _) = send(&state, upload_request(DOCX_MIME, "cv.docx", b"not a zip")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_400() {
        let state = app_state(&dead_backend().await);
        let payload = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/session/resume")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(payload))
            .unwrap();

        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analyze_rejected_while_disabled() {
        let state = app_state(&spawn_backend().await);
        set_job_description(&state, "Rust and Kafka").await;

        let (status, body) = send(&state, empty_request("POST", "/api/v1/session/analyze")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "resume is empty");

        let (status, _) = send(&state, empty_request("POST", "/api/v1/session/cover-letter")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(session(&state).await["analysis"]["status"], "idle");
    }

    #[tokio::test]
    async fn test_analyze_and_cover_letter_flow() {
        let state = app_state(&spawn_backend().await);
        set_job_description(&state, "Rust and Kafka").await;
        send(&state, upload_request("text/plain", "cv.txt", b"Rust services")).await;
        assert_eq!(session(&state).await["actions_enabled"], true);

        let (status, body) = send(&state, empty_request("POST", "/api/v1/session/analyze")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "succeeded");
        assert_eq!(body["payload"]["match_score"], 42.0);
        assert_eq!(body["payload"]["missing_keywords"], json!(["kafka"]));

        let (status, body) =
            send(&state, empty_request("POST", "/api/v1/session/cover-letter")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"]["cover_letter"], "Dear team,");

        let snapshot = session(&state).await;
        assert_eq!(snapshot["analysis"]["status"], "succeeded");
        assert_eq!(snapshot["cover_letter"]["payload"]["cover_letter"], "Dear team,");
    }

    #[tokio::test]
    async fn test_backend_down_is_502_and_recorded_as_failed() {
        let state = app_state(&dead_backend().await);
        set_job_description(&state, "Rust").await;
        send(&state, upload_request("text/plain", "cv.txt", b"Rust")).await;

        let (status, body) = send(&state, empty_request("POST", "/api/v1/session/analyze")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "BACKEND_ERROR");

        let snapshot = session(&state).await;
        assert_eq!(snapshot["analysis"]["status"], "failed");
        assert_eq!(snapshot["cover_letter"]["status"], "idle");
    }

    #[tokio::test]
    async fn test_jobs_proxy() {
        let state = app_state(&spawn_backend().await);
        let (status, body) = send(&state, empty_request("GET", "/api/v1/jobs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["company"], "Acme");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_413() {
        let mut state = app_state(&dead_backend().await);
        state.config.max_upload_bytes = 16;
        let (status, body) = send(&state, upload_request("text/plain", "cv.txt", &[b'a'; 4096])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(session(&state).await["resume"], Value::Null);
    }

    #[tokio::test]
    async fn test_oversized_streamed_upload_is_413() {
        let mut state = app_state(&dead_backend().await);
        state.config.max_upload_bytes = 1024;
        let request = streamed_upload_request("text/plain", "cv.txt", 4096);

        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_unsupported_upload_body_is_not_buffered() {
        let mut state = app_state(&dead_backend().await);
        state.config.max_upload_bytes = 1024;
        let request = streamed_upload_request("image/png", "photo.png", 4096);

        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FILE_TYPE");
    }
}
