//! StudGem - study-assistant API server.
//!
//! Proxies chat/flashcards/quiz/mindmap requests to a hosted LLM and ingests
//! uploaded study materials (PDF, Word, text, images) for summarization.

mod assistant;
mod error;
mod groq;
mod ingest;
mod ocr;
mod parse;
mod prompts;
mod schema;

use assistant::{Assistant, AssistantReply};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use error::ApiError;
use groq::GroqClient;
use ocr::{MistralOcrProvider, OcrProvider};
use prompts::PromptStore;
use schema::{AcademicContext, IncomingMessage, Mode};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Upload cap matching the browser client's limit.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
    ocr: Option<Arc<dyn OcrProvider>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studgem=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load prompts (built-ins, patched by prompts/ overrides if present)
    let prompts = Arc::new(PromptStore::load_from_dir(std::path::Path::new("prompts"))?);

    // Initialize Groq client
    let groq = GroqClient::from_env()?;
    info!("Groq client initialized");

    // Image OCR is optional; without it, image uploads are rejected
    let ocr: Option<Arc<dyn OcrProvider>> =
        match MistralOcrProvider::from_env(reqwest::Client::new()) {
            Some(provider) => {
                info!("OCR provider initialized: {}", provider.name());
                Some(Arc::new(provider))
            }
            None => {
                warn!("MISTRAL_API_KEY not set; image uploads disabled");
                None
            }
        };

    let state = AppState {
        assistant: Arc::new(Assistant::new(groq, prompts)),
        ocr,
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/upload-notes", post(upload_notes).get(upload_notes_get))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Chat pipeline: mode-specific prompt, hosted LLM call, parse + validate.
async fn chat(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let messages_value = body.get("messages").cloned().unwrap_or(serde_json::Value::Null);
    if !messages_value.is_array() {
        return Err(ApiError::BadRequest("Messages must be an array".to_string()));
    }
    let messages: Vec<IncomingMessage> = serde_json::from_value(messages_value)
        .map_err(|e| ApiError::BadRequest(format!("Malformed messages: {e}")))?;

    let mode = Mode::parse(body.get("mode").and_then(|m| m.as_str()));
    let context: AcademicContext = body
        .get("context")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("Malformed context: {e}")))?
        .unwrap_or_default();

    let reply = state.assistant.respond(mode, &messages, &context).await?;

    let body = match reply {
        AssistantReply::Chat { content } => json!({ "content": content }),
        AssistantReply::Flashcards { flashcards } => json!({
            "content": format!("Generated {} flashcards successfully", flashcards.len()),
            "flashcards": flashcards,
        }),
        AssistantReply::Quiz { quiz } => json!({ "quizData": quiz }),
        AssistantReply::Mindmap { mindmap } => json!({ "mindmapData": mindmap }),
    };

    Ok(Json(body))
}

/// Upload a study document, extract its text, and summarize it.
async fn upload_notes(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut filename = String::new();
    let mut mime = String::new();
    let mut data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document").to_string();
            mime = field.content_type().unwrap_or_default().to_string();
            data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?
                .to_vec();
            break;
        }
    }

    if data.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes, {})", filename, data.len(), mime);

    let extracted =
        ingest::extract_text(&filename, &mime, &data, state.ocr.as_deref()).await?;

    let content_hash = {
        let mut hasher = Sha256::new();
        hasher.update(&data);
        format!("{:x}", hasher.finalize())
    };

    // Summarization failure falls back to the extracted text itself
    let summary = match state.assistant.summarize_notes(&extracted).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Note summarization failed, returning extracted text: {e}");
            extracted.clone()
        }
    };

    Ok(Json(json!({
        "success": true,
        "noteId": Uuid::new_v4(),
        "contentHash": content_hash,
        "extractedText": extracted,
        "summary": summary,
        "fileType": mime,
        "fileName": filename,
    })))
}

/// Explicit GET handler so the client sees a JSON 405 instead of a bare one.
async fn upload_notes_get() -> ApiError {
    ApiError::MethodNotAllowed("Only POST requests are supported for file upload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use httpmock::{Method::POST, MockServer};
    use tower::ServiceExt;

    fn test_state(groq_url: &str) -> AppState {
        let client = GroqClient::new("test-key", "test-model", groq_url.to_string());
        AppState {
            assistant: Arc::new(Assistant::new(client, Arc::new(PromptStore::default()))),
            ocr: None,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = router(test_state("http://localhost:1"));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_without_messages_is_bad_request() {
        let app = router(test_state("http://localhost:1"));
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"mode": "chat"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["details"], "Messages must be an array");
    }

    #[tokio::test]
    async fn upload_notes_get_is_method_not_allowed() {
        let app = router(test_state("http://localhost:1"));
        let response = app
            .oneshot(Request::get("/api/upload-notes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn chat_round_trip_returns_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "LIFO." } }]
                }));
            })
            .await;

        let app = router(test_state(&server.url("/chat/completions")));
        let request_body = serde_json::json!({
            "messages": [{ "role": "user", "content": "What is a stack?" }],
            "mode": "chat",
            "context": { "year": "SY", "branch": "COMP" }
        });
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(request_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["content"], "LIFO.");
    }

    #[tokio::test]
    async fn quiz_round_trip_returns_quiz_data() {
        let server = MockServer::start_async().await;
        let quiz = r#"[{"question": "Which structure follows FIFO?", "options": ["Stack", "Queue", "Array", "Tree"], "answer": "Queue", "explanation": "Removal happens in arrival order.", "type": "recall", "importance": "Core data structure concept"}]"#;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": quiz } }]
                }));
            })
            .await;

        let app = router(test_state(&server.url("/chat/completions")));
        let request_body = serde_json::json!({
            "messages": [{ "role": "user", "content": "queues" }],
            "mode": "quiz"
        });
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(request_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["quizData"][0]["answer"], "Queue");
        assert_eq!(body["quizData"][0]["type"], "recall");
    }

    #[tokio::test]
    async fn upload_txt_note_returns_extraction_and_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "Summary: LIFO." } }]
                }));
            })
            .await;

        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             stacks are LIFO\r\n\
             --{boundary}--\r\n"
        );

        let app = router(test_state(&server.url("/chat/completions")));
        let response = app
            .oneshot(
                Request::post("/api/upload-notes")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["extractedText"], "stacks are LIFO");
        assert_eq!(body["summary"], "Summary: LIFO.");
        assert_eq!(body["fileName"], "notes.txt");
    }

    #[tokio::test]
    async fn upload_unsupported_type_lists_supported() {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.zip\"\r\n\
             Content-Type: application/zip\r\n\r\n\
             PK\r\n\
             --{boundary}--\r\n"
        );

        let app = router(test_state("http://localhost:1"));
        let response = app
            .oneshot(
                Request::post("/api/upload-notes")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unsupported file type");
        assert!(body["supportedTypes"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("application/pdf")));
    }
}
