/// DotaForge — AI Proxy
///
/// Jediný úkol: držet provider API klíče mimo klienta. Pass-through:
///   POST /api/gemini → generativelanguage.googleapis.com (:generateContent)
///   POST /api/openai → api.openai.com/v1/chat/completions
///
/// Pravidla (obě routy stejná):
///   - non-POST → 405 (axum method routing)
///   - nevalidní JSON body → 400 {error}
///   - chybějící/prázdný prompt → 400 {error}
///   - klíč nenastavený na serveru → 500 {error}
///   - provider non-2xx → jeho status přeposlán verbatim + {error, details}
///   - provider 2xx → tělo přeposláno beze změny
///
/// Spuštění:
///   cargo run --bin ai-proxy
///
/// Env: GEMINI_API_KEY, OPENAI_API_KEY, AI_PROXY_ADDR (default 127.0.0.1:8787)

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use dotenv::dotenv;
use serde_json::{json, Value};
use std::env;
use std::fs::File;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
struct AppState {
    client: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== DotaForge AI Proxy ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("dotaforge_ai_proxy.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of ai-proxy is already running! Exiting.");
            return Ok(());
        }
    };

    let addr = env::var("AI_PROXY_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".to_string());

    let state = AppState { client: reqwest::Client::new() };
    let app = Router::new()
        .route("/api/gemini", post(handle_gemini))
        .route("/api/openai", post(handle_openai))
        .with_state(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("AI proxy listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Handlery ──────────────────────────────────────────────────────────────────

async fn handle_gemini(State(st): State<AppState>, body: String) -> Response {
    let prompt = match read_prompt(&body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(key) = server_key("GEMINI_API_KEY") else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "AI API key not configured on the server.",
        );
    };

    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key={key}"
    );
    let payload = gemini_payload(&prompt);
    match st.client.post(&url).json(&payload).send().await {
        Ok(resp) => relay(resp, "AI API").await,
        Err(e) => {
            warn!("gemini forward failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing your request.",
            )
        }
    }
}

async fn handle_openai(State(st): State<AppState>, body: String) -> Response {
    let prompt = match read_prompt(&body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(key) = server_key("OPENAI_API_KEY") else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "OpenAI API key not configured on the server.",
        );
    };

    let payload = openai_payload(&prompt);
    match st
        .client
        .post("https://api.openai.com/v1/chat/completions")
        .header(header::AUTHORIZATION, format!("Bearer {key}"))
        .json(&payload)
        .send()
        .await
    {
        Ok(resp) => relay(resp, "OpenAI API").await,
        Err(e) => {
            warn!("openai forward failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing your request.",
            )
        }
    }
}

// ── Request/response plumbing ─────────────────────────────────────────────────

fn read_prompt(body: &str) -> Result<String, Response> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid JSON in request body."))?;
    extract_prompt(&parsed)
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Prompt is required."))
}

/// Prompt z body — akceptuje i double-encoded variantu, kdy celé body
/// dorazí jako JSON string ("{\"prompt\": ...}")
fn extract_prompt(body: &Value) -> Option<String> {
    if let Some(p) = body.get("prompt").and_then(Value::as_str) {
        if !p.trim().is_empty() {
            return Some(p.to_string());
        }
    }
    if let Some(s) = body.as_str() {
        if let Ok(inner) = serde_json::from_str::<Value>(s) {
            return inner
                .get("prompt")
                .and_then(Value::as_str)
                .filter(|p| !p.trim().is_empty())
                .map(String::from);
        }
    }
    None
}

fn server_key(var: &str) -> Option<String> {
    env::var(var).ok().filter(|k| !k.trim().is_empty())
}

fn gemini_payload(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "response_mime_type": "application/json",
            "temperature": 1.0
        }
    })
}

fn openai_payload(prompt: &str) -> Value {
    json!({
        "model": "gpt-4-turbo",
        "messages": [{ "role": "user", "content": prompt }],
        "response_format": { "type": "json_object" },
        "temperature": 1.0
    })
}

/// Provider 2xx → tělo beze změny, non-2xx → jeho status verbatim + {error, details}
async fn relay(resp: reqwest::Response, provider: &str) -> Response {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        warn!("{provider} request failed: HTTP {status}");
        let code = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        return (
            code,
            Json(json!({
                "error": format!(
                    "{provider} request failed: {}",
                    status.canonical_reason().unwrap_or("error")
                ),
                "details": body,
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn error_response(code: StatusCode, message: &str) -> Response {
    (code, Json(json!({ "error": message }))).into_response()
}

// ── Testy ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_read_from_plain_body() {
        let body = json!({ "prompt": "hello" });
        assert_eq!(extract_prompt(&body).unwrap(), "hello");
    }

    #[test]
    fn prompt_is_read_from_double_encoded_body() {
        let body = Value::String("{\"prompt\": \"hello\"}".to_string());
        assert_eq!(extract_prompt(&body).unwrap(), "hello");
    }

    #[test]
    fn empty_or_missing_prompt_is_rejected() {
        assert!(extract_prompt(&json!({ "prompt": "   " })).is_none());
        assert!(extract_prompt(&json!({ "other": 1 })).is_none());
        assert!(extract_prompt(&Value::Null).is_none());
    }

    #[test]
    fn gemini_payload_requests_json_mime() {
        let p = gemini_payload("test prompt");
        assert_eq!(
            p.pointer("/contents/0/parts/0/text").and_then(Value::as_str),
            Some("test prompt")
        );
        assert_eq!(
            p.pointer("/generationConfig/response_mime_type").and_then(Value::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn openai_payload_requests_json_object() {
        let p = openai_payload("test prompt");
        assert_eq!(p.pointer("/model").and_then(Value::as_str), Some("gpt-4-turbo"));
        assert_eq!(
            p.pointer("/messages/0/content").and_then(Value::as_str),
            Some("test prompt")
        );
        assert_eq!(
            p.pointer("/response_format/type").and_then(Value::as_str),
            Some("json_object")
        );
    }
}
