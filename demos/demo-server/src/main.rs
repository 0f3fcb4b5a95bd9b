use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use sessionforge::prelude::*;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed handler, rendered as a JSON error body.
#[derive(Debug)]
struct DemoError(SessionforgeError);

impl From<SessionError> for DemoError {
    fn from(err: SessionError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for DemoError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionforgeError::Store(_)
            | SessionforgeError::Session(SessionError::Store(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self.0, "request failed");

        let body = serde_json::json!({
            "type": "error",
            "error": { "message": self.0.to_string() }
        });
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

fn router<S: MappingStore>(manager: SessionManager<S>) -> Router {
    Router::new()
        .route("/demo/index", get(index::<S>))
        .with_state(manager)
}

/// Reads `hello`, writes it, reads it back.
///
/// The first visit logs `None`; every later visit with the same cookie
/// logs the stored value.
async fn index<S: MappingStore>(
    State(manager): State<SessionManager<S>>,
    request: Request,
) -> Result<Response, DemoError> {
    let mut request = SessionRequest::new(request, manager);
    let session = request.session().await?;

    let before: Option<String> = session.get("hello").await?;
    tracing::info!(session_id = %session.id(), hello = ?before, "demo/index");

    session.set("hello", "session").await?;
    let after: Option<String> = session.get("hello").await?;

    let body = serde_json::json!({
        "session_id": session.id(),
        "is_new": session.is_new(),
        "before": before,
        "after": after,
    });

    let (_request, _session, cookies) = request.into_parts();
    let mut response = Json(body).into_response();
    cookies.write_to(response.headers_mut());
    Ok(response)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sessionforge::telemetry::init();

    let config = AppConfig::load()?;
    let store = Arc::new(RedisStore::connect(&config.store).await?);
    let manager = SessionManager::new(store, config.session);

    let addr = std::env::var("DEMO_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "demo server listening");

    axum::serve(listener, router(manager)).await?;
    Ok(())
}
