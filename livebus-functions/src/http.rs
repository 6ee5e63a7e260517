//! HTTP surface for the callable functions.
//!
//! Requests carry `{"data": {...}}`; replies are `{"result": {...}}` on
//! success and `{"error": {"status", "message"}}` otherwise.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, Level};

use crate::callable::{ContactMessage, Functions, ShareLinkEmail};
use crate::error::CallableError;

#[derive(Deserialize)]
struct CallableRequest<T> {
    data: T,
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, CallableError> {
    serde_json::from_slice::<CallableRequest<T>>(body)
        .map(|req| req.data)
        .map_err(|e| {
            debug!(error = %e, "malformed callable request");
            CallableError::invalid_argument(format!("Malformed request body: {e}"))
        })
}

fn reply<T: Serialize>(result: Result<T, CallableError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(json!({ "result": value }))).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn send_email(State(functions): State<Arc<Functions>>, body: Bytes) -> Response {
    let result = match parse::<ContactMessage>(&body) {
        Ok(payload) => functions.send_email(payload).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn send_share_email(State(functions): State<Arc<Functions>>, body: Bytes) -> Response {
    let result = match parse::<ShareLinkEmail>(&body) {
        Ok(payload) => functions.send_share_email(payload).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(functions: Arc<Functions>) -> Router {
    Router::new()
        .route("/sendEmail", post(send_email))
        .route("/sendShareEmail", post(send_share_email))
        .route("/health", get(health))
        .with_state(functions)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
