//! HTTP surface of the relay: chat completions, model catalog, health.
//!
//! `POST /api/chat/completions` resolves the provider from the model prefix,
//! dispatches one upstream call and then either re-streams the upstream event
//! stream (see [`crate::sse`]) or returns the buffered JSON body. Every failure
//! that happens before the response is committed becomes `{ "error": ... }`
//! with a matching status; later failures travel in-band.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, Method, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Instrument, Span, field};

use crate::config::{Config, SamplingDefaults};
use crate::error::{CoreResult, RelayError};
use crate::model::{CompletionRequest, ModelList};
use crate::normalizer::normalize_request;
use crate::provider_factory::ProviderRegistry;
use crate::sse;
use crate::telemetry::{
    KEY_ERROR_KIND, KEY_EVENTS, KEY_MODEL, KEY_PROVIDER, KEY_STREAM, KEY_UPSTREAM_MODEL,
    KEY_UPSTREAM_STATUS,
};

/// Shared, read-only state for all requests. Holds no per-request data.
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<Inner>,
}

struct Inner {
    registry: ProviderRegistry,
    defaults: SamplingDefaults,
}

impl RelayState {
    pub fn new(registry: ProviderRegistry, defaults: SamplingDefaults) -> Self {
        Self {
            inner: Arc::new(Inner { registry, defaults }),
        }
    }

    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        Ok(Self::new(
            ProviderRegistry::from_config(cfg)?,
            cfg.defaults.clone(),
        ))
    }

    /// Like `from_config`, with an explicit credential lookup.
    pub fn from_config_with<F>(cfg: &Config, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self::new(
            ProviderRegistry::from_config_with(cfg, lookup)?,
            cfg.defaults.clone(),
        ))
    }
}

/// Build the relay router with all endpoints
pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        .route("/health", routing::get(health))
        .route("/api/models", routing::get(list_models))
        .route("/api/chat/completions", routing::post(chat_completions))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_TYPE])
}

/// Serve the relay on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: RelayState,
    shutdown: CancellationToken,
) -> CoreResult<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "relay listening");

    axum::serve(listener, relay_router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("graceful shutdown initiated");
        })
        .await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_models(State(state): State<RelayState>) -> Json<ModelList> {
    Json(ModelList {
        models: state.inner.registry.catalog(),
    })
}

/// Handle `POST /api/chat/completions`
async fn chat_completions(
    State(state): State<RelayState>,
    body: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return RelayError::Validation(rejection.body_text()).into_response();
        }
    };

    let span = tracing::info_span!(
        "relay.chat",
        relay.model = field::Empty,
        relay.provider = field::Empty,
        relay.upstream_model = field::Empty,
        relay.stream = field::Empty,
        upstream.status = field::Empty,
        stream.events = field::Empty,
        error.kind = field::Empty,
    );
    span.record(KEY_MODEL, req.model.as_str());

    match relay(&state, req).instrument(span.clone()).await {
        Ok(response) => response,
        Err(e) => {
            span.record(KEY_ERROR_KIND, e.kind());
            e.into_response()
        }
    }
}

async fn relay(state: &RelayState, req: CompletionRequest) -> CoreResult<Response> {
    let span = Span::current();

    let (provider, upstream_model) = state.inner.registry.resolve(&req.model)?;
    let upstream_model = upstream_model.to_string();
    span.record(KEY_PROVIDER, provider.name());
    span.record(KEY_UPSTREAM_MODEL, upstream_model.as_str());

    let payload = normalize_request(req, &upstream_model, &state.inner.defaults)?;
    span.record(KEY_STREAM, payload.stream);

    let upstream = match provider.dispatch(&payload).await {
        Ok(upstream) => upstream,
        Err(e) => {
            if let RelayError::Upstream { status, .. } = &e {
                span.record(KEY_UPSTREAM_STATUS, *status);
                tracing::warn!(status = *status, "upstream rejected request");
            } else {
                tracing::error!(error = %e, "upstream dispatch failed");
            }
            return Err(e);
        }
    };
    span.record(KEY_UPSTREAM_STATUS, upstream.status().as_u16());

    if payload.stream {
        Ok(stream_response(upstream, span))
    } else {
        buffered_response(upstream).await
    }
}

/// Re-stream the upstream body as the relay's own event stream.
fn stream_response(upstream: reqwest::Response, span: Span) -> Response {
    let mut count: u64 = 0;
    let events = sse::normalize(upstream.bytes_stream()).map(move |ev| {
        count += 1;
        if ev.is_done() {
            span.record(KEY_EVENTS, count);
            tracing::info!(parent: &span, events = count, "stream relayed");
        }
        Ok::<_, Infallible>(Event::default().data(ev.payload))
    });

    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

async fn buffered_response(upstream: reqwest::Response) -> CoreResult<Response> {
    let body = upstream
        .bytes()
        .await
        .map_err(|e| RelayError::Decode(format!("failed to read upstream body: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            RelayError::Upstream { body, .. } => upstream_error_body(body),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Upstream bodies that already look like `{ "error": ... }` pass through
/// untouched; anything else becomes the `error` string.
fn upstream_error_body(body: String) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) if value.get("error").is_some() => value,
        _ => json!({ "error": body }),
    }
}
