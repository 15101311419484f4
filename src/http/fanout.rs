//! Recursive fan-out handler.
//!
//! # Responsibilities
//! - Parse the `i` query parameter (present exactly once, non-negative)
//! - Decompose `fib(i)` into two concurrent sub-calls against this same
//!   service and aggregate the results
//! - Propagate the causal context across the outbound hop
//! - Map partial failure to a single 503 with one diagnostic line per
//!   failed sub-call
//!
//! Sub-calls are joined, never cancelled: a failing sub-call does not stop
//! its sibling, and the shared total keeps accumulating even when it will
//! not be returned.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, RawQuery, State},
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::observability::propagation;
use crate::observability::{AttributeValue, CausalSpan, SpanContext, SpanStatus};

/// Upper bound on a sub-call response body. Real bodies are a short
/// decimal integer or a few diagnostic lines.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Failures local to the fan-out handler.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// Query parameter `i` missing, duplicated, or non-numeric. The raw
    /// unparsed value is echoed back to the caller.
    #[error("Couldn't parse index '{raw}'.")]
    MalformedInput { raw: String },

    /// The sub-request could not be constructed.
    #[error("invalid sub-request: {0}")]
    Request(#[from] axum::http::Error),

    /// The outbound call failed to complete.
    #[error("sub-call transport failure: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    /// The response body could not be read.
    #[error("sub-call body read failure: {0}")]
    BodyRead(#[from] axum::Error),

    /// The response body was not a decimal integer.
    #[error("sub-call returned a non-numeric body: {body:?}")]
    Parse { body: String },
}

/// Shared mutable result of one request's fan-out.
///
/// All mutation happens under the lock, one accumulate at a time; the lock
/// is never held across network I/O. `failed` latches: once set it never
/// reverts within the request.
#[derive(Debug, Default)]
struct Aggregate {
    total: u64,
    failed: bool,
    failures: Vec<String>,
}

impl Aggregate {
    fn add(&mut self, value: u64) {
        self.total = self.total.saturating_add(value);
    }

    fn record_failure(&mut self, index: u64) {
        self.failed = true;
        self.failures.push(format!("Failed to call child index '{index}'."));
    }
}

/// Handler behind both `/fib` and `/fibinternal`.
pub async fn fib_handler(
    State(state): State<AppState>,
    matched: MatchedPath,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let route = matched.as_str().to_string();

    let parent = propagation::extract(&headers);
    let baggage = propagation::extract_baggage(&headers);
    let mut span = CausalSpan::start("fibonacci", parent.as_ref());
    span.set_attribute("http.route", route.as_str());
    span.set_attribute("public_endpoint", route == "/fib");

    let index = match parse_index(query.as_deref()) {
        Ok(index) => index,
        Err(error) => {
            tracing::warn!(
                request_id = %request_id(&headers),
                route = %route,
                query = query.as_deref().unwrap_or(""),
                "Malformed index"
            );
            span.set_status(SpanStatus::Error, "malformed input");
            span.end();
            metrics::record_request(&route, StatusCode::SERVICE_UNAVAILABLE.as_u16(), start);
            return (StatusCode::SERVICE_UNAVAILABLE, error.to_string()).into_response();
        }
    };
    span.set_attribute("parameter", index);

    if index < 2 {
        span.set_attribute("result", 1u64);
        span.end();
        metrics::record_request(&route, StatusCode::OK.as_u16(), start);
        return (StatusCode::OK, "1".to_string()).into_response();
    }

    let aggregate = Arc::new(Mutex::new(Aggregate::default()));
    let baggage = Arc::new(baggage);
    let parent_context = span.context();

    let mut subcalls = Vec::with_capacity(2);
    for offset in 1..=2u64 {
        let child_index = index - offset;
        subcalls.push(tokio::spawn(dispatch_subcall(
            state.clone(),
            parent_context,
            Arc::clone(&baggage),
            child_index,
            Arc::clone(&aggregate),
        )));
    }

    for (position, joined) in join_all(subcalls).await.into_iter().enumerate() {
        if joined.is_err() {
            // a sub-call task died before recording its own outcome
            let child_index = index - (position as u64 + 1);
            aggregate.lock().await.record_failure(child_index);
        }
    }

    let result = aggregate.lock().await;
    span.set_attribute("result", result.total);
    if result.failed {
        span.set_status(SpanStatus::Error, "sub-call failure");
        span.end();
        metrics::record_request(&route, StatusCode::SERVICE_UNAVAILABLE.as_u16(), start);
        let body: String = result
            .failures
            .iter()
            .map(|line| format!("{line}\n"))
            .collect();
        return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
    }

    let total = result.total;
    drop(result);
    span.end();
    metrics::record_request(&route, StatusCode::OK.as_u16(), start);
    (StatusCode::OK, total.to_string()).into_response()
}

/// Parse the `i` query parameter. Exactly one value must be supplied and
/// it must be a non-negative integer.
fn parse_index(query: Option<&str>) -> Result<u64, FanoutError> {
    let raw = query.unwrap_or("");
    let values: Vec<String> = url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "i")
        .map(|(_, value)| value.into_owned())
        .collect();

    if values.len() != 1 {
        return Err(FanoutError::MalformedInput {
            raw: values.join(","),
        });
    }
    values[0].parse::<u64>().map_err(|_| FanoutError::MalformedInput {
        raw: values[0].clone(),
    })
}

/// One sub-operation: derive a child span, call the recursive endpoint,
/// and fold the outcome into the shared aggregate.
async fn dispatch_subcall(
    state: AppState,
    parent: SpanContext,
    baggage: Arc<Vec<(String, String)>>,
    index: u64,
    aggregate: Arc<Mutex<Aggregate>>,
) {
    let mut span = CausalSpan::start("fibClient", Some(&parent));
    let url = format!("{}/fibinternal?i={}", state.upstream_base, index);
    span.set_attribute("url", url.as_str());
    span.add_event("Fib loop count", vec![("fib-loop", AttributeValue::from(index))]);

    match call_upstream(&state, &mut span, &baggage, &url).await {
        Ok(value) => {
            span.set_attribute("result", value);
            aggregate.lock().await.add(value);
        }
        Err(error) => {
            tracing::warn!(index, error = %error, "Sub-call failed");
            if span.status() != SpanStatus::Error {
                span.set_status(SpanStatus::Error, &error.to_string());
            }
            aggregate.lock().await.record_failure(index);
        }
    }
    span.end();
}

async fn call_upstream(
    state: &AppState,
    span: &mut CausalSpan,
    baggage: &[(String, String)],
    url: &str,
) -> Result<u64, FanoutError> {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri(url)
        .body(Body::empty())?;
    propagation::inject(&span.context(), request.headers_mut());
    propagation::inject_baggage(baggage, request.headers_mut());

    let response = state.client.request(request).await?;
    let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES).await?;
    let text = String::from_utf8_lossy(&bytes);
    text.trim().parse::<u64>().map_err(|_| {
        span.set_status(SpanStatus::Error, "failure parsing");
        FanoutError::Parse {
            body: text.into_owned(),
        }
    })
}
