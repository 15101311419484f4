//! Causal spans for distributed tracing.
//!
//! # Responsibilities
//! - Identify a position in the causal chain of calls (`SpanContext`)
//! - Record attributes, events, and status on in-flight operations
//! - Emit finished spans as structured JSON records
//!
//! Span records are emitted through the `tracing` subscriber under the
//! `fib_service::spans` target; a collector wired to the subscriber sees
//! one JSON object per finished span.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::Serialize;

/// Identifying fields of a position in the causal chain.
///
/// Every sub-call context is a child of the context it was created under:
/// children share the `trace_id` and get a fresh `span_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub sampled: bool,
}

impl SpanContext {
    /// Start a fresh causal chain.
    pub fn new_root() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: nonzero_u128(&mut rng),
            span_id: nonzero_u64(&mut rng),
            sampled: true,
        }
    }

    /// Derive a child position in the same chain.
    pub fn child(&self) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: self.trace_id,
            span_id: nonzero_u64(&mut rng),
            sampled: self.sampled,
        }
    }
}

fn nonzero_u64(rng: &mut impl Rng) -> u64 {
    loop {
        let v: u64 = rng.gen();
        if v != 0 {
            return v;
        }
    }
}

fn nonzero_u128(rng: &mut impl Rng) -> u128 {
    loop {
        let v: u128 = rng.gen();
        if v != 0 {
            return v;
        }
    }
}

/// Outcome classification of a finished span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Unset => "unset",
            SpanStatus::Ok => "ok",
            SpanStatus::Error => "error",
        }
    }
}

/// Attribute value attached to a span or event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    I64(i64),
    F64(f64),
    Str(String),
    Bool(bool),
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::I64(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::I64(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::F64(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

#[derive(Debug, Clone, Serialize)]
struct KeyValue {
    key: &'static str,
    value: AttributeValue,
}

/// Timestamped annotation within a span.
#[derive(Debug, Clone, Serialize)]
struct SpanEvent {
    name: &'static str,
    timestamp_ms: u64,
    attributes: Vec<KeyValue>,
}

/// An in-flight operation in the causal chain.
///
/// Each task owns exactly one active span at a time; children derived from
/// this span's context are never shared for writing. Ending the span
/// (explicitly or on drop) emits its record.
#[derive(Debug)]
pub struct CausalSpan {
    name: &'static str,
    context: SpanContext,
    parent_span_id: Option<u64>,
    attributes: Vec<KeyValue>,
    events: Vec<SpanEvent>,
    status: SpanStatus,
    status_message: Option<String>,
    started_at_ms: u64,
    ended: bool,
}

/// Wire representation of a finished span.
#[derive(Debug, Serialize)]
struct SpanRecord<'a> {
    name: &'static str,
    trace_id: String,
    span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_span_id: Option<String>,
    started_at_ms: u64,
    duration_ms: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_message: Option<&'a str>,
    attributes: &'a [KeyValue],
    events: &'a [SpanEvent],
}

impl CausalSpan {
    /// Start a span. With a parent, the span joins the parent's chain;
    /// without one, it roots a new chain.
    pub fn start(name: &'static str, parent: Option<&SpanContext>) -> Self {
        let (context, parent_span_id) = match parent {
            Some(p) => (p.child(), Some(p.span_id)),
            None => (SpanContext::new_root(), None),
        };
        Self {
            name,
            context,
            parent_span_id,
            attributes: Vec::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
            status_message: None,
            started_at_ms: unix_millis(),
            ended: false,
        }
    }

    /// Identifying context of this span, for propagation and for deriving
    /// children.
    pub fn context(&self) -> SpanContext {
        self.context
    }

    pub fn set_attribute(&mut self, key: &'static str, value: impl Into<AttributeValue>) {
        self.attributes.push(KeyValue {
            key,
            value: value.into(),
        });
    }

    pub fn add_event(
        &mut self,
        name: &'static str,
        attributes: Vec<(&'static str, AttributeValue)>,
    ) {
        self.events.push(SpanEvent {
            name,
            timestamp_ms: unix_millis(),
            attributes: attributes
                .into_iter()
                .map(|(key, value)| KeyValue { key, value })
                .collect(),
        });
    }

    /// Classify the span outcome. An empty message is not recorded.
    pub fn set_status(&mut self, status: SpanStatus, message: &str) {
        self.status = status;
        self.status_message = if message.is_empty() {
            None
        } else {
            Some(message.to_string())
        };
    }

    pub fn status(&self) -> SpanStatus {
        self.status
    }

    /// Finish the span and emit its record. Idempotent.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let record = SpanRecord {
            name: self.name,
            trace_id: format!("{:032x}", self.context.trace_id),
            span_id: format!("{:016x}", self.context.span_id),
            parent_span_id: self.parent_span_id.map(|id| format!("{:016x}", id)),
            started_at_ms: self.started_at_ms,
            duration_ms: unix_millis().saturating_sub(self.started_at_ms),
            status: self.status.as_str(),
            status_message: self.status_message.as_deref(),
            attributes: &self.attributes,
            events: &self.events,
        };
        match serde_json::to_string(&record) {
            Ok(json) => {
                tracing::debug!(target: "fib_service::spans", "{json}");
            }
            Err(e) => {
                tracing::warn!(span = self.name, error = %e, "Failed to serialize span record");
            }
        }
    }
}

impl Drop for CausalSpan {
    fn drop(&mut self) {
        self.end();
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
