//! Context propagation across the HTTP hop.
//!
//! # Responsibilities
//! - Encode a `SpanContext` into outbound request headers
//! - Decode a `SpanContext` from inbound request headers
//! - Carry key/value baggage alongside the trace context
//!
//! Encoding follows W3C Trace Context (`traceparent`) plus a `baggage`
//! header of comma-separated `key=value` pairs. Both directions are pure
//! header-to-context mappings with no side effects. Malformed or absent
//! metadata decodes to `None`; the caller degrades to a fresh root
//! context and never fails the request.

use axum::http::{HeaderMap, HeaderValue};

use crate::observability::tracing::SpanContext;

pub const TRACEPARENT: &str = "traceparent";
pub const BAGGAGE: &str = "baggage";

const SUPPORTED_VERSION: &str = "00";
const FLAG_SAMPLED: u8 = 0x01;

/// Encode the context into `traceparent` on the given headers.
pub fn inject(context: &SpanContext, headers: &mut HeaderMap) {
    let flags = if context.sampled { FLAG_SAMPLED } else { 0 };
    let value = format!(
        "{SUPPORTED_VERSION}-{:032x}-{:016x}-{:02x}",
        context.trace_id, context.span_id, flags
    );
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(TRACEPARENT, value);
    }
}

/// Encode baggage items into the `baggage` header. Items whose key or
/// value contain the delimiter characters are skipped.
pub fn inject_baggage(items: &[(String, String)], headers: &mut HeaderMap) {
    if items.is_empty() {
        return;
    }
    let encoded = items
        .iter()
        .filter(|(k, v)| !k.contains([',', '=']) && !v.contains([',', '=']))
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");
    if encoded.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&encoded) {
        headers.insert(BAGGAGE, value);
    }
}

/// Decode a context from the `traceparent` header, if present and well
/// formed.
pub fn extract(headers: &HeaderMap) -> Option<SpanContext> {
    let raw = headers.get(TRACEPARENT)?.to_str().ok()?;
    parse_traceparent(raw)
}

/// Decode baggage items from the `baggage` header. Malformed pairs are
/// dropped, never reported.
pub fn extract_baggage(headers: &HeaderMap) -> Vec<(String, String)> {
    let Some(raw) = headers.get(BAGGAGE).and_then(|v| v.to_str().ok()) else {
        return Vec::new();
    };
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn parse_traceparent(raw: &str) -> Option<SpanContext> {
    let mut parts = raw.trim().split('-');
    let version = parts.next()?;
    let trace_field = parts.next()?;
    let span_field = parts.next()?;
    let flags_field = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    // Future versions may add fields; only the frozen 00 layout is decoded.
    if version != SUPPORTED_VERSION {
        return None;
    }
    if trace_field.len() != 32 || span_field.len() != 16 || flags_field.len() != 2 {
        return None;
    }
    let trace_id = u128::from_str_radix(trace_field, 16).ok()?;
    let span_id = u64::from_str_radix(span_field, 16).ok()?;
    if trace_id == 0 || span_id == 0 {
        return None;
    }
    let flags = u8::from_str_radix(flags_field, 16).ok()?;
    Some(SpanContext {
        trace_id,
        span_id,
        sampled: flags & FLAG_SAMPLED != 0,
    })
}
