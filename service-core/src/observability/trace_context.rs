//! W3C Trace Context propagation for outbound HTTP calls.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt as _;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Builds `traceparent`/`tracestate` headers for the current span.
///
/// Empty when no OpenTelemetry context is active, e.g. when OTLP export is
/// disabled.
pub fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();

    if !span_context.is_valid() {
        return headers;
    }

    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    if let Ok(value) = HeaderValue::from_str(&traceparent) {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let tracestate = span_context.trace_state().header();
    if !tracestate.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&tracestate) {
            headers.insert(TRACESTATE_HEADER, value);
        }
    }

    headers
}

/// Attaches the current trace context to an outgoing request.
pub trait TraceContextExt {
    fn with_trace_context(self) -> Self;
}

impl TraceContextExt for reqwest::RequestBuilder {
    fn with_trace_context(self) -> Self {
        self.headers(trace_headers())
    }
}
