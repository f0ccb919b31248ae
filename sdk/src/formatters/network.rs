//! Network call formatter.
//!
//! Converts a completed HTTP call into a CLIENT-kind span carrying the
//! standard HTTP attributes. The span is routed to the trace manager and
//! attributed to whichever trace is active when it arrives.

use chrono::DateTime;
use shared::models::{MeasurementRecord, MeasurementValue, Span, SpanKind};
use url::Url;

use super::{FormattedOutput, Formatter};

/// Span attribute carrying the HTTP method.
pub const HTTP_METHOD_ATTRIBUTE: &str = "http.method";
/// Span attribute carrying the full request URL.
pub const HTTP_URL_ATTRIBUTE: &str = "http.url";
/// Span attribute carrying the response status code.
pub const HTTP_STATUS_CODE_ATTRIBUTE: &str = "http.status_code";

/// Builds the span name for a request URL.
///
/// The name is scheme + host + the non-empty path segments; query strings
/// and fragments are dropped. A URL that does not parse is used verbatim.
#[must_use]
pub fn format_span_name(raw_url: &str) -> String {
    let Ok(url) = Url::parse(raw_url) else {
        return raw_url.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw_url.to_string();
    };

    let mut name = format!("{}://{host}", url.scheme());
    if let Some(segments) = url.path_segments() {
        for segment in segments.filter(|s| !s.is_empty()) {
            name.push('/');
            name.push_str(segment);
        }
    }
    name
}

/// Formats a completed network call into a CLIENT span.
pub struct NetworkCallFormatter;

impl Formatter for NetworkCallFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let MeasurementValue::Network(call) = &record.value else {
            return Vec::new();
        };

        let (Some(start_time), Some(end_time)) = (
            DateTime::from_timestamp_millis(call.start_time_ms),
            DateTime::from_timestamp_millis(call.end_time_ms),
        ) else {
            return Vec::new();
        };

        let mut span = Span::new("", &call.span_id, format_span_name(&call.url))
            .with_kind(SpanKind::Client)
            .with_start_time(start_time)
            .with_end_time(end_time)
            .with_attribute(HTTP_METHOD_ATTRIBUTE, &call.method)
            .with_attribute(HTTP_URL_ATTRIBUTE, &call.url)
            .with_attribute(HTTP_STATUS_CODE_ATTRIBUTE, call.status_code.to_string());

        if let Some(parent) = &call.parent_span_id {
            span = span.with_parent(parent);
        }

        vec![FormattedOutput::Span(span)]
    }
}
