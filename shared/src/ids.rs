//! Span and trace identifier generation.
//!
//! Identifiers are derived from a random 128-bit value, hex-rendered and
//! hyphen-free. There is no counter or other global state, so generation is
//! thread-safe by construction and identifiers are statistically unique
//! across the process lifetime.

/// Length of a span identifier in characters.
pub const SPAN_ID_LENGTH: usize = 16;

/// Length of a trace identifier in characters.
pub const TRACE_ID_LENGTH: usize = 32;

/// Generates a new 32-character trace identifier.
#[must_use]
pub fn new_trace_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Generates a new 16-character span identifier.
///
/// Uses the same 128-bit random source as [`new_trace_id`], truncated to
/// span-id length.
#[must_use]
pub fn new_span_id() -> String {
    let mut id = new_trace_id();
    id.truncate(SPAN_ID_LENGTH);
    id
}
