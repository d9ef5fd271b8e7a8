//! The error taxonomy returned to the caller of the operation that misused
//! the API. Protocol-level anomalies are *not* surfaced this way — those
//! become `Event::Warning` for recoverable anomalies (Q-method violations,
//! buffer overflow, malformed subnegotiation payloads) or `Event::Error` for
//! the one genuinely fatal-class case, a failed inflate/deflate call (see
//! `events.rs` and `compress.rs`), so that decoding never aborts the stream
//! either way.

use thiserror::Error;

/// API-level and resource-exhaustion failures.
///
/// There is no variant for success: that's simply `Ok(())`/`Ok(value)`.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum CodecError {
    /// API misuse, e.g. enabling compression twice in the same direction.
    #[error("invalid operation for current codec state")]
    BadValue,
    /// Allocation failed growing the subnegotiation buffer or negotiation queue.
    #[error("allocation failed")]
    NoMemory,
    /// The subnegotiation buffer reached its hard cap (16384 bytes).
    #[error("subnegotiation buffer overflow")]
    Overflow,
    /// A malformed byte sequence was observed (bad IAC escaping, Q-method
    /// violation, malformed subnegotiation payload).
    #[error("telnet protocol violation")]
    Protocol,
    /// Inflate/deflate failed, including unexpected stream end.
    #[error("compression stream error")]
    Compress,
}
