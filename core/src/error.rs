//! Failure taxonomy for pipeline runs.
//!
//! # Design
//! A `Failure` is stored on the `Context` and carried unchanged through every
//! later arrow, so it is `Clone` and compares by value. Errors coming from
//! collaborators (serde, ureq, url) are flattened to their message at the
//! point they are caught.

/// Terminal condition recorded on a `Context`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// A response value failed an equality or shape assertion.
    #[error("{diff}")]
    Mismatch { diff: String, payload: String },

    /// A value the pipeline depends on is absent.
    #[error("value of {name} is not defined")]
    Undefined { name: String },

    /// The URL could not be built, or its scheme is not http/https.
    #[error("unsupported target {url}: {reason}")]
    UnsupportedTarget { url: String, reason: String },

    /// A payload was sent before any `content-type` header was bound.
    #[error("unknown Content-Type")]
    UnknownContentType,

    /// No encode or decode strategy exists for the content type.
    #[error("unsupported Content-Type {0}")]
    UnsupportedContentType(String),

    /// A request arrow ran before the outbound request was built.
    #[error("outbound request is not defined, start the pipeline with a URL arrow")]
    NoRequest,

    /// The exchange was demanded on a context without a transport.
    #[error("transport is not configured")]
    NoTransport,

    /// The response status is not one of the expected codes.
    #[error("status code {actual} does not match expected {expected:?}")]
    Status { expected: Vec<u16>, actual: u16 },

    /// A value could not be serialized or flattened for the wire.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The response body is malformed for the selected decoder.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The transport collaborator failed. Terminal, never retried.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl Failure {
    pub(crate) fn undefined(name: impl Into<String>) -> Self {
        Failure::Undefined { name: name.into() }
    }

    pub(crate) fn mismatch(diff: impl Into<String>, payload: impl Into<String>) -> Self {
        Failure::Mismatch {
            diff: diff.into(),
            payload: payload.into(),
        }
    }
}
