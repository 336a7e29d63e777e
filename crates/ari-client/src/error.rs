//! Error taxonomy for the ARI client runtime.
//!
//! One enum per component boundary, following the pack's convention of
//! typed errors at module edges (`#[error]` messages, `#[from]` only where
//! the source is itself a real external error type).

/// Errors from the REST transport (component B).
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("HTTP transport error calling {path}: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("ARI returned 500 for {path}: status={status} reason={reason} body={body}")]
    ServerError {
        path: String,
        status: u16,
        reason: String,
        body: String,
    },
    #[error("failed to decode JSON response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the WebSocket event pump (component D).
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("WebSocket connect failed: {0}")]
    Connect(String),
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("event filter negotiation failed: {0}")]
    FilterNegotiation(#[from] RestError),
}
