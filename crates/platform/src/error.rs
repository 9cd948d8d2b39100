/// Error type for calls into external platform services.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status code.
    #[error("Service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The service understood the call but refused it.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A payload could not be encoded for the wire.
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
