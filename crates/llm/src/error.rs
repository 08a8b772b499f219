/// Errors from the generative API layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request itself failed (network, DNS, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service throttled the request (HTTP 429).
    #[error("Rate limited: {body}")]
    RateLimited { body: String },

    /// The service returned a non-2xx status code.
    #[error("Generative API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A 2xx response that carried no usable content.
    #[error("Empty response: {0}")]
    EmptyResponse(&'static str),
}
