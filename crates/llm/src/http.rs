use crate::error::LlmError;

/// Return the response unchanged on a success status, or map it to
/// [`LlmError::RateLimited`] / [`LlmError::Api`] with the body text.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited { body });
    }
    Err(LlmError::Api {
        status: status.as_u16(),
        body,
    })
}
