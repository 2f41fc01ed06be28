use std::time::Duration;

use dojo_core::errors::UpstreamError;

/// Classify a reqwest failure for `service`.
pub(crate) fn request_error(service: &'static str, timeout: Duration, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            service,
            after: timeout,
        }
    } else if err.is_decode() {
        UpstreamError::Decode {
            service,
            message: err.to_string(),
        }
    } else {
        UpstreamError::Network {
            service,
            message: err.to_string(),
        }
    }
}

/// Pass success responses through; turn anything else into
/// `UpstreamError::Status` with the body kept verbatim.
pub(crate) async fn require_success(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        service,
        status,
        body,
    })
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
