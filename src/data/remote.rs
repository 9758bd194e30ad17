use std::time::Duration;

use crate::error::LoadError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Open a remote table for streaming.
///
/// The returned response implements [`std::io::Read`]; callers read only as
/// many rows as they need and drop it. Any transport failure or
/// non-success status becomes [`LoadError::Fetch`].
pub fn fetch(url: &str) -> Result<reqwest::blocking::Response, LoadError> {
    let fail = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| fail(e.to_string()))?;

    log::debug!("fetching {url}");
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| fail(e.to_string()))?;
    log::debug!(
        "{url} answered {} ({} bytes announced)",
        response.status(),
        response
            .content_length()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );
    Ok(response)
}
