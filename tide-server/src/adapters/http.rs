//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use super::error::AdapterError;

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = "TideCalendarSite/1.0 (https://tidecalendar.xyz; contact@tidecalendar.xyz)";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build a client with the crate's user agent and the given timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Send a request and return the body of a successful response.
///
/// Non-success statuses become [`AdapterError::Status`] with a truncated
/// copy of the body.
pub async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, AdapterError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Status {
            status: status.as_u16(),
            message: body.chars().take(500).collect(),
        });
    }

    Ok(response.text().await?)
}
