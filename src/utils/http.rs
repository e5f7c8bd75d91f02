// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{QueryError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL and return the body text.
///
/// Non-success statuses are errors; a timeout anywhere in the exchange maps
/// to [`QueryError::Timeout`].
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> std::result::Result<String, QueryError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(QueryError::Http(format!("{url} returned {status}")));
    }
    log::debug!("{url} returned {status}");
    Ok(response.text().await?)
}
