//! Fetch a page and flatten it to text.

use crate::html::{page_text, truncate_chars};
use research_assistant::ToolError;
use tracing::info;
use url::Url;

/// Only http and https pages can be fetched.
pub fn parse_page_url(url: &str) -> Result<Url, ToolError> {
    let parsed =
        Url::parse(url.trim()).map_err(|e| ToolError::InvalidInput(format!("bad URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ToolError::InvalidInput(format!(
            "unsupported URL scheme {scheme:?}"
        ))),
    }
}

pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    max_chars: usize,
) -> Result<String, ToolError> {
    let url = parse_page_url(url)?;
    info!("Fetching page {}", url);

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ToolError::Transport(format!("failed to fetch {url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::Transport(format!("{url} returned {status}")));
    }
    let html = response
        .text()
        .await
        .map_err(|e| ToolError::Transport(format!("failed to read {url}: {e}")))?;

    let text = page_text(&html);
    info!("Fetched {} chars of text from {}", text.chars().count(), url);
    Ok(truncate_chars(&text, max_chars).to_owned())
}
