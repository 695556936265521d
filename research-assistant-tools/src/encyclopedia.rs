//! Encyclopedia lookup through the MediaWiki API.

use crate::html::truncate_chars;
use research_assistant::ToolError;
use serde::Deserialize;
use tracing::{info, warn};

pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<PageExtract>,
}

#[derive(Debug, Deserialize)]
struct PageExtract {
    title: String,
    extract: Option<String>,
}

/// A page title with its introduction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub summary: String,
}

/// Look up `query`, summarizing the top `max_pages` hits in at most `max_chars` characters.
pub async fn lookup(
    client: &reqwest::Client,
    api_url: &str,
    query: &str,
    max_pages: usize,
    max_chars: usize,
) -> Result<String, ToolError> {
    info!("Encyclopedia lookup: {}", query);
    let limit = max_pages.to_string();
    let search: SearchResponse = get_json(
        client,
        api_url,
        &[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
            ("format", "json"),
            ("formatversion", "2"),
        ],
    )
    .await?;
    let titles: Vec<String> = search
        .query
        .map(|q| q.search.into_iter().map(|hit| hit.title).take(max_pages).collect())
        .unwrap_or_default();

    let mut pages = Vec::with_capacity(titles.len());
    for title in &titles {
        let extract: ExtractResponse = get_json(
            client,
            api_url,
            &[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ],
        )
        .await?;
        match extract_summary(extract) {
            Some(page) => pages.push(page),
            None => warn!("No extract for encyclopedia page {:?}", title),
        }
    }

    info!("Encyclopedia lookup for {:?} found {} pages", query, pages.len());
    Ok(format_pages(&pages, max_chars))
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    api_url: &str,
    query: &[(&str, &str)],
) -> Result<T, ToolError> {
    let response = client
        .get(api_url)
        .query(query)
        .send()
        .await
        .map_err(|e| ToolError::Transport(format!("Wikipedia request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::Transport(format!("Wikipedia returned {status}")));
    }
    response
        .json()
        .await
        .map_err(|e| ToolError::Transport(format!("invalid Wikipedia response: {e}")))
}

fn extract_summary(response: ExtractResponse) -> Option<PageSummary> {
    let page = response.query?.pages.into_iter().next()?;
    Some(PageSummary {
        title: page.title,
        summary: page.extract?.trim().to_owned(),
    })
}

/// Render pages as `Page:`/`Summary:` blocks separated by blank lines.
pub fn format_pages(pages: &[PageSummary], max_chars: usize) -> String {
    if pages.is_empty() {
        return NO_RESULT.to_owned();
    }
    let text = pages
        .iter()
        .map(|page| format!("Page: {}\nSummary: {}", page.title, page.summary))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&text, max_chars).to_owned()
}
