//! Web search through the DuckDuckGo HTML endpoint.

use crate::html::inline_text;
use regex::Regex;
use research_assistant::ToolError;
use std::{fmt, sync::LazyLock};
use tracing::{info, warn};
use url::Url;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\s([^>]*)>(.*?)</a\s*>").expect("anchor regex is valid")
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*"([^"]*)""#).expect("class regex is valid")
});
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*"([^"]*)""#).expect("href regex is valid")
});

/// One search hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[snippet: {}, title: {}, link: {}]",
            self.snippet, self.title, self.link
        )
    }
}

/// Run a search and format up to `max_results` hits.
pub async fn search(
    client: &reqwest::Client,
    endpoint: &str,
    query: &str,
    max_results: usize,
) -> Result<String, ToolError> {
    info!("Web search: {}", query);
    let response = client
        .get(endpoint)
        .query(&[("q", query)])
        .send()
        .await
        .map_err(|e| ToolError::Search(format!("DuckDuckGo request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        warn!("DuckDuckGo returned {} for {:?}", status, query);
        return Err(ToolError::Search(format!("DuckDuckGo returned {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ToolError::Search(format!("failed to read DuckDuckGo response: {e}")))?;

    let results = parse_results(&body, max_results);
    info!("Web search for {:?} returned {} results", query, results.len());
    Ok(format_results(query, &results))
}

/// Results joined the way the assistant expects them, or an explicit no-result line.
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.");
    }
    results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extract results from a DuckDuckGo HTML result page.
///
/// Each result is a `result__a` link followed by a `result__snippet` element.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = Vec::new();

    for caps in ANCHOR_RE.captures_iter(html) {
        let attrs = &caps[1];
        let Some(class) = CLASS_RE.captures(attrs) else {
            continue;
        };
        let classes: Vec<&str> = class[1].split_whitespace().collect();

        if classes.contains(&"result__a") {
            if results.len() == max_results {
                break;
            }
            let href = HREF_RE
                .captures(attrs)
                .map(|href| href[1].to_owned())
                .unwrap_or_default();
            results.push(SearchResult {
                title: inline_text(&caps[2]),
                link: resolve_link(&href),
                snippet: String::new(),
            });
        } else if classes.contains(&"result__snippet")
            && let Some(last) = results.last_mut()
            && last.snippet.is_empty()
        {
            last.snippet = inline_text(&caps[2]);
        }
    }

    results
}

/// DuckDuckGo wraps result links in a redirect (`//duckduckgo.com/l/?uddg=<target>`).
/// Return the target when present, otherwise the link itself.
fn resolve_link(href: &str) -> String {
    let href = crate::html::decode_entities(href);
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.clone()
    };

    let Ok(url) = Url::parse(&absolute) else {
        return href;
    };
    if url.path().starts_with("/l/")
        && let Some((_, target)) = url.query_pairs().find(|(key, _)| key == "uddg")
    {
        return target.into_owned();
    }
    absolute
}
