//! Research tools offered to the hosted assistant.
//!
//! Four tools: web search, encyclopedia lookup, page fetch and saving the
//! final write-up to a text file.

mod encyclopedia;
mod html;
mod page;
mod save;
mod search;

pub use encyclopedia::{NO_RESULT as NO_ENCYCLOPEDIA_RESULT, PageSummary};
pub use html::page_text;
pub use save::results_path;
pub use search::{SearchResult, format_results, parse_results};

use async_trait::async_trait;
use conf::Conf;
use research_assistant::{Tool, ToolError, ToolExecutor, ToolResult, parse_arguments};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use tracing::info;

/// Instructions given to the assistant when it is created.
pub const INSTRUCTIONS: &str = "\
You are a research expert.

Your task is to use Wikipedia or DuckDuckGo to gather comprehensive and accurate information about the query provided.

When you find a relevant website through DuckDuckGo, you must fetch the content of that website. Use the fetched content to thoroughly research and formulate a detailed answer to the question.

Combine information from Wikipedia, DuckDuckGo searches, and any relevant websites you find. Ensure that the final answer is well-organized and detailed, and include citations with links (URLs) for all sources used.

Your research should be saved to a .txt file, and the content should match the detailed findings provided. Make sure to include all sources and relevant information.

The information from Wikipedia must be included.

Ensure that the final .txt file contains detailed information, all relevant sources, and citations.
";

/// Configuration for the research tools.
#[derive(Clone, Conf, Debug)]
#[conf(serde)]
pub struct ResearchToolsConfig {
    /// Directory research results are saved to.
    #[conf(long, env, default_value = ".")]
    pub output_dir: PathBuf,
    /// DuckDuckGo HTML search endpoint.
    #[conf(long, env, default_value = "https://html.duckduckgo.com/html/")]
    pub search_url: String,
    /// Maximum number of web search results returned.
    #[conf(long, env, default_value = "4")]
    pub max_search_results: usize,
    /// MediaWiki API endpoint.
    #[conf(long, env, default_value = "https://en.wikipedia.org/w/api.php")]
    pub wikipedia_api_url: String,
    /// Number of encyclopedia pages summarized per lookup.
    #[conf(long, env, default_value = "3")]
    pub wikipedia_results: usize,
    /// Maximum characters returned by an encyclopedia lookup.
    #[conf(long, env, default_value = "4000")]
    pub wikipedia_max_chars: usize,
    /// Maximum characters returned for a fetched page.
    #[conf(long, env, default_value = "20000")]
    pub max_page_chars: usize,
    /// User agent sent with every tool request.
    #[conf(long, env, default_value = "research-assistant/0.1")]
    pub user_agent: String,
    /// Timeout for each tool request, in seconds.
    #[conf(long, env, default_value = "30")]
    pub http_timeout_secs: u64,
}

/// The tools this crate provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    SearchWeb,
    SearchEncyclopedia,
    FetchPage,
    SaveText,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        Self::SearchWeb,
        Self::SearchEncyclopedia,
        Self::FetchPage,
        Self::SaveText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SearchWeb => "search_web",
            Self::SearchEncyclopedia => "search_encyclopedia",
            Self::FetchPage => "fetch_page",
            Self::SaveText => "save_text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Descriptor advertised to the assistant.
    pub fn tool(self) -> Tool {
        let query_schema = || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The query you will search for"
                    }
                },
                "required": ["query"]
            })
        };

        match self {
            Self::SearchWeb => Tool {
                name: self.name(),
                description: "Use this tool to perform web searches using the DuckDuckGo search engine. \
                    It takes a query as an argument. Example query: \"Latest technology news\"",
                parameters: query_schema(),
            },
            Self::SearchEncyclopedia => Tool {
                name: self.name(),
                description: "Use this tool to perform searches on Wikipedia. \
                    It takes a query as an argument. Example query: \"Artificial Intelligence\"",
                parameters: query_schema(),
            },
            Self::FetchPage => Tool {
                name: self.name(),
                description: "If you found the website link in DuckDuckGo, \
                    use this to get the content of the link for my research.",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "The URL of the website you want to fetch"
                        }
                    },
                    "required": ["url"]
                }),
            },
            Self::SaveText => Tool {
                name: self.name(),
                description: "Use this tool to save the content as a .txt file.",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text you will save to a file."
                        },
                        "query": {
                            "type": "string",
                            "description": "The query you will search for"
                        }
                    },
                    "required": ["text", "query"]
                }),
            },
        }
    }
}

#[derive(Deserialize)]
struct QueryInput {
    query: String,
}

#[derive(Deserialize)]
struct FetchPageInput {
    url: String,
}

#[derive(Deserialize)]
struct SaveTextInput {
    text: String,
    query: String,
}

/// Tool executor for the research tools.
pub struct ResearchTools {
    config: ResearchToolsConfig,
    client: reqwest::Client,
}

impl ResearchTools {
    pub fn new(config: ResearchToolsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ToolExecutor for ResearchTools {
    fn tools(&self) -> Vec<Tool> {
        ToolKind::ALL.into_iter().map(ToolKind::tool).collect()
    }

    fn has_tool(&self, name: &str) -> bool {
        ToolKind::from_name(name).is_some()
    }

    async fn execute(&self, name: &str, input: &serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_owned()))?;

        match kind {
            ToolKind::SearchWeb => {
                let input: QueryInput = parse_arguments(name, input)?;
                let text = search::search(
                    &self.client,
                    &self.config.search_url,
                    &input.query,
                    self.config.max_search_results,
                )
                .await?;
                Ok(ToolResult::new(text))
            }
            ToolKind::SearchEncyclopedia => {
                let input: QueryInput = parse_arguments(name, input)?;
                let text = encyclopedia::lookup(
                    &self.client,
                    &self.config.wikipedia_api_url,
                    &input.query,
                    self.config.wikipedia_results,
                    self.config.wikipedia_max_chars,
                )
                .await?;
                Ok(ToolResult::new(text))
            }
            ToolKind::FetchPage => {
                let input: FetchPageInput = parse_arguments(name, input)?;
                let text = page::fetch(&self.client, &input.url, self.config.max_page_chars).await?;
                Ok(ToolResult::new(text))
            }
            ToolKind::SaveText => {
                let input: SaveTextInput = parse_arguments(name, input)?;
                info!("Saving research results for {:?}", input.query);
                save::save(&self.config.output_dir, &input.text, &input.query).await
            }
        }
    }
}
