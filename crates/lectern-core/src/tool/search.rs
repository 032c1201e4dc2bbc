//! Internet search tool.
//!
//! `InternetSearchTool` adapts any [`SearchCapability`] (e.g. the Bocha
//! client in lectern-infra) into a [`Tool`] the model can call with
//! `{"query": "..."}`.

use std::fmt::Write as _;
use std::future::Future;

use serde::Deserialize;
use tracing::{debug, info_span, Instrument};

use lectern_types::error::ToolError;
use lectern_types::llm::ToolDefinition;
use lectern_types::search::SearchHit;

use super::Tool;

pub const INTERNET_SEARCH_TOOL: &str = "internet_search";

const INTERNET_SEARCH_DESCRIPTION: &str = "Search the internet for real-time information using \
    Bocha Search. Use this tool when you need to find up-to-date information, news, or answers \
    to questions about current events.";

/// External web search backend: query in, ranked hits out.
pub trait SearchCapability: Send + Sync {
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<SearchHit>, ToolError>> + Send;
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

/// The `internet_search` tool.
pub struct InternetSearchTool<S> {
    capability: S,
}

impl<S: SearchCapability> InternetSearchTool<S> {
    pub fn new(capability: S) -> Self {
        Self { capability }
    }
}

impl<S: SearchCapability> Tool for InternetSearchTool<S> {
    fn name(&self) -> &str {
        INTERNET_SEARCH_TOOL
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: INTERNET_SEARCH_TOOL.to_string(),
            description: INTERNET_SEARCH_DESCRIPTION.to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        let query = parse_query(arguments)?;
        let span = info_span!("tool.internet_search", query = %query);
        let hits = self.capability.search(&query).instrument(span).await?;
        debug!(query = %query, hits = hits.len(), "search completed");
        Ok(format_hits(&hits))
    }
}

/// Accept `{"query": "..."}`. Arguments that are not JSON at all are taken
/// as the query text itself; a JSON object without a string `query` is
/// rejected.
fn parse_query(arguments: &str) -> Result<String, ToolError> {
    let query = match serde_json::from_str::<serde_json::Value>(arguments) {
        Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value::<SearchArgs>(value)
            .map_err(|e| ToolError::InvalidInput(format!("search arguments: {e}")))?
            .query,
        Ok(_) | Err(_) => arguments.to_string(),
    };
    let query = query.trim();
    if query.is_empty() {
        return Err(ToolError::InvalidInput("search query is empty".to_string()));
    }
    Ok(query.to_string())
}

/// Render hits as the numbered text block handed back to the model.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let label = if hit.summary.is_empty() { "Snippet" } else { "Summary" };
        let _ = write!(
            out,
            "{}. {}\n   URL: {}\n   {label}: {}\n\n",
            i + 1,
            hit.title,
            hit.url,
            hit.digest()
        );
    }
    out
}
