//! Bocha web search client.
//!
//! `POST {base_url}/web-search` with a bearer key. The API reports
//! application errors in the body (`code`/`msg`) as well as through the
//! HTTP status, so both are checked.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use lectern_core::tool::search::SearchCapability;
use lectern_types::config::SearchConfig;
use lectern_types::error::ToolError;
use lectern_types::search::SearchHit;

pub struct BochaSearchClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    count: u32,
}

#[derive(Serialize)]
struct WebSearchRequest<'a> {
    query: &'a str,
    freshness: &'static str,
    summary: bool,
    count: u32,
}

#[derive(Deserialize)]
struct WebSearchResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<WebSearchData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebSearchData {
    #[serde(default)]
    web_pages: Option<WebPages>,
}

#[derive(Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Deserialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<WebPage> for SearchHit {
    fn from(page: WebPage) -> Self {
        Self {
            title: page.name,
            url: page.url,
            summary: page.summary.unwrap_or_default(),
            snippet: page.snippet.unwrap_or_default(),
        }
    }
}

impl BochaSearchClient {
    pub fn new(config: &SearchConfig, api_key: SecretString) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ToolError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            count: config.count,
        })
    }
}

impl SearchCapability for BochaSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let body = WebSearchRequest {
            query,
            freshness: "noLimit",
            summary: true,
            count: self.count,
        };
        let response = self
            .client
            .post(format!("{}/web-search", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Api {
                code: i64::from(status.as_u16()),
                message: text,
            });
        }

        let parsed: WebSearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Decode(e.to_string()))?;

        if parsed.code != 200 && parsed.code != 0 {
            return Err(ToolError::Api {
                code: parsed.code,
                message: parsed.msg.unwrap_or_default(),
            });
        }

        let hits: Vec<SearchHit> = parsed
            .data
            .and_then(|d| d.web_pages)
            .map(|p| p.value)
            .unwrap_or_default()
            .into_iter()
            .map(SearchHit::from)
            .collect();
        debug!(hits = hits.len(), "bocha search returned");
        Ok(hits)
    }
}
