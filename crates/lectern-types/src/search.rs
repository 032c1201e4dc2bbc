//! Web search result types.

use serde::{Deserialize, Serialize};

/// One ranked result returned by a search capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// Provider-generated summary; may be empty.
    #[serde(default)]
    pub summary: String,
    /// Short excerpt from the page; used when there is no summary.
    #[serde(default)]
    pub snippet: String,
}

impl SearchHit {
    /// Summary if present, otherwise the snippet.
    pub fn digest(&self) -> &str {
        if self.summary.is_empty() {
            &self.snippet
        } else {
            &self.summary
        }
    }
}
