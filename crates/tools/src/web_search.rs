//! Web search tool backed by the LinkUp `sourcedAnswer` API.

use async_trait::async_trait;
use codeclaw_core::error::ToolError;
use codeclaw_core::tool::{Tool, ToolContext, ToolResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const LINKUP_SEARCH_URL: &str = "https://api.linkup.so/v1/search";

const MISSING_KEY_MESSAGE: &str = "LinkUp API key not found. Please set LINKUP_API_KEY environment variable or add it to your config.

To get a free LinkUp API key:
1. Visit https://linkup.so
2. Sign up for a free account
3. Get your API key from the dashboard
4. Set LINKUP_API_KEY=your_api_key in your environment";

pub struct WebSearchTool {
    api_key: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(api_key, LINKUP_SEARCH_URL)
    }

    pub fn with_endpoint(api_key: Option<String>, endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourcedAnswer {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    sources: Vec<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

fn format_answer(answer: &SourcedAnswer, max_results: usize) -> String {
    let mut output = answer.answer.clone();
    if !answer.sources.is_empty() {
        output.push_str("\n\n**Sources:**\n");
        for (index, source) in answer.sources.iter().take(max_results).enumerate() {
            output.push_str(&format!("\n{}. **{}**\n   {}\n", index + 1, source.name, source.url));
            if !source.snippet.is_empty() {
                output.push_str(&format!("   _{}_\n", source.snippet));
            }
        }
    }
    output
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information, documentation, or answers to questions"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "number",
                    "description": "Maximum number of sources to include (default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let max_results = arguments["max_results"].as_u64().unwrap_or(5) as usize;

        let Some(api_key) = &self.api_key else {
            return Ok(ToolResult::err(MISSING_KEY_MESSAGE));
        };

        debug!(query, "Searching the web");

        let body = serde_json::json!({
            "q": query,
            "depth": "standard",
            "outputType": "sourcedAnswer",
            "includeImages": false,
        });

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(ToolResult::err(format!("Web search failed: {e}"))),
        };

        match response.status().as_u16() {
            401 => {
                return Ok(ToolResult::err(
                    "Invalid LinkUp API key. Please check your LINKUP_API_KEY.",
                ));
            }
            402 => {
                return Ok(ToolResult::err(
                    "LinkUp API credits exhausted. Please add more credits to your account.",
                ));
            }
            status if !(200..300).contains(&status) => {
                warn!(status, "LinkUp returned error");
                return Ok(ToolResult::err(format!(
                    "Web search failed: status {status}"
                )));
            }
            _ => {}
        }

        match response.json::<SourcedAnswer>().await {
            Ok(answer) => Ok(ToolResult::ok(format_answer(&answer, max_results))),
            Err(e) => Ok(ToolResult::err(format!("Web search failed: {e}"))),
        }
    }
}
