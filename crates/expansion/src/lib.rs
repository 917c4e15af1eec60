use anyhow::{Context, Result, anyhow};
use common::QueryExpander;
use serde::Serialize;

/// System prompt asking the model for standalone follow-up queries. Specifics
/// (names, events, venues) must be repeated in each variant so the variants
/// can be embedded independently of the original question.
const RELATED_QUERIES_PROMPT: &str = "You are a helpful assistant that generates 4 to 6 search \
queries from a single input query, drawing on the user's original question and your own \
knowledge. Identify worthwhile follow-up topics and phrase each as a standalone question of at \
most 20 words. Always repeat specifics such as names, events, and locations in full so every \
query stands alone. Respond with a JSON array of query strings and nothing else. The queries \
must be in the same language as the original question.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

/// Query Expander backed by an OpenAI-compatible chat-completions endpoint.
///
/// Failures here are the orchestrator's to absorb: a retrieval call never
/// fails because expansion failed.
pub struct ChatQueryExpander {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatQueryExpander {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: std::env::var("SCHOLARSEEK_API_KEY").ok(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn request_variants(&self, query: &str) -> Result<Vec<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: RELATED_QUERIES_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            max_tokens: 512,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = self.api_key.as_ref() {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .context("query expansion request failed")?
            .error_for_status()
            .context("query expansion endpoint returned an error status")?;
        let payload = response
            .json::<serde_json::Value>()
            .await
            .context("query expansion response was not JSON")?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow!("query expansion response carried no message content"))?;
        parse_variants(content)
    }
}

impl QueryExpander for ChatQueryExpander {
    async fn expand(&self, query: &str) -> Result<Vec<String>> {
        let variants = self.request_variants(query).await?;
        tracing::debug!(count = variants.len(), "query expansion produced variants");
        Ok(variants)
    }
}

/// Extracts query strings from the model's reply. Accepts a bare JSON array,
/// the `{"queries": [...]}` tool-call shape, or one-query-per-line text.
pub fn parse_variants(content: &str) -> Result<Vec<String>> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let array = match &value {
            serde_json::Value::Array(items) => Some(items),
            serde_json::Value::Object(map) => map.get("queries").and_then(|v| v.as_array()),
            _ => None,
        };
        if let Some(items) = array {
            let variants = items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            return Ok(variants);
        }
        return Err(anyhow!("query expansion reply was JSON but not a query list"));
    }

    let lines = trimmed
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' || c == '-')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return Err(anyhow!("query expansion reply contained no queries"));
    }
    Ok(lines)
}

/// Deterministic expander for offline runs and tests: always returns the
/// same fixed variants.
#[derive(Debug, Clone, Default)]
pub struct FixedQueryExpander {
    pub variants: Vec<String>,
}

impl FixedQueryExpander {
    pub fn new(variants: Vec<String>) -> Self {
        Self { variants }
    }
}

impl QueryExpander for FixedQueryExpander {
    async fn expand(&self, _query: &str) -> Result<Vec<String>> {
        Ok(self.variants.clone())
    }
}
