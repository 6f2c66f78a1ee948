//! Language model providers
//!
//! [`LanguageModel`] covers free-form generation and list reranking.
//! [`OpenRouterModel`] talks to an OpenAI-compatible `/chat/completions`
//! endpoint (OpenRouter by default).

use crate::config::LlmConfig;
use crate::{Result, SeekError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Duration;

/// Marker the model is asked to prefix its ranking with
const RERANK_MARKER: &str = "RERANKED:";

/// Capability to generate text and reorder candidate texts
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Returns `texts` reordered by relevance to `query`
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<String>> {
        let order = self.rerank_order(query, texts).await?;
        Ok(order.into_iter().map(|i| texts[i].clone()).collect())
    }

    /// Returns a permutation of `0..texts.len()`, most relevant first
    ///
    /// A response that cannot be parsed yields the original order.
    async fn rerank_order(&self, query: &str, texts: &[String]) -> Result<Vec<usize>> {
        if texts.len() < 2 {
            return Ok((0..texts.len()).collect());
        }

        let prompt = rerank_prompt(query, texts);
        let response = self.generate(&prompt).await?;
        Ok(parse_rerank_response(&response, texts.len()))
    }
}

/// Builds the prompt asking for a `RERANKED: 3,1,2` line
pub fn rerank_prompt(query: &str, texts: &[String]) -> String {
    let mut prompt = String::from(
        "You are a search result reranker. Given a search query and a list of search \
         results, rerank them by relevance to the query.\n\n",
    );
    let _ = write!(prompt, "Search Query: {}\n\nSearch Results:\n", query);
    for (i, text) in texts.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, text);
    }
    prompt.push_str("\nRespond with the result numbers in order of relevance, separated by commas:\n");
    prompt.push_str("RERANKED: 3,1,5,2,4\n\n");
    prompt.push_str("Only respond with the RERANKED line, nothing else.");
    prompt
}

/// Parses a `RERANKED:` line into zero-based indices
///
/// Indices are 1-based in the response. Out-of-range, unparsable and
/// repeated entries are dropped, and indices the model left out are appended
/// in their original order. Without any usable entry the identity order is
/// returned.
pub fn parse_rerank_response(response: &str, count: usize) -> Vec<usize> {
    let identity: Vec<usize> = (0..count).collect();

    let Some(list) = response.lines().find_map(|line| {
        line.trim()
            .strip_prefix(RERANK_MARKER)
            .map(|rest| rest.trim().to_string())
    }) else {
        return identity;
    };

    let mut seen = HashSet::new();
    let mut order: Vec<usize> = list
        .split(',')
        .filter_map(|item| {
            item.trim()
                .trim_matches(|c| c == '[' || c == ']')
                .parse::<usize>()
                .ok()
        })
        .filter(|&n| n >= 1 && n <= count)
        .map(|n| n - 1)
        .filter(|&i| seen.insert(i))
        .collect();

    if order.is_empty() {
        return identity;
    }

    order.extend(identity.into_iter().filter(|i| !seen.contains(i)));
    order
}

/// Chat-completions client for OpenRouter and compatible APIs
#[derive(Debug, Clone)]
pub struct OpenRouterModel {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouterModel {
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SeekError::Llm("missing LLM API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| SeekError::Llm("invalid LLM API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SeekError::Http {
                url: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(SeekError::Llm(format!(
                "chat completion failed ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| SeekError::Llm("no choices in response".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_rerank_response() {
        assert_eq!(parse_rerank_response("RERANKED: 3,1,2", 3), vec![2, 0, 1]);
        assert_eq!(
            parse_rerank_response("Sure!\n  RERANKED: [2, 3, 1]  \n", 3),
            vec![1, 2, 0]
        );
    }

    #[test]
    fn test_parse_rerank_drops_bad_entries_and_appends_missing() {
        assert_eq!(parse_rerank_response("RERANKED: 4,x,2,2,0", 3), vec![1, 0, 2]);
    }

    #[test]
    fn test_parse_rerank_falls_back_to_identity() {
        assert_eq!(parse_rerank_response("I think the second one", 3), vec![0, 1, 2]);
        assert_eq!(parse_rerank_response("RERANKED: 9, 10", 3), vec![0, 1, 2]);
        assert_eq!(parse_rerank_response("", 0), Vec::<usize>::new());
    }

    #[test]
    fn test_rerank_prompt_numbers_results() {
        let prompt = rerank_prompt("rust", &texts(&["alpha", "beta"]));
        assert!(prompt.contains("Search Query: rust"));
        assert!(prompt.contains("1. alpha\n2. beta\n"));
        assert!(prompt.contains(RERANK_MARKER));
    }

    struct ScriptedModel(&'static str);

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_rerank_default_method() {
        let model = ScriptedModel("RERANKED: 2,1");
        let reranked = model.rerank("q", &texts(&["a", "b"])).await.unwrap();
        assert_eq!(reranked, texts(&["b", "a"]));

        let model = ScriptedModel("no idea");
        let reranked = model.rerank("q", &texts(&["a", "b"])).await.unwrap();
        assert_eq!(reranked, texts(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_generate_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "RERANKED: 1"}}]
            })))
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: format!("{}/api/v1", server.uri()),
            ..LlmConfig::default()
        };
        let model = OpenRouterModel::new(&config, "key").unwrap();

        assert_eq!(model.generate("hello").await.unwrap(), "RERANKED: 1");
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        let model = OpenRouterModel::new(&config, "key").unwrap();

        assert!(matches!(model.generate("hello").await, Err(SeekError::Llm(_))));
    }
}
