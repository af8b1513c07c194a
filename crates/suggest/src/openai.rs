use crate::config::SuggestConfig;
use crate::error::{GatewayError, Result};
use crate::source::KeywordSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const SYSTEM_PROMPT: &str = r#"# Objective
You are an investigator with many years of practical experience in digital forensics. Analyze the keywords entered by the user, derive semantically, thematically and contextually related single-word keywords, and output exactly N of them in the JSON format below.

## Input
- Format: keyword1, keyword2, keyword3, number_of_keywords_to_output
- Example 1: police agency, sexual harassment, statistics, 30
- Example 2: drugs, smuggling, BTC, 30
- Example 3: military, blueprint, operation, 30

# Output
{"keywords": ["keyword1", "keyword2", ...]}

# Instructions
1. Each keyword must be a single word and cannot contain spaces, hyphens or underscores.
2. Every keyword appears only once (no homonyms or alternate spellings).
3. Balance synonyms, hypernyms, hyponyms and related words.
4. Order keywords by relevance and usefulness; do not randomize.
5. Hierarchy ratio for N=30: at least 12 hypernyms, 10-12 mid-level terms, at most 8 hyponyms.
6. Include at least 5 specialized or professional terms, slang or abbreviations.
7. Before answering, remove banned words, duplicates and typos so exactly N keywords remain.

# Output-only
Return only the JSON object, once, with no explanations or extra line breaks."#;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    presence_penalty: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeywordList {
    #[serde(default)]
    keywords: Vec<Value>,
}

/// Keyword source backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiKeywordSource {
    client: Client,
    endpoint: String,
    api_key: String,
    config: SuggestConfig,
}

impl OpenAiKeywordSource {
    pub fn new(config: &SuggestConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            config: config.clone(),
        })
    }
}

pub(crate) fn user_message(seeds: &[String], count: usize) -> String {
    let mut parts: Vec<String> = seeds.to_vec();
    parts.push(count.to_string());
    parts.join(", ")
}

pub(crate) fn build_request<'a>(
    config: &'a SuggestConfig,
    seeds: &[String],
    count: usize,
) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_message(seeds, count),
            },
        ],
        temperature: config.temperature,
        presence_penalty: config.presence_penalty,
        max_tokens: config.max_tokens,
        response_format: ResponseFormat {
            kind: "json_object",
        },
    }
}

/// Pull the keyword strings out of a chat-completions body. Non-string entries are dropped.
pub(crate) fn parse_response(body: &str) -> Result<Vec<String>> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|err| GatewayError::malformed(err.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GatewayError::malformed("response has no message content"))?;
    let list: KeywordList = serde_json::from_str(&content)
        .map_err(|err| GatewayError::malformed(format!("content is not a keyword object: {err}")))?;
    Ok(list
        .keywords
        .into_iter()
        .filter_map(|value| match value {
            Value::String(word) => Some(word),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl KeywordSource for OpenAiKeywordSource {
    async fn fetch(&self, seeds: &[String], count: usize) -> Result<Vec<String>> {
        let request = build_request(&self.config, seeds, count);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_carries_seeds_count_and_sampling_parameters() {
        let config = SuggestConfig::default();
        let seeds = vec!["land".to_string(), "policy".to_string()];
        let request = serde_json::to_value(build_request(&config, &seeds, 30)).unwrap();

        assert_eq!(request["model"], json!(config.model));
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "land, policy, 30");
        assert_eq!(request["response_format"], json!({"type": "json_object"}));
        assert_eq!(request["max_tokens"], 800);
    }

    #[test]
    fn parses_keywords_and_drops_non_strings() {
        let body = json!({
            "choices": [{
                "message": {"content": "{\"keywords\": [\"housing\", 7, \"zoning\"]}"}
            }]
        })
        .to_string();
        assert_eq!(parse_response(&body).unwrap(), vec!["housing", "zoning"]);
    }

    #[test]
    fn non_json_content_is_malformed() {
        let body = json!({"choices": [{"message": {"content": "housing, zoning"}}]}).to_string();
        assert!(matches!(
            parse_response(&body),
            Err(GatewayError::Malformed(_))
        ));
        assert!(matches!(
            parse_response("{\"choices\": []}"),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = SuggestConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..Default::default()
        };
        let source = OpenAiKeywordSource::new(&config, "key").unwrap();
        assert_eq!(source.endpoint, "http://localhost:9000/v1/chat/completions");
    }
}
