// Judgment Provider Service
// HTTP client for the external semantic-judgment service (OpenAI-compatible
// chat endpoints; Gemini is the default provider).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Instant;
use thiserror::Error;

const GEMINI_DEFAULT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_JUDGE_PROVIDER: &str = "gemini:gemini-2.5-flash";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

pub fn parse_provider(spec: &str) -> ProviderSpec {
    let parts: Vec<&str> = spec.splitn(2, ':').collect();
    if parts.len() == 2 {
        ProviderSpec {
            name: parts[0].to_string(),
            model: parts[1].to_string(),
        }
    } else {
        ProviderSpec {
            name: spec.to_string(),
            model: String::new(),
        }
    }
}

/// Resolve the judgment provider: env override, then config file, then default.
pub fn resolve_judge_provider() -> ProviderSpec {
    if let Ok(val) = env::var("POLICYLENS_JUDGE_PROVIDER") {
        let v = val.trim();
        if !v.is_empty() {
            return parse_provider(v);
        }
    }
    if let Some(config_dir) = super::ConfigStore::default_config_dir() {
        let store = super::ConfigStore::new(config_dir);
        if let Ok(config) = store.load() {
            if let Some(spec) = config.judge_provider.as_deref() {
                if !spec.trim().is_empty() {
                    return parse_provider(spec.trim());
                }
            }
        }
    }
    parse_provider(DEFAULT_JUDGE_PROVIDER)
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    gemini_url: String,
    openai_url: String,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(80))
            .build()
            .unwrap_or_default();

        Self {
            client,
            gemini_url: env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string()),
            openai_url: env::var("OPENAI_API_URL").unwrap_or_else(|_| OPENAI_DEFAULT_URL.to_string()),
        }
    }

    pub fn with_proxy(proxy_url: &str) -> Result<Self, ProviderError> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(80))
            .proxy(proxy)
            .build()?;

        Ok(Self {
            client,
            gemini_url: env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string()),
            openai_url: env::var("OPENAI_API_URL").unwrap_or_else(|_| OPENAI_DEFAULT_URL.to_string()),
        })
    }

    /// Call the configured judgment provider with a system + user prompt.
    /// `use_json_format` requests a json_object response where supported.
    pub async fn call_judge(
        &self,
        provider: &ProviderSpec,
        api_key: &str,
        system: &str,
        user: &str,
        max_tokens: i32,
        use_json_format: bool,
    ) -> Result<ChatResult, ProviderError> {
        let (url, model) = match provider.name.as_str() {
            "openai" => (
                self.openai_url.as_str(),
                if provider.model.is_empty() { "gpt-4o-mini" } else { provider.model.as_str() },
            ),
            _ => (
                self.gemini_url.as_str(),
                if provider.model.is_empty() { "gemini-2.5-flash" } else { provider.model.as_str() },
            ),
        };
        self.call_chat_api(url, model, api_key, system, user, max_tokens, use_json_format)
            .await
    }

    async fn call_chat_api(
        &self,
        url: &str,
        model: &str,
        api_key: &str,
        system: &str,
        user: &str,
        max_tokens: i32,
        use_json_format: bool,
    ) -> Result<ChatResult, ProviderError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature: 0.0,
            response_format: if use_json_format {
                Some(ResponseFormat {
                    r#type: "json_object".to_string(),
                })
            } else {
                None
            },
        };

        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult { content, latency_ms })
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    // Try environment variables first
    let env_keys = match provider {
        "gemini" => vec!["GEMINI_API_KEY", "POLICYLENS_GEMINI_API_KEY"],
        "openai" => vec!["OPENAI_API_KEY", "POLICYLENS_OPENAI_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    // Try config file
    if let Some(config_dir) = super::ConfigStore::default_config_dir() {
        let store = super::ConfigStore::new(config_dir);
        if let Ok(Some(key)) = store.get_api_key(provider) {
            return Some(key);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        let spec = parse_provider("gemini:gemini-2.5-flash");
        assert_eq!(spec.name, "gemini");
        assert_eq!(spec.model, "gemini-2.5-flash");

        let spec2 = parse_provider("openai");
        assert_eq!(spec2.name, "openai");
        assert_eq!(spec2.model, "");
    }

    #[test]
    fn test_provider_client_creation() {
        let client = ProviderClient::new();
        assert!(client.gemini_url.starts_with("http"));
    }
}
