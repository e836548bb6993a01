//! 언어 모델 모듈 - 답변 생성
//!
//! 조립된 프롬프트를 받아 답변 텍스트를 반환하는 인터페이스와
//! OpenAI Chat Completions 구현체입니다.
//! 재시도는 하지 않습니다. 실패는 `RagError::Generation`으로 바로 반환됩니다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

/// 시스템 메시지
const SYSTEM_PROMPT: &str = "You are a research assistant. Answer only from the provided \
extracted parts of documents, and list the sources you used exactly as they are given.";

// ============================================================================
// LanguageModel Trait
// ============================================================================

/// 언어 모델 트레이트
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 프롬프트로 텍스트 생성
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Chat Completions
// ============================================================================

/// OpenAI 호환 Chat Completions 클라이언트
pub struct OpenAiChat {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            client,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Calling {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RagError::Generation(format!("{} request timed out", self.model))
                } else {
                    RagError::Generation(format!("failed to call chat completions: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::Generation(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(RagError::Generation(describe_openai_error(status, &body)));
        }

        extract_content(&body)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// 응답 본문에서 첫 번째 메시지 내용 추출
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RagError::Generation(format!("malformed chat response: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| RagError::Generation("chat response contained no content".to_string()))
}

fn describe_openai_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OpenAiError>(body) {
        Ok(error) => format!("OpenAI returned {}: {}", status, error.error.message),
        Err(_) => format!("OpenAI returned {}: {}", status, body),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
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
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// Factory Function
// ============================================================================

/// 답변 생성 모델 생성 (OpenAI)
pub fn create_language_model(api_key: &str, config: &GenerationConfig) -> Result<OpenAiChat> {
    let model = OpenAiChat::new(api_key.to_string(), config)?;
    tracing::info!("Using {} for answers (temperature {})", config.model, config.temperature);
    Ok(model)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_base_url() {
        let config = GenerationConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        let chat = OpenAiChat::new("sk-test".to_string(), &config).unwrap();
        assert_eq!(chat.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(chat.name(), "gpt-3.5-turbo");
    }

    #[test]
    fn test_request_body() {
        let chat = OpenAiChat::new("sk-test".to_string(), &GenerationConfig::default()).unwrap();
        let json = serde_json::to_value(chat.request_body("question?")).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "question?");
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"FINAL ANSWER: 42\nSOURCES: doc"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "FINAL ANSWER: 42\nSOURCES: doc");
    }

    #[test]
    fn test_extract_content_malformed() {
        assert!(matches!(
            extract_content("<html>bad gateway</html>"),
            Err(RagError::Generation(_))
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(RagError::Generation(_))
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(RagError::Generation(_))
        ));
    }

    #[test]
    fn test_describe_openai_error() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        let msg = describe_openai_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert!(msg.contains("429"));
        assert!(msg.contains("Rate limit reached"));
    }
}
