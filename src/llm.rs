use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat-completion call: model, ordered messages and sampling limits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    Auth,
    RateLimited,
    Network,
    Timeout,
    MalformedResponse,
    Api,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion API rejected the credentials ({0})")]
    Auth(StatusCode),
    #[error("completion API rate limit or quota exceeded")]
    RateLimited,
    #[error("failed to reach completion API: {0}")]
    Network(String),
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("completion API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
}

impl CompletionError {
    pub fn kind(&self) -> CompletionErrorKind {
        match self {
            CompletionError::Auth(_) => CompletionErrorKind::Auth,
            CompletionError::RateLimited => CompletionErrorKind::RateLimited,
            CompletionError::Network(_) => CompletionErrorKind::Network,
            CompletionError::Timeout(_) => CompletionErrorKind::Timeout,
            CompletionError::MalformedResponse(_) => CompletionErrorKind::MalformedResponse,
            CompletionError::Api { .. } => CompletionErrorKind::Api,
        }
    }

    /// Classify a non-success HTTP status from the completion API.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Auth(status),
            StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited,
            _ => CompletionError::Api { status, body },
        }
    }
}

/// The hosted completion service, seen from the bot.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        let url = self.endpoint();

        debug!("Sending completion request to {} (model {})", url, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, error_body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parse_choice(chat_response)
    }
}

fn parse_choice(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".to_string()))?
        .message
        .content
        .ok_or_else(|| CompletionError::MalformedResponse("choice has no content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_in_order() {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage::system("be nice"), ChatMessage::user("hello")],
            max_tokens: 150,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 150);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be nice");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            CompletionError::from_status(StatusCode::UNAUTHORIZED, String::new()).kind(),
            CompletionErrorKind::Auth
        );
        assert_eq!(
            CompletionError::from_status(StatusCode::FORBIDDEN, String::new()).kind(),
            CompletionErrorKind::Auth
        );
        assert_eq!(
            CompletionError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()).kind(),
            CompletionErrorKind::RateLimited
        );
        let err = CompletionError::from_status(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err.kind(), CompletionErrorKind::Api);
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_parse_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Hi there!  "}}]}"#,
        )
        .unwrap();
        assert_eq!(parse_choice(response).unwrap(), "  Hi there!  ");
    }

    #[test]
    fn test_parse_empty_choices_is_malformed() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(
            parse_choice(response).unwrap_err().kind(),
            CompletionErrorKind::MalformedResponse
        );
    }

    #[test]
    fn test_parse_null_content_is_malformed() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(
            parse_choice(response).unwrap_err().kind(),
            CompletionErrorKind::MalformedResponse
        );
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = LlmClient::new("http://localhost:1234/v1/");
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
