//! Chat-completion client for the hosted language model.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

pub const TEMPERATURE: f32 = 1.0;
pub const TOP_P: f32 = 1.0;
pub const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("failed to reach completion API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Sends one prompt and returns the model's text
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
    stop: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for Groq's OpenAI-compatible `chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct GroqClient {
    endpoint: String,
    model: String,
    api_key: SecretString,
    client: Client,
}

impl GroqClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = ClientBuilder::new().timeout(timeout).build()?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        Self::new(
            &config.groq_api_url,
            &config.groq_model,
            config.groq_api_key.clone(),
            config.completion_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "system",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
            stream: false,
            stop: None,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("no choices returned".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::Server) -> GroqClient {
        GroqClient::new(
            &server.url(),
            "llama3-8b-8192",
            SecretString::new("gsk_test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    /// Accepts connections and never answers
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_complete_sends_fixed_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk_test")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama3-8b-8192",
                "messages": [{ "role": "system", "content": "Say hi" }],
                "temperature": 1.0,
                "max_tokens": 1024,
                "top_p": 1.0,
                "stream": false,
                "stop": null
            })))
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "role": "assistant", "content": "hi" } }] })
                    .to_string(),
            )
            .create_async()
            .await;

        let text = client(&server).complete("Say hi").await.unwrap();

        assert_eq!(text, "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let err = client(&server).complete("x").await.unwrap_err();

        match err {
            CompletionError::Status { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty_string() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": null}}]}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).complete("x").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = GroqClient::new(
            "http://127.0.0.1:1",
            "llama3-8b-8192",
            SecretString::new("gsk_test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = client.complete("x").await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out() {
        let base_url = silent_server().await;
        let client = GroqClient::new(
            &base_url,
            "llama3-8b-8192",
            SecretString::new("gsk_test".to_string()),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = client.complete("x").await.unwrap_err();
        match err {
            CompletionError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
