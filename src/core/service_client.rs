// src/core/service_client.rs
//! HTTP client for the local Ollama-compatible inference service

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::InferenceConfig;
use crate::error::{PipelineError, Result};

const CHAT_ENDPOINT: &str = "/api/chat";
const TAGS_ENDPOINT: &str = "/api/tags";
const CONNECTION_CHECK_TIMEOUT_SECS: u64 = 10;

/// One prompt in, one completion out. `label` names the section for logs.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(&self, label: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::inference(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fail fast when the service is not running, before any prompt is sent
    pub async fn check_connection(&self) -> Result<()> {
        let url = format!("{}{}", self.base_url, TAGS_ENDPOINT);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(CONNECTION_CHECK_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::inference(format!(
                "Inference service at {} returned status {}",
                self.base_url, status
            )));
        }

        info!("Connected to inference service at {}", self.base_url);
        Ok(())
    }

    fn request_error(&self, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::inference(format!(
                "Inference service at {} timed out: {}",
                self.base_url, e
            ))
        } else if e.is_connect() {
            PipelineError::inference(format!(
                "Cannot reach inference service at {}. Is Ollama running? ({})",
                self.base_url, e
            ))
        } else {
            PipelineError::inference(format!("Inference request failed: {}", e))
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn generate(&self, label: &str, prompt: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, CHAT_ENDPOINT);
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        info!("Generating {} with {}", label, self.model);
        debug!("Prompt for {}:\n{}", label, prompt);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Inference service error for {}: {}", label, error_text);
            return Err(PipelineError::inference(format!(
                "Inference service returned status {} for {}: {}",
                status, label, error_text
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            PipelineError::inference(format!("Failed to parse inference response for {}: {}", label, e))
        })?;

        let content = body
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::inference(format!("Inference service returned no content for {}", label))
            })?;

        debug!("Raw output for {}:\n{}", label, content);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config_for(base_url: String) -> InferenceConfig {
        InferenceConfig {
            base_url,
            model: "phi3:latest".to_string(),
            temperature: 0.2,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "phi3:latest",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"role":"assistant","content":"Hi"},"done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(&config_for(server.url())).unwrap();
        assert_eq!(client.model(), "phi3:latest");
        let out = client.generate("greeting", "Say hi").await.unwrap();

        assert_eq!(out, "Hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_inference_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("model not found")
            .create_async()
            .await;

        let client = OllamaClient::new(&config_for(server.url())).unwrap();
        let err = client.generate("summary", "x").await.unwrap_err();
        match err {
            PipelineError::Inference(msg) => assert!(msg.contains("model not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_content_is_inference_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"message":{"role":"assistant","content":"  "}}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(&config_for(server.url())).unwrap();
        let err = client.generate("summary", "x").await.unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Port 9 (discard) is not expected to run an HTTP server
        let client = OllamaClient::new(&config_for("http://127.0.0.1:9".to_string())).unwrap();
        let err = client.check_connection().await.unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(&config_for(format!("{}/", server.url()))).unwrap();
        client.check_connection().await.unwrap();
    }
}
