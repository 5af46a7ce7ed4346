//! Text-generation client.
//!
//! The pipeline only needs "prompt in, text out", so the model sits behind
//! the [`TextGenerator`] trait. [`OllamaClient`] implements it over the
//! Ollama `/api/chat` endpoint.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::InsightError;

/// Anything that turns a prompt into free text.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError>;
}

/// Connection settings for the Ollama client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl From<&ModelConfig> for ClientConfig {
    fn from(model: &ModelConfig) -> Self {
        Self {
            ollama_url: model.ollama_url.clone(),
            model_name: model.name.clone(),
            temperature: model.temperature,
            timeout_seconds: model.timeout_seconds,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str = r#"You are an experienced pedagogical coordinator.
You read grade statistics prepared for a teacher and write short, concrete,
encouraging observations in plain language.

RULES:
- Base every statement on the numbers you are given. Never invent students, subjects or scores.
- Keep each text field to a few sentences.
- Answer with a single JSON object that follows the requested schema exactly.
- Do not add commentary before or after the JSON."#;

/// Client for a local Ollama server.
pub struct OllamaClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!(
            "Initializing Ollama client with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn request(&self, prompt: &str) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));
        debug!("Sending {} character prompt to {}", prompt.len(), url);

        let response = self
            .http_client
            .post(&url)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| {
                InsightError::CollaboratorUnavailable(if e.is_timeout() {
                    format!("request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    format!("cannot connect to Ollama at {}", self.config.ollama_url)
                } else {
                    format!("failed to send request: {}", e)
                })
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::CollaboratorUnavailable(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            InsightError::CollaboratorUnavailable(format!("failed to read Ollama response: {}", e))
        })?;

        debug!(
            "Received {} characters from the model",
            chat_response.message.content.len()
        );
        Ok(chat_response.message.content)
    }
}
