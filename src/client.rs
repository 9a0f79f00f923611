use crate::config::Config;
use crate::events::FileMeta;
use crate::mode::ChatMode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload sent to the remote responder.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub files: Vec<FileMeta>,
    pub mode: ChatMode,
}

/// Successful responder reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(rename = "modeUsed")]
    pub mode_used: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Failures surfacing from a single request attempt.
#[derive(Debug, Clone, Error)]
pub enum ResponderError {
    /// The responder answered with a non-success status and an error
    /// description.
    #[error("{0}")]
    Api(String),
    /// The responder could not be reached or returned an unreadable body.
    #[error("failed to get response from server: {0}")]
    Transport(String),
}

/// Boundary to the remote chat responder. One request per submission, no
/// retries; the controller turns failures into visible messages.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, request: ChatRequest) -> Result<ChatReply, ResponderError>;
}

/// Production responder over HTTP.
#[derive(Debug, Clone)]
pub struct HttpResponder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResponder {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.responder.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn send(&self, request: ChatRequest) -> Result<ChatReply, ResponderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ResponderError::Transport(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<ChatReply>()
                .await
                .map_err(|e| ResponderError::Transport(e.to_string()))
        } else {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => "Failed to get response from server".to_string(),
            };
            Err(ResponderError::Api(message))
        }
    }
}
