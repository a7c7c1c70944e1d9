use crate::client_trait::ChatClient;
use async_trait::async_trait;
use futures_util::StreamExt;
use havruta_core::{CancelToken, ChatMessage, LlmConfig, LlmError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    async fn send_request(
        &self,
        messages: &[ChatMessage],
        stream: bool,
        cancel: &CancelToken,
    ) -> Result<reqwest::Response, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream,
        };
        let send = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            result = send => result.map_err(|e| LlmError::RequestFailed(e.to_string()))?,
        };

        if !response.status().is_success() {
            return Err(LlmError::RequestFailed(format!(
                "HTTP {} from completion endpoint",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
    ) -> Result<String, LlmError> {
        let response = self.send_request(messages, false, cancel).await?;

        let body: ChatCompletionResponse = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            result = response.json() => {
                result.map_err(|e| LlmError::InvalidResponse(e.to_string()))?
            }
        };

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::InvalidResponse("completion response had no choices".to_string())
            })
    }

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        chunks: mpsc::UnboundedSender<String>,
        cancel: &CancelToken,
    ) -> Result<String, LlmError> {
        let response = self.send_request(messages, true, cancel).await?;

        let mut stream = response.bytes_stream();
        let mut line_buf = String::new();
        let mut accumulated = String::new();

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                item = stream.next() => item,
            };
            let Some(item) = item else { break };
            let bytes = item.map_err(|e| LlmError::RequestFailed(e.to_string()))?;
            line_buf.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = line_buf.find('\n') {
                let line = line_buf[..newline].trim().to_string();
                line_buf.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return Ok(accumulated);
                }
                let parsed: StreamChunk = serde_json::from_str(data)
                    .map_err(|e| LlmError::InvalidResponse(format!("bad stream event: {e}")))?;
                if let Some(text) = parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                {
                    accumulated.push_str(&text);
                    let _ = chunks.send(text);
                }
            }
        }
        Ok(accumulated)
    }
}
