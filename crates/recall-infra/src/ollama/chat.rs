//! Ollama chat agent used by the CLI.
//!
//! Implements `ConversationAgent` over `POST /api/chat` with streaming
//! enabled. Ollama streams newline-delimited JSON objects; each carries a
//! fragment of the assistant message until one arrives with `done: true`.
//! The agent also keeps a short rolling window of recent messages so the
//! model sees the immediate conversation, not just recalled memories.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use recall_core::agent::provider::ConversationAgent;
use recall_types::agent::BatchInput;
use recall_types::config::ChatConfig;
use recall_types::error::AgentError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages kept in the rolling short-term window (user + assistant).
const MAX_HISTORY_MESSAGES: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

impl OllamaMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// One NDJSON line of a streamed chat response.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// What a single stream line means for the caller.
#[derive(Debug, PartialEq)]
enum LineEvent {
    Text(String),
    Done,
    Skip,
}

fn parse_line(line: &[u8]) -> Result<LineEvent, AgentError> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(LineEvent::Skip);
    }
    let chunk: ChatChunk = serde_json::from_slice(line)
        .map_err(|e| AgentError::Stream(format!("invalid chat chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(AgentError::Stream(error));
    }
    if chunk.done {
        return Ok(LineEvent::Done);
    }
    match chunk.message {
        Some(message) if !message.content.is_empty() => Ok(LineEvent::Text(message.content)),
        _ => Ok(LineEvent::Skip),
    }
}

/// Strip the `data:image/...;base64,` prefix; Ollama wants bare base64.
fn bare_base64(data_url: &str) -> Option<&str> {
    if !data_url.starts_with("data:image") {
        return None;
    }
    data_url.split_once(',').map(|(_, payload)| payload)
}

/// Streams replies from an Ollama chat model.
#[derive(Clone)]
pub struct OllamaChatAgent {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    history: Arc<Mutex<Vec<OllamaMessage>>>,
}

impl OllamaChatAgent {
    pub fn new(config: &ChatConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AgentError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forget the short-term conversation window.
    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn user_message(input: &BatchInput) -> OllamaMessage {
        let mut message = OllamaMessage::new("user", input.user_text());
        message.images = input
            .images
            .iter()
            .filter_map(|img| bare_base64(&img.data))
            .map(str::to_string)
            .collect();
        message
    }

    fn build_request(&self, system_prompt: &str, user: OllamaMessage) -> ChatRequest {
        let mut messages = vec![OllamaMessage::new("system", system_prompt)];
        messages.extend(
            self.history
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .iter()
                .cloned(),
        );
        messages.push(user);
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
            options: ChatOptions {
                temperature: self.temperature,
            },
        }
    }
}

fn remember_exchange(history: &Mutex<Vec<OllamaMessage>>, user: OllamaMessage, reply: String) {
    let mut history = history.lock().unwrap_or_else(|p| p.into_inner());
    // Images stay out of the window; they are large and already answered.
    history.push(OllamaMessage::new("user", user.content));
    history.push(OllamaMessage::new("assistant", reply));
    let overflow = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    history.drain(..overflow);
}

async fn send_chat(
    client: &reqwest::Client,
    url: &str,
    body: &ChatRequest,
) -> Result<reqwest::Response, AgentError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| AgentError::Request(format!("ollama chat request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Ollama chat error response");
        return Err(AgentError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

impl ConversationAgent for OllamaChatAgent {
    type Output = Result<String, AgentError>;

    fn name(&self) -> &str {
        "ollama"
    }

    fn chat(
        &self,
        system_prompt: &str,
        input: &BatchInput,
    ) -> Pin<Box<dyn Stream<Item = Self::Output> + Send + 'static>> {
        let user = Self::user_message(input);
        let body = self.build_request(system_prompt, user.clone());
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.base_url);
        let history = self.history.clone();

        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            "Sending Ollama chat request"
        );

        Box::pin(async_stream::try_stream! {
            let response = send_chat(&client, &url, &body).await?;

            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut reply = String::new();
            let mut finished = false;

            'read: while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk.map_err(|e| AgentError::Stream(format!("response body read: {e}")))?;
                buffer.extend_from_slice(&chunk);

                while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    match parse_line(&line)? {
                        LineEvent::Text(text) => {
                            reply.push_str(&text);
                            yield text;
                        }
                        LineEvent::Done => {
                            finished = true;
                            break 'read;
                        }
                        LineEvent::Skip => {}
                    }
                }
            }

            if !finished {
                // Final object without a trailing newline.
                match parse_line(&buffer)? {
                    LineEvent::Text(text) => {
                        reply.push_str(&text);
                        yield text;
                    }
                    LineEvent::Done | LineEvent::Skip => {}
                }
            }

            remember_exchange(&history, user, reply);
        })
    }
}
