//! OpenAI Assistants (v2) collaborator
//!
//! Each batch becomes a fresh thread: the instructions and the items are sent
//! as one user message, a run is started against a pre-configured assistant,
//! and the run is polled until it reaches a terminal state or the deadline
//! passes. The assistant's text messages are returned verbatim.
//!
//! # Examples
//!
//! ```no_run
//! use tasksift_llm::{AssistantClassifier, AssistantConfig};
//!
//! let config = AssistantConfig::new("asst_123");
//! let classifier = AssistantClassifier::new("sk-...", config).unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tasksift_domain::traits::{Classifier, ClassifyRequest};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Beta header value required by the v2 threads API
const ASSISTANTS_BETA: &str = "assistants=v2";

/// Assistant connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// API base URL
    pub base_url: String,

    /// Pre-configured assistant to run
    pub assistant_id: String,

    /// Extra instructions appended to the assistant's own for every run
    pub additional_instructions: Option<String>,

    /// Delay between run status polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Give up on a run after this long (seconds)
    pub run_deadline_secs: u64,

    /// Per-request HTTP timeout (seconds)
    pub request_timeout_secs: u64,

    /// Most recent messages read back from the thread
    pub message_limit: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            assistant_id: String::new(),
            additional_instructions: None,
            poll_interval_ms: 1_200,
            run_deadline_secs: 600,
            request_timeout_secs: 60,
            message_limit: 10,
        }
    }
}

impl AssistantConfig {
    /// Settings for `assistant_id` with defaults elsewhere
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.assistant_id.trim().is_empty() {
            return Err("assistant_id is required".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        if self.run_deadline_secs == 0 {
            return Err("run_deadline_secs must be greater than 0".to_string());
        }
        if self.message_limit == 0 {
            return Err("message_limit must be at least 1".to_string());
        }
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}

/// Classifier backed by an OpenAI assistant
pub struct AssistantClassifier {
    config: AssistantConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Run {
    id: String,
    thread_id: String,
    status: String,
    #[serde(default)]
    last_error: Option<Value>,
}

impl Run {
    fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "completed" | "failed" | "cancelled" | "expired" | "incomplete"
        )
    }
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<Message>,
}

#[derive(Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: Vec<Value>,
}

impl AssistantClassifier {
    /// Create a classifier authenticating with `api_key`
    pub fn new(api_key: &str, config: AssistantConfig) -> Result<Self, LlmError> {
        config.validate().map_err(LlmError::Config)?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| LlmError::Config(format!("Invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static(ASSISTANTS_BETA));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// The active configuration
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, LlmError> {
        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Create a thread holding the batch and start a run on it
    async fn start_run(&self, request: &ClassifyRequest) -> Result<Run, LlmError> {
        let items = serde_json::to_string(&request.items)
            .map_err(|e| LlmError::Other(format!("Failed to encode items: {}", e)))?;
        let content = format!("{}\n\nTASKS JSON:\n{}", request.instructions, items);

        let mut body = json!({
            "assistant_id": self.config.assistant_id,
            "thread": {
                "messages": [{"role": "user", "content": content}]
            }
        });
        if let Some(extra) = &self.config.additional_instructions {
            body["additional_instructions"] = Value::String(extra.clone());
        }

        self.send(self.client.post(self.url("threads/runs")).json(&body))
            .await
    }

    /// Poll a run until it is terminal or the deadline passes
    async fn wait_for(&self, mut run: Run) -> Result<Run, LlmError> {
        let started = Instant::now();
        let deadline = started + self.config.run_deadline();

        while !run.is_terminal() {
            if Instant::now() >= deadline {
                return Err(LlmError::DeadlineExceeded {
                    run_id: run.id,
                    status: run.status,
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.config.poll_interval()).await;

            let path = format!("threads/{}/runs/{}", run.thread_id, run.id);
            run = self.send(self.client.get(self.url(&path))).await?;
            debug!("Run {} status: {}", run.id, run.status);
        }
        Ok(run)
    }

    /// Concatenate the assistant's text messages, oldest first
    async fn read_reply(&self, thread_id: &str) -> Result<String, LlmError> {
        let path = format!("threads/{}/messages", thread_id);
        let limit = self.config.message_limit.to_string();
        let list: MessageList = self
            .send(
                self.client
                    .get(self.url(&path))
                    .query(&[("order", "desc"), ("limit", limit.as_str())]),
            )
            .await?;

        let mut parts = Vec::new();
        for message in list.data.iter().filter(|m| m.role == "assistant") {
            for part in &message.content {
                match part.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        if let Some(text) = part.pointer("/text/value").and_then(Value::as_str) {
                            if !text.is_empty() {
                                parts.push(text.to_string());
                            }
                        }
                    }
                    other => debug!("Ignoring assistant content of type {:?}", other),
                }
            }
        }
        parts.reverse();
        Ok(parts.join("\n").trim().to_string())
    }
}

#[async_trait]
impl Classifier for AssistantClassifier {
    type Error = LlmError;

    async fn submit(&self, request: &ClassifyRequest) -> Result<String, Self::Error> {
        let run = self.start_run(request).await?;
        info!(
            "Started run {} on thread {} for {} items",
            run.id,
            run.thread_id,
            request.items.len()
        );

        let run = self.wait_for(run).await?;
        if run.status != "completed" {
            let detail = run
                .last_error
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "no error reported".to_string());
            warn!("Run {} ended with status {}: {}", run.id, run.status, detail);
            return Err(LlmError::RunFailed {
                run_id: run.id,
                status: run.status,
                detail,
            });
        }

        self.read_reply(&run.thread_id).await
    }
}
