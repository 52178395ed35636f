use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt;

use crate::config::{AssistantConfig, DEFAULT_BASE_URL};
use crate::document::Document;
use crate::error::{AssistantError, Result};
use crate::llm::types::*;

const ASSISTANTS_BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// The remote calls a session needs. Every call is one round trip; nothing is
/// cached or retried here.
#[async_trait]
pub trait JobClient: Send + Sync {
    async fn upload(&self, document: &Document) -> Result<FileObject>;

    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<VectorStore>;

    async fn get_vector_store(&self, vector_store_id: &str) -> Result<VectorStore>;

    async fn create_assistant(&self, request: &CreateAssistant) -> Result<Assistant>;

    async fn create_thread(&self) -> Result<Thread>;

    async fn post_message(&self, thread_id: &str, role: Role, text: &str) -> Result<Message>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Messages in the order the service lists them.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key, DEFAULT_BASE_URL)
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::with_client(Client::new(), config.api_key.clone(), &config.base_url)
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, TLS).
    pub fn with_client(client: Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header(ASSISTANTS_BETA_HEADER.0, ASSISTANTS_BETA_HEADER.1)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.authorized(builder).send().await?;
        handle_response(response).await
    }
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        AssistantError::Parse(format!("Unexpected response body (status {}): {}", status, e))
    })
}

pub(crate) fn error_from_status(status: StatusCode, body: &str) -> AssistantError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body.to_string()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AssistantError::Authentication {
            status: status.as_u16(),
            message,
        },
        _ => AssistantError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl JobClient for OpenAiClient {
    async fn upload(&self, document: &Document) -> Result<FileObject> {
        debug!(
            "Uploading {} ({} bytes, {})",
            document.filename,
            document.len(),
            document.mime_type
        );

        let file_part = Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(&document.mime_type)
            .map_err(|e| {
                AssistantError::Config(format!(
                    "Invalid MIME type '{}': {}",
                    document.mime_type, e
                ))
            })?;
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", file_part);

        self.send(self.client.post(self.url("files")).multipart(form))
            .await
    }

    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<VectorStore> {
        let payload = CreateVectorStore {
            name: name.to_string(),
            file_ids: file_ids.to_vec(),
        };
        self.send(self.client.post(self.url("vector_stores")).json(&payload))
            .await
    }

    async fn get_vector_store(&self, vector_store_id: &str) -> Result<VectorStore> {
        let url = self.url(&format!("vector_stores/{}", vector_store_id));
        self.send(self.client.get(url)).await
    }

    async fn create_assistant(&self, request: &CreateAssistant) -> Result<Assistant> {
        self.send(self.client.post(self.url("assistants")).json(request))
            .await
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.send(self.client.post(self.url("threads")).json(&json!({})))
            .await
    }

    async fn post_message(&self, thread_id: &str, role: Role, text: &str) -> Result<Message> {
        let url = self.url(&format!("threads/{}/messages", thread_id));
        let payload = CreateMessage {
            role,
            content: text.to_string(),
        };
        self.send(self.client.post(url).json(&payload)).await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let url = self.url(&format!("threads/{}/runs", thread_id));
        let payload = CreateRun {
            assistant_id: assistant_id.to_string(),
        };
        self.send(self.client.post(url).json(&payload)).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let url = self.url(&format!("threads/{}/runs/{}", thread_id, run_id));
        self.send(self.client.get(url)).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let url = self.url(&format!("threads/{}/messages", thread_id));
        let list: MessageList = self.send(self.client.get(url)).await?;
        if list.has_more {
            debug!(
                "Thread {} has more messages than the first page; using the first {}",
                thread_id,
                list.data.len()
            );
        }
        Ok(list.data)
    }
}
