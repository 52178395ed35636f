use std::path::Path;

use log::{info, warn};

use crate::config::AssistantConfig;
use crate::document::Document;
use crate::error::{AssistantError, Result};
use crate::llm::client::{JobClient, OpenAiClient};
use crate::llm::poller::RunPoller;
use crate::llm::types::{CreateAssistant, Role, RunStatus, VectorStoreStatus};

/// Remote objects created by one successful `bind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantHandle {
    pub assistant_id: String,
    pub file_id: String,
    pub vector_store_id: String,
    pub model: String,
}

/// Binds a document to a remote assistant and answers questions about it.
///
/// Each question runs on a fresh thread. Re-binding replaces the active
/// assistant; the previous one is left on the service.
pub struct AssistantSession<C: JobClient> {
    client: C,
    config: AssistantConfig,
    handle: Option<AssistantHandle>,
}

impl AssistantSession<OpenAiClient> {
    pub fn from_config(config: AssistantConfig) -> Self {
        let client = OpenAiClient::from_config(&config);
        Self::new(client, config)
    }
}

impl<C: JobClient> AssistantSession<C> {
    pub fn new(client: C, config: AssistantConfig) -> Self {
        Self {
            client,
            config,
            handle: None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn handle(&self) -> Option<&AssistantHandle> {
        self.handle.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Uploads `document` and creates an assistant for it with `model`.
    ///
    /// On failure the previously bound assistant, if any, stays active.
    pub async fn bind(&mut self, document: &Document, model: &str) -> Result<&AssistantHandle> {
        info!(
            "Binding {} ({} bytes) with model {}",
            document.filename,
            document.len(),
            model
        );

        let file = self.client.upload(document).await?;
        info!("Uploaded {} as file {}", document.filename, file.id);

        let store = self
            .client
            .create_vector_store(&document.filename, std::slice::from_ref(&file.id))
            .await?;
        let store = if store.status == VectorStoreStatus::Completed {
            store
        } else {
            self.poller().await_vector_store(&store.id).await?
        };
        if store.status != VectorStoreStatus::Completed {
            return Err(AssistantError::VectorStoreFailed {
                vector_store_id: store.id,
                status: store.status,
            });
        }
        if store.file_counts.failed > 0 {
            warn!(
                "Vector store {} could not index {} file(s)",
                store.id, store.file_counts.failed
            );
        }

        let request = CreateAssistant::with_file_search(
            self.config.assistant_name.clone(),
            self.config.instructions.clone(),
            model,
            store.id.clone(),
        );
        let assistant = self.client.create_assistant(&request).await?;

        if let Some(previous) = &self.handle {
            info!(
                "Replacing assistant {} with {}",
                previous.assistant_id, assistant.id
            );
        }
        info!("Assistant {} ready", assistant.id);

        Ok(self.handle.insert(AssistantHandle {
            assistant_id: assistant.id,
            file_id: file.id,
            vector_store_id: store.id,
            model: model.to_string(),
        }))
    }

    /// Reads a file from disk and binds it with the configured model.
    pub async fn bind_path(&mut self, path: &Path) -> Result<&AssistantHandle> {
        let document = Document::from_path(path).await?;
        let model = self.config.model.clone();
        self.bind(&document, &model).await
    }

    /// Asks a question against the bound document.
    ///
    /// Returns the text of every assistant message on the question's thread,
    /// in the order the service lists them.
    pub async fn ask(&self, question: &str) -> Result<Vec<String>> {
        let handle = self.handle.as_ref().ok_or(AssistantError::NotBound)?;

        let thread = self.client.create_thread().await?;
        self.client
            .post_message(&thread.id, Role::User, question)
            .await?;

        let run = self
            .client
            .create_run(&thread.id, &handle.assistant_id)
            .await?;
        info!(
            "Submitted run {} on thread {} for assistant {}",
            run.id, thread.id, handle.assistant_id
        );

        let run = if run.status.is_terminal() {
            run
        } else {
            self.poller().await_completion(&thread.id, &run.id).await?
        };

        if run.status != RunStatus::Completed {
            return Err(AssistantError::RunNotCompleted {
                reason: run.failure_reason(),
                run_id: run.id,
                status: run.status,
            });
        }

        let answers: Vec<String> = self
            .client
            .list_messages(&thread.id)
            .await?
            .into_iter()
            .filter(|message| message.role == Role::Assistant)
            .map(|message| message.text())
            .collect();

        info!("Run {} produced {} answer(s)", run.id, answers.len());
        Ok(answers)
    }

    fn poller(&self) -> RunPoller<'_, C> {
        RunPoller::new(&self.client, self.config.poll_policy.clone())
    }
}
