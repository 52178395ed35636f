use std::time::Duration;

use thiserror::Error;

use crate::llm::types::{RunStatus, VectorStoreStatus};

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Remote service rejected the request (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Run {run_id} finished with status '{status}'{}", reason_suffix(.reason))]
    RunNotCompleted {
        run_id: String,
        status: RunStatus,
        reason: Option<String>,
    },

    #[error("Vector store {vector_store_id} finished ingestion with status '{status}'")]
    VectorStoreFailed {
        vector_store_id: String,
        status: VectorStoreStatus,
    },

    #[error("No document bound to the session: call bind() before ask()")]
    NotBound,

    #[error("Gave up waiting after {waited:?} ({attempts} status checks)")]
    Timeout { waited: Duration, attempts: u32 },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssistantError {
    /// Network failures and rejected credentials.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Authentication { .. })
    }

    /// The provider refused a request or a remote job ended unsuccessfully.
    pub fn is_remote_service_error(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::RunNotCompleted { .. } | Self::VectorStoreFailed { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotBound)
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}
