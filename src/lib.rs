//! # PDF Assistant
//!
//! Ask questions about a PDF through a hosted assistant service.
//!
//! The service does all of the document work (indexing, retrieval, answer
//! generation). This crate uploads the document, creates an assistant bound to
//! it, and for every question submits a run on a fresh thread and polls it
//! until it reaches a terminal state.
//!
//! ## Core Concepts
//!
//! - **Assistant**: remote configuration binding instructions, a model and the uploaded document
//! - **Thread**: an ordered conversation of role-tagged messages kept by the service
//! - **Run**: one asynchronous execution of the assistant against a thread
//! - **Terminal state**: a run status after which nothing more happens
//!   (completed, failed, cancelled, expired, incomplete, requires_action)
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdf_assistant::*;
//! use std::path::Path;
//!
//! # async fn run() -> pdf_assistant::Result<()> {
//! let config = AssistantConfig::from_env()?;
//! let mut session = AssistantSession::from_config(config);
//!
//! session.bind_path(Path::new("paper.pdf")).await?;
//! for answer in session.ask("What is the main result?").await? {
//!     println!("{}", answer);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod llm;

pub use config::AssistantConfig;
pub use document::Document;
pub use error::{AssistantError, Result};
pub use llm::{AssistantHandle, AssistantSession, JobClient, OpenAiClient, PollPolicy, RunPoller};
