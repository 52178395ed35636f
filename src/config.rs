//! Session configuration
//!
//! Credentials, the remote endpoint, what assistant to create and how long to
//! wait for remote jobs. Everything except the API key has a default.

use std::fmt;
use std::time::Duration;

use crate::error::{AssistantError, Result};
use crate::llm::poller::PollPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";
pub const DEFAULT_ASSISTANT_NAME: &str = "PDF Helper";
pub const DEFAULT_INSTRUCTIONS: &str = "You are my assistant who can answer questions from the given pdf. \
Provide equations where relevant. Provide the page number where the answer is taken from.";

#[derive(Clone)]
pub struct AssistantConfig {
    /// Never logged; `Debug` prints it redacted.
    pub api_key: String,
    pub base_url: String,
    /// Passed through verbatim to the service.
    pub model: String,
    pub assistant_name: String,
    pub instructions: String,
    pub poll_policy: PollPolicy,
}

impl AssistantConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            poll_policy: PollPolicy::default(),
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// - OPENAI_API_KEY (required)
    /// - OPENAI_BASE_URL (optional)
    /// - ASSISTANT_MODEL (optional, default: gpt-3.5-turbo-1106)
    /// - ASSISTANT_NAME (optional, default: PDF Helper)
    /// - ASSISTANT_INSTRUCTIONS (optional)
    /// - POLL_INITIAL_DELAY_SECS (optional, default: 5, must be > 0)
    /// - POLL_INTERVAL_SECS (optional, default: 2, must be > 0)
    /// - POLL_MAX_WAIT_SECS (optional, default: 600, 0 disables the bound)
    /// - POLL_MAX_ATTEMPTS (optional, unbounded when unset, must be > 0)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AssistantError::Config("OPENAI_API_KEY environment variable not set".to_string())
            })?;

        let mut config = Self::new(api_key);

        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(model) = lookup("ASSISTANT_MODEL") {
            config.model = model;
        }
        if let Some(name) = lookup("ASSISTANT_NAME") {
            config.assistant_name = name;
        }
        if let Some(instructions) = lookup("ASSISTANT_INSTRUCTIONS") {
            config.instructions = instructions;
        }

        let secs = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|e| {
                        AssistantError::Config(format!("{} must be whole seconds: {}", key, e))
                    })
                })
                .transpose()
        };

        if let Some(value) = secs("POLL_INITIAL_DELAY_SECS")? {
            config.poll_policy.initial_delay = Duration::from_secs(value);
        }
        if let Some(value) = secs("POLL_INTERVAL_SECS")? {
            config.poll_policy.interval = Duration::from_secs(value);
        }
        if let Some(value) = secs("POLL_MAX_WAIT_SECS")? {
            config.poll_policy.max_wait = (value > 0).then(|| Duration::from_secs(value));
        }
        if let Some(raw) = lookup("POLL_MAX_ATTEMPTS") {
            let attempts = raw.trim().parse::<u32>().map_err(|e| {
                AssistantError::Config(format!("POLL_MAX_ATTEMPTS must be a number: {}", e))
            })?;
            config.poll_policy.max_attempts = Some(attempts);
        }

        config.poll_policy.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("assistant_name", &self.assistant_name)
            .field("poll_policy", &self.poll_policy)
            .finish_non_exhaustive()
    }
}
