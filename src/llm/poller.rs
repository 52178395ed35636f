use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use tokio::time::{sleep, Instant};

use crate::error::{AssistantError, Result};
use crate::llm::client::JobClient;
use crate::llm::types::{Pollable, Run, VectorStore};

/// How long to wait between status checks, and when to give up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait after the first non-terminal observation. Remote jobs rarely
    /// finish within the first couple of seconds.
    pub initial_delay: Duration,
    /// Wait after every later non-terminal observation.
    pub interval: Duration,
    /// Total time budget measured from the first status check.
    pub max_wait: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(2),
            max_wait: Some(Duration::from_secs(600)),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn unbounded(initial_delay: Duration, interval: Duration) -> Self {
        Self {
            initial_delay,
            interval,
            max_wait: None,
            max_attempts: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Zero waits would hammer the service with back-to-back status checks.
    pub fn validate(&self) -> Result<()> {
        if self.initial_delay.is_zero() {
            return Err(AssistantError::Config(
                "poll initial delay must be greater than zero".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(AssistantError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(AssistantError::Config(
                "poll max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Calls `check` until it reports a terminal state or the policy runs out.
///
/// A terminal value is returned as soon as it is observed, whatever it is;
/// deciding whether it counts as success is left to the caller.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, label: &str, mut check: F) -> Result<T>
where
    T: Pollable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.validate()?;

    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        let current = check().await?;
        attempts += 1;

        debug!(
            "{} status check #{}: {}",
            label,
            attempts,
            current.status_label()
        );

        if current.is_terminal() {
            return Ok(current);
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(AssistantError::Timeout {
                waited: started.elapsed(),
                attempts,
            });
        }

        let mut delay = if attempts == 1 {
            policy.initial_delay
        } else {
            policy.interval
        };

        if let Some(max_wait) = policy.max_wait {
            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                return Err(AssistantError::Timeout {
                    waited: elapsed,
                    attempts,
                });
            }
            delay = delay.min(max_wait - elapsed);
        }

        sleep(delay).await;
    }
}

/// Waits for runs (and vector store ingestion) to reach a terminal state.
pub struct RunPoller<'a, C: JobClient + ?Sized> {
    client: &'a C,
    policy: PollPolicy,
}

impl<'a, C: JobClient + ?Sized> RunPoller<'a, C> {
    pub fn new(client: &'a C, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn await_completion(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let label = format!("run {}", run_id);
        let run = poll_until(&self.policy, &label, || {
            self.client.get_run(thread_id, run_id)
        })
        .await?;

        info!("Run {} reached terminal status '{}'", run_id, run.status);
        Ok(run)
    }

    pub async fn await_vector_store(&self, vector_store_id: &str) -> Result<VectorStore> {
        let label = format!("vector store {}", vector_store_id);
        let store = poll_until(&self.policy, &label, || {
            self.client.get_vector_store(vector_store_id)
        })
        .await?;

        info!(
            "Vector store {} ingestion finished with status '{}' ({} of {} files)",
            vector_store_id, store.status, store.file_counts.completed, store.file_counts.total
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Step {
        status: &'static str,
        terminal: bool,
    }

    impl Pollable for Step {
        fn is_terminal(&self) -> bool {
            self.terminal
        }

        fn status_label(&self) -> String {
            self.status.to_string()
        }
    }

    fn step(status: &'static str) -> Step {
        let terminal = !matches!(status, "queued" | "in_progress");
        Step { status, terminal }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_initial_delay_then_interval() {
        let policy = PollPolicy::unbounded(Duration::from_secs(5), Duration::from_secs(2));
        let started = Instant::now();
        let seen = Mutex::new(Vec::new());
        let script = Mutex::new(vec!["queued", "in_progress", "in_progress", "completed"]);

        let result = poll_until(&policy, "test", || {
            seen.lock().unwrap().push(started.elapsed());
            let next = script.lock().unwrap().remove(0);
            async move { Ok::<_, AssistantError>(step(next)) }
        })
        .await
        .unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Duration::from_secs(0),
                Duration::from_secs(5),
                Duration::from_secs(7),
                Duration::from_secs(9),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_on_first_check_returns_immediately() {
        let policy = PollPolicy::default();
        let started = Instant::now();
        let calls = AtomicU32::new(0);

        let result = poll_until(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AssistantError>(step("completed")) }
        })
        .await
        .unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_bounds_polling() {
        let policy = PollPolicy::unbounded(Duration::from_secs(5), Duration::from_secs(2))
            .with_max_wait(Duration::from_secs(10));
        let calls = AtomicU32::new(0);

        let err = poll_until(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AssistantError>(step("in_progress")) }
        })
        .await
        .unwrap_err();

        // Checks at 0s, 5s, 7s, 9s and a final one clamped to the 10s deadline.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match err {
            AssistantError::Timeout { waited, attempts } => {
                assert_eq!(waited, Duration::from_secs(10));
                assert_eq!(attempts, 5);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_bounds_polling() {
        let policy = PollPolicy::unbounded(Duration::from_secs(1), Duration::from_secs(1))
            .with_max_attempts(3);
        let calls = AtomicU32::new(0);

        let err = poll_until(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AssistantError>(step("queued")) }
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_error_propagates_without_retry() {
        let policy = PollPolicy::default();
        let calls = AtomicU32::new(0);

        let err = poll_until::<Step, _, _>(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AssistantError::Api {
                    status: 404,
                    message: "No run found".to_string(),
                })
            }
        })
        .await
        .unwrap_err();

        assert!(err.is_remote_service_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_policy_is_rejected_before_polling() {
        let policy = PollPolicy::unbounded(Duration::ZERO, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let err = poll_until(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AssistantError>(step("in_progress")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AssistantError::Config(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_policy() {
        assert!(PollPolicy::default().validate().is_ok());
        assert!(PollPolicy::unbounded(Duration::from_secs(1), Duration::ZERO)
            .validate()
            .is_err());
        assert!(PollPolicy::unbounded(Duration::ZERO, Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(PollPolicy::default().with_max_attempts(0).validate().is_err());
        assert!(PollPolicy::default().with_max_attempts(1).validate().is_ok());
    }
}
