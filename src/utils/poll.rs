// Bounded polling for asynchronous external jobs

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{AppError, AppResult};

/// Status reported by an external job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Processing,
    Completed,
    /// Terminal failure with the service-reported message
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 300,
        }
    }
}

/// Call `check` until the job reaches a terminal status.
///
/// Returns the number of status checks performed. A `Failed` status becomes
/// [`AppError::JobFailed`]; running out of attempts becomes
/// [`AppError::JobTimedOut`]; cancellation is honoured before every check and
/// during every sleep.
pub async fn poll_until_complete<F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut check: F,
) -> AppResult<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<JobStatus>>,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        attempt += 1;
        let status = check().await?;
        debug!(attempt, status = ?status, "Polled job status");

        match status {
            JobStatus::Completed => return Ok(attempt),
            JobStatus::Failed(message) => return Err(AppError::JobFailed(message)),
            JobStatus::Submitted | JobStatus::Processing => {}
        }

        if attempt >= policy.max_attempts {
            return Err(AppError::JobTimedOut(attempt));
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            _ = sleep(policy.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    /// Replays `statuses` in order, repeating the last one
    fn scripted(statuses: Vec<JobStatus>) -> (Mutex<Vec<JobStatus>>, AtomicU32) {
        let mut reversed = statuses;
        reversed.reverse();
        (Mutex::new(reversed), AtomicU32::new(0))
    }

    fn next_status(script: &Mutex<Vec<JobStatus>>, calls: &AtomicU32) -> JobStatus {
        calls.fetch_add(1, Ordering::SeqCst);
        let mut remaining = script.lock().unwrap();
        if remaining.len() > 1 {
            remaining.pop().unwrap()
        } else {
            remaining[0].clone()
        }
    }

    #[tokio::test]
    async fn test_polls_until_completed() {
        let (script, calls) = scripted(vec![
            JobStatus::Submitted,
            JobStatus::Processing,
            JobStatus::Processing,
            JobStatus::Completed,
        ]);
        let cancel = CancellationToken::new();

        let attempts = poll_until_complete(&fast_policy(10), &cancel, || {
            let status = next_status(&script, &calls);
            async move { Ok(status) }
        })
        .await
        .unwrap();

        assert_eq!(attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_status_surfaces_message() {
        let (script, calls) = scripted(vec![
            JobStatus::Processing,
            JobStatus::Failed("quota exceeded".to_string()),
        ]);
        let cancel = CancellationToken::new();

        let err = poll_until_complete(&fast_policy(10), &cancel, || {
            let status = next_status(&script, &calls);
            async move { Ok(status) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::JobFailed(ref m) if m == "quota exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (script, calls) = scripted(vec![JobStatus::Processing]);
        let cancel = CancellationToken::new();

        let err = poll_until_complete(&fast_policy(3), &cancel, || {
            let status = next_status(&script, &calls);
            async move { Ok(status) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::JobTimedOut(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_polling() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let err = poll_until_complete(&fast_policy(10), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(JobStatus::Processing) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let policy = PollPolicy {
            interval: Duration::from_secs(3600),
            max_attempts: 10,
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = poll_until_complete(&policy, &cancel, || async { Ok(JobStatus::Processing) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_check_error_propagates() {
        let cancel = CancellationToken::new();
        let err = poll_until_complete(&fast_policy(10), &cancel, || async {
            Err(AppError::LLMApi("503 from upstream".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed(String::new()).is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Submitted.is_terminal());
    }
}
