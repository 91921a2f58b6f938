use std::future::Future;
use std::time::Duration;
use tokio::time::{error::Elapsed, Instant};

/// Optional job-wide deadline shared by every remote call
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Option<Duration>) -> Self {
        Self(timeout.map(|timeout| Instant::now() + timeout))
    }

    pub fn is_elapsed(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Run `fut` until it finishes or the deadline passes
    pub async fn bound<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        match self.0 {
            Some(at) => tokio::time::timeout_at(at, fut).await,
            None => Ok(fut.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bound_elapses() {
        let deadline = Deadline::after(Some(Duration::from_secs(1)));
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert!(deadline.bound(slow).await.is_err());
        assert!(deadline.is_elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bound_passes_fast_calls() {
        let deadline = Deadline::after(Some(Duration::from_secs(5)));
        assert_eq!(deadline.bound(async { 7 }).await.unwrap(), 7);
        assert!(!deadline.is_elapsed());
    }

    #[tokio::test]
    async fn test_no_deadline_never_elapses() {
        let deadline = Deadline::none();
        assert!(deadline.bound(async { "done" }).await.is_ok());
        assert!(!deadline.is_elapsed());
    }
}
