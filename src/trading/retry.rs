use std::time::Duration;

/// Bounded-retry policy shared by the transaction pipeline. Attempts are
/// numbered from 1; after the final attempt the caller gives up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn is_final(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    pub async fn wait(&self) {
        tokio::time::sleep(self.backoff).await;
    }
}

impl Default for RetryPolicy {
    /// Transaction submission default: 5 attempts, 2s between them.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_attempt_boundary() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert!(!policy.is_final(4));
        assert!(policy.is_final(5));
        assert!(policy.is_final(6));
    }
}
