//! Throttling retry policy
//!
//! Exponential backoff with optional full jitter, applied to throttling-class
//! errors only. Any other error is returned on the first attempt.

use crate::error::{CloudError, Result};
use crate::provider::{
    operations, AssumeRoleRequest, CallerIdentity, CloudProvider, Organization,
    OrganizationAccount, ProviderCredentials,
};
use accel_types::Region;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff configuration for retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Initial backoff delay (milliseconds)
    pub initial_delay_ms: u64,

    /// Maximum backoff delay (milliseconds)
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add jitter to delays
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 150,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Shared retry policy
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Upper bound of the delay before retry number `attempt` (1-based)
    pub fn max_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.config.initial_delay_ms as f64 * self.config.multiplier.powi(exponent);
        let capped = scaled.min(self.config.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Actual delay before retry number `attempt`, with jitter applied
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.max_delay_for(attempt);
        if !self.config.jitter {
            return ceiling;
        }
        let ceiling_ms = ceiling.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling_ms))
    }

    /// Run `f`, retrying throttling errors until the attempt budget is spent
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_throttling() => {
                    if attempt >= max_attempts {
                        return Err(CloudError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            message: error.to_string(),
                        });
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    debug!(operation = operation, error = %error, "Non-retryable error");
                    return Err(error);
                }
            }
        }
    }
}

/// Cloud provider facade applying the shared retry policy to every call
pub struct RetryingCloudProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: CloudProvider> RetryingCloudProvider<P> {
    pub fn new(inner: P, config: BackoffConfig) -> Self {
        Self {
            inner,
            policy: RetryPolicy::new(config),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<P: CloudProvider> CloudProvider for RetryingCloudProvider<P> {
    async fn get_caller_identity(&self) -> Result<CallerIdentity> {
        self.policy
            .run(operations::GET_CALLER_IDENTITY, || {
                self.inner.get_caller_identity()
            })
            .await
    }

    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<ProviderCredentials> {
        self.policy
            .run(operations::ASSUME_ROLE, || self.inner.assume_role(request))
            .await
    }

    async fn list_organization_accounts(&self) -> Result<Vec<OrganizationAccount>> {
        self.policy
            .run(operations::LIST_ACCOUNTS, || {
                self.inner.list_organization_accounts()
            })
            .await
    }

    async fn describe_organization(&self) -> Result<Organization> {
        self.policy
            .run(operations::DESCRIBE_ORGANIZATION, || {
                self.inner.describe_organization()
            })
            .await
    }

    async fn get_parameter(&self, name: &str, region: &Region) -> Result<String> {
        self.policy
            .run(operations::GET_PARAMETER, || {
                self.inner.get_parameter(name, region)
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(BackoffConfig {
            max_attempts,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            jitter: false,
        })
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = policy(10);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_within_ceiling() {
        let policy = RetryPolicy::new(BackoffConfig {
            jitter: true,
            ..BackoffConfig::default()
        });
        for attempt in 1..8 {
            assert!(policy.delay_for(attempt) <= policy.max_delay_for(attempt));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttling_is_retried() {
        let calls = AtomicU32::new(0);
        let result = policy(5)
            .run("Test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CloudError::throttled("Test", "Rate exceeded"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_propagate_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy(5)
            .run("Test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CloudError::provider("Test", "AccessDenied"))
            })
            .await;

        assert!(matches!(result, Err(CloudError::Provider { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy(3)
            .run("Test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CloudError::throttled("Test", "Rate exceeded"))
            })
            .await;

        assert!(matches!(
            result,
            Err(CloudError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
