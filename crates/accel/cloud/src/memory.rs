//! In-memory cloud provider
//!
//! Suitable for development, planning runs and tests. Accounts, parameters and
//! role responses are configured up front; throttling can be scripted per operation.

use crate::error::{CloudError, Result};
use crate::provider::{
    operations, AssumeRoleRequest, CallerIdentity, CloudProvider, Organization,
    OrganizationAccount, ProviderCredentials,
};
use accel_types::{AccountId, Region};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

/// In-memory cloud provider
pub struct InMemoryCloudProvider {
    caller: CallerIdentity,
    organization: Organization,
    accounts: Vec<OrganizationAccount>,
    parameters: DashMap<(String, Region), String>,
    role_credentials: DashMap<String, ProviderCredentials>,
    throttles: DashMap<&'static str, u32>,
    calls: DashMap<&'static str, u32>,
}

impl InMemoryCloudProvider {
    /// Provider for an organization managed from `management_account_id`.
    ///
    /// The caller defaults to an IAM user in the management account.
    pub fn new(management_account_id: AccountId) -> Self {
        Self {
            caller: CallerIdentity {
                arn: format!("arn:aws:iam::{management_account_id}:user/accelerator"),
                account: management_account_id.clone(),
                user_id: None,
            },
            organization: Organization {
                id: None,
                management_account_id,
            },
            accounts: Vec::new(),
            parameters: DashMap::new(),
            role_credentials: DashMap::new(),
            throttles: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    pub fn with_caller_arn(mut self, arn: impl Into<String>) -> Self {
        self.caller.arn = arn.into();
        self
    }

    pub fn with_organization_id(mut self, id: impl Into<String>) -> Self {
        self.organization.id = Some(id.into());
        self
    }

    pub fn with_account(mut self, account: OrganizationAccount) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_parameter(
        self,
        name: impl Into<String>,
        region: Region,
        value: impl Into<String>,
    ) -> Self {
        self.parameters.insert((name.into(), region), value.into());
        self
    }

    /// Fix the response returned when `role_arn` is assumed
    pub fn with_role_credentials(
        self,
        role_arn: impl Into<String>,
        credentials: ProviderCredentials,
    ) -> Self {
        self.role_credentials.insert(role_arn.into(), credentials);
        self
    }

    /// Fail the next `times` calls of `operation` with a throttling error
    pub fn throttle(&self, operation: &'static str, times: u32) {
        self.throttles.insert(operation, times);
    }

    /// Number of calls made to `operation`, throttled ones included
    pub fn call_count(&self, operation: &str) -> u32 {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        *self.calls.entry(operation).or_insert(0) += 1;

        if let Some(mut remaining) = self.throttles.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CloudError::throttled(operation, "Rate exceeded"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CloudProvider for InMemoryCloudProvider {
    async fn get_caller_identity(&self) -> Result<CallerIdentity> {
        self.record(operations::GET_CALLER_IDENTITY)?;
        Ok(self.caller.clone())
    }

    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<ProviderCredentials> {
        self.record(operations::ASSUME_ROLE)?;

        if let Some(credentials) = self.role_credentials.get(&request.role_arn) {
            return Ok(credentials.clone());
        }

        let session = &request.session_name;
        Ok(ProviderCredentials {
            access_key_id: Some(format!("ASIA{}", session.to_ascii_uppercase())),
            secret_access_key: Some(format!("memory-secret-{session}")),
            session_token: Some(format!("memory-token-{}", request.role_arn)),
            expiration: Some(Utc::now() + chrono::Duration::hours(1)),
        })
    }

    async fn list_organization_accounts(&self) -> Result<Vec<OrganizationAccount>> {
        self.record(operations::LIST_ACCOUNTS)?;
        Ok(self.accounts.clone())
    }

    async fn describe_organization(&self) -> Result<Organization> {
        self.record(operations::DESCRIBE_ORGANIZATION)?;
        Ok(self.organization.clone())
    }

    async fn get_parameter(&self, name: &str, region: &Region) -> Result<String> {
        self.record(operations::GET_PARAMETER)?;
        self.parameters
            .get(&(name.to_string(), region.clone()))
            .map(|v| v.clone())
            .ok_or_else(|| CloudError::ParameterNotFound(name.to_string()))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_throttling() {
        let provider = InMemoryCloudProvider::new(AccountId::new("111111111111"));
        provider.throttle(operations::LIST_ACCOUNTS, 1);

        assert!(provider
            .list_organization_accounts()
            .await
            .unwrap_err()
            .is_throttling());
        assert!(provider.list_organization_accounts().await.is_ok());
        assert_eq!(provider.call_count(operations::LIST_ACCOUNTS), 2);
    }

    #[tokio::test]
    async fn test_missing_parameter() {
        let provider = InMemoryCloudProvider::new(AccountId::new("111111111111"))
            .with_parameter("/present", Region::new("us-east-1"), "value");

        let region = Region::new("us-east-1");
        assert_eq!(provider.get_parameter("/present", &region).await.unwrap(), "value");
        assert_eq!(
            provider.get_parameter("/absent", &region).await.unwrap_err(),
            CloudError::ParameterNotFound("/absent".into())
        );
    }
}
