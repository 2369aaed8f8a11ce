//! Cross-account credential resolution
//!
//! Resolves the credentials used for an (account, region) environment by assuming
//! a role there, unless the current session already runs as that role.

use crate::error::{CloudError, Result};
use crate::provider::{AssumeRoleRequest, CloudProvider};
use accel_types::{AccountId, AssumedCredential, Partition, Region};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Session name used when the caller supplies none
pub const DEFAULT_SESSION_NAME: &str = "AcceleratorAssumeRoleSession";

/// Build an IAM role ARN
pub fn role_arn(partition: Partition, account_id: &AccountId, role_name: &str) -> String {
    format!("arn:{partition}:iam::{account_id}:role/{role_name}")
}

/// Input of an assume-role resolution
///
/// Exactly one of `role_arn` or `role_name` (together with `partition`) must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleInput {
    pub account_id: AccountId,
    pub region: Region,
    pub role_arn: Option<String>,
    pub role_name: Option<String>,
    pub partition: Option<Partition>,
    pub session_name: Option<String>,
}

impl AssumeRoleInput {
    pub fn with_role_arn(
        account_id: AccountId,
        region: Region,
        role_arn: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            region,
            role_arn: Some(role_arn.into()),
            role_name: None,
            partition: None,
            session_name: None,
        }
    }

    pub fn with_role_name(
        account_id: AccountId,
        region: Region,
        role_name: impl Into<String>,
        partition: Partition,
    ) -> Self {
        Self {
            account_id,
            region,
            role_arn: None,
            role_name: Some(role_name.into()),
            partition: Some(partition),
            session_name: None,
        }
    }

    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// The ARN of the role to assume
    pub fn target_role_arn(&self) -> Result<String> {
        match (&self.role_arn, &self.role_name) {
            (Some(_), Some(_)) => Err(CloudError::InvalidInput(
                "both role ARN and role name were provided, supply exactly one".into(),
            )),
            (None, None) => Err(CloudError::InvalidInput(
                "neither role ARN nor role name was provided".into(),
            )),
            (Some(arn), None) => Ok(arn.clone()),
            (None, Some(name)) => {
                let partition = self.partition.ok_or_else(|| {
                    CloudError::InvalidInput(format!(
                        "role name {name} was provided without a partition"
                    ))
                })?;
                Ok(role_arn(partition, &self.account_id, name))
            }
        }
    }
}

/// Resolves assumed credentials through the cloud provider
///
/// Results are not cached: every call resolves again.
#[derive(Clone)]
pub struct CredentialResolver {
    provider: Arc<dyn CloudProvider>,
}

impl CredentialResolver {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }

    /// Assume the target role.
    ///
    /// Returns `None` when the current session already runs as the target role,
    /// meaning the ambient credentials should be used as they are.
    #[instrument(skip(self, input), fields(account_id = %input.account_id, region = %input.region))]
    pub async fn assume(&self, input: &AssumeRoleInput) -> Result<Option<AssumedCredential>> {
        let target = input.target_role_arn()?;

        let caller = self.provider.get_caller_identity().await?;
        if caller.is_role(&target) {
            info!(role_arn = %target, "Already running as target role, assume-role not required");
            return Ok(None);
        }

        let request = AssumeRoleRequest {
            role_arn: target.clone(),
            session_name: input
                .session_name
                .clone()
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            region: input.region.clone(),
            duration_seconds: None,
        };
        let raw = self.provider.assume_role(&request).await?;

        let access_key_id = raw.access_key_id.ok_or_else(|| CloudError::MalformedCredentials {
            role_arn: target.clone(),
            field: "AccessKeyId",
        })?;
        let secret_access_key =
            raw.secret_access_key
                .ok_or_else(|| CloudError::MalformedCredentials {
                    role_arn: target.clone(),
                    field: "SecretAccessKey",
                })?;
        let session_token = raw.session_token.ok_or_else(|| CloudError::MalformedCredentials {
            role_arn: target.clone(),
            field: "SessionToken",
        })?;

        debug!(role_arn = %target, expiration = ?raw.expiration, "Role assumed");

        Ok(Some(AssumedCredential {
            access_key_id,
            secret_access_key,
            session_token,
            expiration: raw.expiration,
        }))
    }
}
