//! Cloud provider interface

use crate::error::Result;
use accel_types::{AccountId, Region};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operation names used in logs, errors and call accounting
pub mod operations {
    pub const GET_CALLER_IDENTITY: &str = "GetCallerIdentity";
    pub const ASSUME_ROLE: &str = "AssumeRole";
    pub const LIST_ACCOUNTS: &str = "ListAccounts";
    pub const DESCRIBE_ORGANIZATION: &str = "DescribeOrganization";
    pub const GET_PARAMETER: &str = "GetParameter";
}

/// Identity of the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub account: AccountId,
    pub arn: String,
    pub user_id: Option<String>,
}

impl CallerIdentity {
    /// The IAM role ARN behind an assumed-role session ARN, if this is one.
    ///
    /// `arn:aws:sts::111:assumed-role/Role/session` becomes `arn:aws:iam::111:role/Role`.
    pub fn role_arn(&self) -> Option<String> {
        let mut parts = self.arn.splitn(6, ':');
        let (_, partition, service, _, account, resource) = (
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
        );
        if service != "sts" {
            return None;
        }
        let role_name = resource.strip_prefix("assumed-role/")?.split('/').next()?;
        Some(format!("arn:{partition}:iam::{account}:role/{role_name}"))
    }

    /// Whether this session already runs as `role_arn`
    pub fn is_role(&self, role_arn: &str) -> bool {
        self.arn == role_arn || self.role_arn().as_deref() == Some(role_arn)
    }
}

/// Assume-role call parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub region: Region,
    pub duration_seconds: Option<u32>,
}

/// Raw credentials as returned by the provider. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

/// An account of the organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationAccount {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    /// OU path, e.g. `Workloads/Prod`. `None` for accounts directly under the root.
    pub organizational_unit: Option<String>,
}

/// Organization metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Option<String>,
    pub management_account_id: AccountId,
}

/// Cloud control-plane operations used by the engine
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Identity of the current session
    async fn get_caller_identity(&self) -> Result<CallerIdentity>;

    /// Assume a role and return the raw provider credentials
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<ProviderCredentials>;

    /// List every account in the organization
    async fn list_organization_accounts(&self) -> Result<Vec<OrganizationAccount>>;

    /// Describe the organization
    async fn describe_organization(&self) -> Result<Organization>;

    /// Read a parameter value; missing parameters yield `CloudError::ParameterNotFound`
    async fn get_parameter(&self, name: &str, region: &Region) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
