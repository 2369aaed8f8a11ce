//! Invocation context and parameters

use crate::ids::{AccountId, Partition, Region, TypesError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resource-name prefix used when none is supplied
pub const DEFAULT_PREFIX: &str = "Accelerator";

/// Scope of the current invocation
///
/// Created once per run and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContext {
    pub stage: Option<String>,
    pub account_id: Option<AccountId>,
    pub region: Option<Region>,
}

impl DeploymentContext {
    /// Context for a broad synthesis of every stage
    pub fn all_stages() -> Self {
        Self::default()
    }

    /// Context scoped to a single stage
    pub fn for_stage(stage: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            account_id: None,
            region: None,
        }
    }

    /// Narrow the context to one account/region environment
    pub fn with_environment(mut self, account_id: AccountId, region: Region) -> Self {
        self.account_id = Some(account_id);
        self.region = Some(region);
        self
    }
}

/// Parameters of a single invocation (CLI or programmatic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationParameters {
    pub partition: Option<Partition>,
    pub region: Option<Region>,
    pub config_dir: Option<PathBuf>,
    pub stage: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub use_existing_role: bool,
    #[serde(default)]
    pub dry_run: bool,
    pub account_id: Option<AccountId>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for InvocationParameters {
    fn default() -> Self {
        Self {
            partition: None,
            region: None,
            config_dir: None,
            stage: None,
            prefix: default_prefix(),
            use_existing_role: false,
            dry_run: false,
            account_id: None,
        }
    }
}

impl InvocationParameters {
    /// Check the mandatory parameters and derive the invocation context
    pub fn validate(&self) -> Result<DeploymentContext, TypesError> {
        if self.partition.is_none() {
            return Err(TypesError::MissingParameter("partition"));
        }
        let region = self
            .region
            .clone()
            .ok_or(TypesError::MissingParameter("region"))?;
        if self.config_dir.is_none() {
            return Err(TypesError::MissingParameter("config_dir"));
        }

        let mut context = DeploymentContext {
            stage: self.stage.clone(),
            account_id: None,
            region: None,
        };
        if let Some(account_id) = &self.account_id {
            context = context.with_environment(account_id.clone(), region);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        let params = InvocationParameters::default();
        assert_eq!(params.prefix, "Accelerator");
        assert!(!params.dry_run);
    }

    #[test]
    fn test_validate_reports_missing_parameter() {
        let params = InvocationParameters {
            partition: Some(Partition::Aws),
            ..Default::default()
        };
        assert_eq!(
            params.validate().unwrap_err(),
            TypesError::MissingParameter("region")
        );
    }

    #[test]
    fn test_validate_builds_context() {
        let params = InvocationParameters {
            partition: Some(Partition::Aws),
            region: Some(Region::new("us-east-1")),
            config_dir: Some(PathBuf::from("/tmp/config")),
            stage: Some("security".into()),
            account_id: Some(AccountId::new("222222222222")),
            ..Default::default()
        };
        let context = params.validate().unwrap();
        assert_eq!(context.stage.as_deref(), Some("security"));
        assert_eq!(context.account_id, Some(AccountId::new("222222222222")));
        assert_eq!(context.region, Some(Region::new("us-east-1")));
    }
}
