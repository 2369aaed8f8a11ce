//! Synthesizer selection
//!
//! Picks the identity and the artifact store a deployment unit is materialized
//! with. Role selection and storage selection are independent.

use accel_cloud::role_arn;
use accel_types::{
    AcceleratorStage, AccountId, Partition, Region, SynthesizerConfig, SynthesizerStrategy,
};
use serde::{Deserialize, Serialize};

/// Global flags that influence synthesizer selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFlags {
    /// Role name used instead of the computed deployment role, after bootstrap
    pub custom_deployment_role: Option<String>,
    pub use_management_access_role: bool,
    pub centralize_buckets: bool,
}

/// Computes a [`SynthesizerConfig`] per (account, region, stage)
#[derive(Debug, Clone)]
pub struct SynthesizerSelector {
    partition: Partition,
    prefix: String,
    bucket_prefix: String,
    management_account_id: AccountId,
    home_region: Region,
    flags: GlobalFlags,
}

impl SynthesizerSelector {
    pub fn new(
        partition: Partition,
        prefix: impl Into<String>,
        management_account_id: AccountId,
        home_region: Region,
        flags: GlobalFlags,
    ) -> Self {
        let prefix = prefix.into();
        Self {
            partition,
            bucket_prefix: prefix.to_lowercase(),
            prefix,
            management_account_id,
            home_region,
            flags,
        }
    }

    pub fn flags(&self) -> &GlobalFlags {
        &self.flags
    }

    pub fn select(
        &self,
        account_id: &AccountId,
        region: &Region,
        stage: &str,
    ) -> SynthesizerConfig {
        let (strategy, role_arn) = self.select_role(account_id, stage);
        let (asset_bucket_name, asset_bucket_prefix) = self.select_storage(account_id, region);
        SynthesizerConfig {
            strategy,
            role_arn,
            asset_bucket_name: Some(asset_bucket_name),
            asset_bucket_prefix,
        }
    }

    // First match wins
    fn select_role(
        &self,
        account_id: &AccountId,
        stage: &str,
    ) -> (SynthesizerStrategy, Option<String>) {
        if let Some(custom) = &self.flags.custom_deployment_role {
            if !AcceleratorStage::is_pre_bootstrap_name(stage) {
                return (
                    SynthesizerStrategy::CustomRole,
                    Some(role_arn(self.partition, account_id, custom)),
                );
            }
        }

        if self.flags.use_management_access_role {
            return (SynthesizerStrategy::AmbientCredentials, None);
        }

        let default_role = format!("{}-Deployment-Role", self.prefix);
        (
            SynthesizerStrategy::DefaultRole,
            Some(role_arn(self.partition, account_id, &default_role)),
        )
    }

    fn select_storage(&self, account_id: &AccountId, region: &Region) -> (String, Option<String>) {
        if self.flags.centralize_buckets {
            (
                self.bucket_name(&self.management_account_id, &self.home_region),
                Some(format!("{account_id}/")),
            )
        } else {
            (self.bucket_name(account_id, region), None)
        }
    }

    fn bucket_name(&self, account_id: &AccountId, region: &Region) -> String {
        format!("cdk-{}-assets-{account_id}-{region}", self.bucket_prefix)
    }
}
