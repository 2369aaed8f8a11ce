//! Configuration documents

use accel_cloud::OrganizationAccount;
use accel_policy::ScopedPolicySet;
use accel_types::{AccountId, Region};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name of the mandatory management account
pub const MANAGEMENT_ACCOUNT_NAME: &str = "Management";

/// Every document of a configuration directory
#[derive(Debug, Clone)]
pub struct AcceleratorConfig {
    /// Resolved from the loader's override or from `accounts-config.yaml`
    pub management_account_id: AccountId,
    pub global: GlobalConfig,
    pub accounts: AccountsConfig,
    pub organization: OrganizationConfig,
    pub security: SecurityConfig,
    pub iam: serde_yaml::Value,
    pub network: serde_yaml::Value,
}

/// `global-config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub home_region: Region,
    #[serde(default)]
    pub enabled_regions: Vec<Region>,
    #[serde(default = "default_management_access_role")]
    pub management_account_access_role: String,
    #[serde(default)]
    pub cdk_options: CdkOptions,
    #[serde(default = "default_termination_protection")]
    pub termination_protection: bool,
}

fn default_management_access_role() -> String {
    "AWSControlTowerExecution".to_string()
}

fn default_termination_protection() -> bool {
    true
}

impl GlobalConfig {
    /// Enabled regions with the home region first and no duplicates
    pub fn regions(&self) -> Vec<Region> {
        let mut regions = vec![self.home_region.clone()];
        for region in &self.enabled_regions {
            if !regions.contains(region) {
                regions.push(region.clone());
            }
        }
        regions
    }
}

/// Deployment-unit synthesis options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CdkOptions {
    pub centralize_buckets: bool,
    pub use_management_access_role: bool,
    /// Role name used in every account instead of the computed deployment role
    pub custom_deployment_role: Option<String>,
}

/// `accounts-config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountsConfig {
    pub mandatory_accounts: Vec<AccountConfig>,
    pub workload_accounts: Vec<AccountConfig>,
    pub account_ids: Vec<AccountIdConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub name: String,
    pub email: String,
    pub organizational_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdConfig {
    pub email: String,
    pub account_id: AccountId,
}

impl AccountsConfig {
    pub fn all_accounts(&self) -> impl Iterator<Item = &AccountConfig> {
        self.mandatory_accounts
            .iter()
            .chain(self.workload_accounts.iter())
    }

    /// Account id registered for an email, case-insensitive
    pub fn account_id_for_email(&self, email: &str) -> Option<&AccountId> {
        self.account_ids
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .map(|a| &a.account_id)
    }

    pub fn management_account_id(&self) -> Option<&AccountId> {
        self.mandatory_accounts
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(MANAGEMENT_ACCOUNT_NAME))
            .and_then(|a| self.account_id_for_email(&a.email))
    }

    /// Configured accounts that already have an id. Accounts still to be created are skipped.
    pub fn organization_accounts(&self) -> Vec<OrganizationAccount> {
        self.all_accounts()
            .filter_map(|account| match self.account_id_for_email(&account.email) {
                Some(id) => Some(OrganizationAccount {
                    id: id.clone(),
                    name: account.name.clone(),
                    email: account.email.clone(),
                    organizational_unit: account.organizational_unit.clone(),
                }),
                None => {
                    warn!(account = %account.name, "Account has no id yet, skipping");
                    None
                }
            })
            .collect()
    }
}

/// `organization-config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationConfig {
    pub enable: bool,
    pub organizational_units: Vec<OrganizationalUnitConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnitConfig {
    pub name: String,
}

/// `security-config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    pub resource_policy_enforcement: Option<ResourcePolicyEnforcementConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcePolicyEnforcementConfig {
    pub enable: bool,
    pub mandatory_resource_types: Vec<String>,
    pub policy_sets: Vec<ScopedPolicySet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_put_home_first() {
        let global = GlobalConfig {
            home_region: Region::new("us-east-1"),
            enabled_regions: vec![Region::new("us-west-2"), Region::new("us-east-1")],
            management_account_access_role: default_management_access_role(),
            cdk_options: CdkOptions::default(),
            termination_protection: default_termination_protection(),
        };
        assert_eq!(
            global.regions(),
            vec![Region::new("us-east-1"), Region::new("us-west-2")]
        );
    }

    #[test]
    fn test_accounts_join_ids_by_email() {
        let accounts: AccountsConfig = serde_yaml::from_str(
            r#"
mandatoryAccounts:
  - name: Management
    email: Root@Example.com
  - name: Audit
    email: audit@example.com
    organizationalUnit: Security
workloadAccounts:
  - name: Pending
    email: pending@example.com
    organizationalUnit: Workloads
accountIds:
  - email: root@example.com
    accountId: "111111111111"
  - email: audit@example.com
    accountId: "222222222222"
"#,
        )
        .unwrap();

        assert_eq!(
            accounts.management_account_id(),
            Some(&AccountId::new("111111111111"))
        );
        let org_accounts = accounts.organization_accounts();
        assert_eq!(org_accounts.len(), 2);
        assert_eq!(org_accounts[1].organizational_unit.as_deref(), Some("Security"));
    }
}
