//! Scope tiers and deployment-target predicates

use accel_cloud::AccountDirectory;
use accel_types::{AccountId, Region};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OU name that targets the whole organization
pub const ROOT_OU: &str = "Root";

/// Scope tier of a configuration entry. Ordered from farthest to nearest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeTier {
    Root,
    OrganizationalUnit,
    Account,
}

impl fmt::Display for ScopeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeTier::Root => f.write_str("root"),
            ScopeTier::OrganizationalUnit => f.write_str("organizational-unit"),
            ScopeTier::Account => f.write_str("account"),
        }
    }
}

/// Accounts, OUs and regions a configuration object applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentTargets {
    /// Account names or ids
    pub accounts: Vec<String>,
    /// OU paths; [`ROOT_OU`] targets every account
    pub organizational_units: Vec<String>,
    pub exclude_regions: Vec<Region>,
    /// Account names or ids
    pub exclude_accounts: Vec<String>,
}

impl DeploymentTargets {
    /// The nearest tier through which these targets reach the environment,
    /// or `None` if they do not apply to it at all.
    pub fn scope_for(
        &self,
        directory: &AccountDirectory,
        account_id: &AccountId,
        region: &Region,
    ) -> Option<ScopeTier> {
        if self.exclude_regions.contains(region) {
            return None;
        }
        if self
            .exclude_accounts
            .iter()
            .any(|a| names_account(directory, a, account_id))
        {
            return None;
        }

        if self
            .accounts
            .iter()
            .any(|a| names_account(directory, a, account_id))
        {
            return Some(ScopeTier::Account);
        }

        if self
            .organizational_units
            .iter()
            .filter(|ou| ou.as_str() != ROOT_OU)
            .any(|ou| directory.is_in_organizational_unit(account_id, ou))
        {
            return Some(ScopeTier::OrganizationalUnit);
        }

        if self.organizational_units.iter().any(|ou| ou == ROOT_OU) {
            return Some(ScopeTier::Root);
        }

        None
    }

    pub fn matches(
        &self,
        directory: &AccountDirectory,
        account_id: &AccountId,
        region: &Region,
    ) -> bool {
        self.scope_for(directory, account_id, region).is_some()
    }
}

fn names_account(directory: &AccountDirectory, reference: &str, account_id: &AccountId) -> bool {
    if reference == account_id.as_str() {
        return true;
    }
    directory.account_id(reference) == Some(account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_cloud::{Organization, OrganizationAccount};

    fn directory() -> AccountDirectory {
        AccountDirectory::from_parts(
            Organization {
                id: Some("o-example".into()),
                management_account_id: AccountId::new("111111111111"),
            },
            vec![
                OrganizationAccount {
                    id: AccountId::new("222222222222"),
                    name: "Audit".into(),
                    email: "audit@example.com".into(),
                    organizational_unit: Some("Security".into()),
                },
                OrganizationAccount {
                    id: AccountId::new("333333333333"),
                    name: "Dev".into(),
                    email: "dev@example.com".into(),
                    organizational_unit: Some("Workloads/Dev".into()),
                },
            ],
        )
    }

    #[test]
    fn test_scope_tiers() {
        let dir = directory();
        let region = Region::new("us-east-1");
        let audit = AccountId::new("222222222222");

        let by_name = DeploymentTargets {
            accounts: vec!["audit".into()],
            ..Default::default()
        };
        assert_eq!(by_name.scope_for(&dir, &audit, &region), Some(ScopeTier::Account));

        let by_ou = DeploymentTargets {
            organizational_units: vec!["Workloads".into(), ROOT_OU.into()],
            ..Default::default()
        };
        assert_eq!(
            by_ou.scope_for(&dir, &AccountId::new("333333333333"), &region),
            Some(ScopeTier::OrganizationalUnit)
        );
        assert_eq!(by_ou.scope_for(&dir, &audit, &region), Some(ScopeTier::Root));

        let nothing = DeploymentTargets {
            organizational_units: vec!["Infrastructure".into()],
            ..Default::default()
        };
        assert_eq!(nothing.scope_for(&dir, &audit, &region), None);
    }

    #[test]
    fn test_exclusions_win() {
        let dir = directory();
        let audit = AccountId::new("222222222222");
        let targets = DeploymentTargets {
            organizational_units: vec![ROOT_OU.into()],
            exclude_regions: vec![Region::new("eu-west-1")],
            exclude_accounts: vec!["222222222222".into()],
            ..Default::default()
        };
        assert!(!targets.matches(&dir, &audit, &Region::new("us-east-1")));
        assert!(!targets.matches(
            &dir,
            &AccountId::new("333333333333"),
            &Region::new("eu-west-1")
        ));
        assert!(targets.matches(
            &dir,
            &AccountId::new("333333333333"),
            &Region::new("us-east-1")
        ));
    }
}
