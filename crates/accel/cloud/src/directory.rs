//! Read-only snapshot of the organization's accounts

use crate::error::Result;
use crate::provider::{CloudProvider, Organization, OrganizationAccount};
use accel_types::AccountId;
use std::collections::HashMap;
use tracing::info;

/// Account directory captured once per invocation
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    organization: Organization,
    accounts: Vec<OrganizationAccount>,
    by_id: HashMap<AccountId, usize>,
    by_name: HashMap<String, usize>,
}

impl AccountDirectory {
    /// Build the directory from already-fetched parts
    pub fn from_parts(organization: Organization, accounts: Vec<OrganizationAccount>) -> Self {
        let mut by_id = HashMap::with_capacity(accounts.len());
        let mut by_name = HashMap::with_capacity(accounts.len());
        for (idx, account) in accounts.iter().enumerate() {
            by_id.insert(account.id.clone(), idx);
            by_name.insert(account.name.to_ascii_lowercase(), idx);
        }
        Self {
            organization,
            accounts,
            by_id,
            by_name,
        }
    }

    /// Load the directory through the cloud provider
    pub async fn load(provider: &dyn CloudProvider) -> Result<Self> {
        let organization = provider.describe_organization().await?;
        let accounts = provider.list_organization_accounts().await?;
        info!(
            organization_id = ?organization.id,
            account_count = accounts.len(),
            "Account directory loaded"
        );
        Ok(Self::from_parts(organization, accounts))
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization.id.as_deref()
    }

    pub fn management_account_id(&self) -> &AccountId {
        &self.organization.management_account_id
    }

    pub fn accounts(&self) -> &[OrganizationAccount] {
        &self.accounts
    }

    pub fn account(&self, id: &AccountId) -> Option<&OrganizationAccount> {
        self.by_id.get(id).map(|&idx| &self.accounts[idx])
    }

    /// Account lookup by name, case-insensitive
    pub fn account_by_name(&self, name: &str) -> Option<&OrganizationAccount> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(|&idx| &self.accounts[idx])
    }

    pub fn account_id(&self, name: &str) -> Option<&AccountId> {
        self.account_by_name(name).map(|a| &a.id)
    }

    /// OU path of an account, `None` when unknown or directly under the root
    pub fn organizational_unit(&self, id: &AccountId) -> Option<&str> {
        self.account(id)
            .and_then(|a| a.organizational_unit.as_deref())
    }

    /// Whether an account sits in `ou` or one of its nested OUs
    pub fn is_in_organizational_unit(&self, id: &AccountId, ou: &str) -> bool {
        match self.organizational_unit(id) {
            Some(path) => path == ou || path.starts_with(&format!("{ou}/")),
            None => false,
        }
    }
}
