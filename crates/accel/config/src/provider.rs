//! Configuration providers

use crate::error::{ConfigError, Result};
use crate::model::{
    AcceleratorConfig, AccountsConfig, GlobalConfig, OrganizationConfig, SecurityConfig,
};
use accel_types::AccountId;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Files every configuration directory must contain
pub const MANDATORY_FILES: [&str; 6] = [
    "accounts-config.yaml",
    "global-config.yaml",
    "iam-config.yaml",
    "network-config.yaml",
    "organization-config.yaml",
    "security-config.yaml",
];

/// Source of the engine's configuration
pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> Result<AcceleratorConfig>;
}

/// Reads the configuration from a directory of YAML documents
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    dir: PathBuf,
    management_account_id: Option<AccountId>,
}

impl FileConfigProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            management_account_id: None,
        }
    }

    /// Management account id taking precedence over `accounts-config.yaml`
    pub fn with_management_account_id(mut self, id: Option<AccountId>) -> Self {
        self.management_account_id = id;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of mandatory files absent from the directory
    pub fn missing_files(&self) -> Vec<String> {
        MANDATORY_FILES
            .iter()
            .filter(|name| !self.dir.join(name).is_file())
            .map(|name| name.to_string())
            .collect()
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }
}

impl ConfigProvider for FileConfigProvider {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn load(&self) -> Result<AcceleratorConfig> {
        let missing = self.missing_files();
        if !missing.is_empty() {
            return Err(ConfigError::MissingFiles {
                dir: self.dir.clone(),
                files: missing,
            });
        }

        let global: GlobalConfig = self.read("global-config.yaml")?;
        let accounts: AccountsConfig = self.read("accounts-config.yaml")?;
        let organization: OrganizationConfig = self.read("organization-config.yaml")?;
        let security: SecurityConfig = self.read("security-config.yaml")?;
        let iam: serde_yaml::Value = self.read("iam-config.yaml")?;
        let network: serde_yaml::Value = self.read("network-config.yaml")?;

        let management_account_id = self
            .management_account_id
            .clone()
            .or_else(|| accounts.management_account_id().cloned())
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "accounts-config.yaml does not register an id for the Management account"
                        .into(),
                )
            })?;

        info!(
            home_region = %global.home_region,
            accounts = accounts.all_accounts().count(),
            management_account = %management_account_id,
            "Configuration loaded"
        );

        Ok(AcceleratorConfig {
            management_account_id,
            global,
            accounts,
            organization,
            security,
            iam,
            network,
        })
    }
}
