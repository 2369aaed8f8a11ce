//! Accelerator Configuration
//!
//! Loads the configuration directory the engine is driven by. Only the fields the
//! orchestration engine reads are modelled; the IAM and network documents are parsed
//! for well-formedness and passed through untouched.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod model;
pub mod provider;

pub use error::{ConfigError, Result};
pub use model::{
    AcceleratorConfig, AccountConfig, AccountIdConfig, AccountsConfig, CdkOptions, GlobalConfig,
    OrganizationConfig, OrganizationalUnitConfig, ResourcePolicyEnforcementConfig, SecurityConfig,
    MANAGEMENT_ACCOUNT_NAME,
};
pub use provider::{ConfigProvider, FileConfigProvider, MANDATORY_FILES};
