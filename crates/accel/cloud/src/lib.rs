//! Accelerator Cloud Layer
//!
//! Narrow facade over the cloud control-plane APIs the orchestration engine needs:
//! caller identity, assume-role, organization account listing and parameter reads.
//!
//! ## Architectural Boundaries
//!
//! - `accel-cloud` owns: the [`CloudProvider`] interface, throttling retries, credential
//!   resolution and the read-only account directory snapshot
//! - Wire-level SDK clients own: request signing, transport timeouts and their own retries
//!
//! Every call made by the engine goes through [`RetryingCloudProvider`], which retries
//! throttling-class errors with exponential backoff and jitter and propagates everything
//! else immediately.
//!
//! ## Usage
//!
//! ```no_run
//! use accel_cloud::{
//!     AssumeRoleInput, BackoffConfig, CredentialResolver, InMemoryCloudProvider,
//!     RetryingCloudProvider,
//! };
//! use accel_types::{AccountId, Partition, Region};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(RetryingCloudProvider::new(
//!     InMemoryCloudProvider::new(AccountId::new("111111111111")),
//!     BackoffConfig::default(),
//! ));
//! let resolver = CredentialResolver::new(provider);
//!
//! let input = AssumeRoleInput::with_role_name(
//!     AccountId::new("222222222222"),
//!     Region::new("us-east-1"),
//!     "Accelerator-Deployment-Role",
//!     Partition::Aws,
//! );
//! let credentials = resolver.assume(&input).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod credentials;
pub mod directory;
pub mod error;
pub mod memory;
pub mod provider;
pub mod retry;

pub use credentials::{role_arn, AssumeRoleInput, CredentialResolver, DEFAULT_SESSION_NAME};
pub use directory::AccountDirectory;
pub use error::{CloudError, Result};
pub use memory::InMemoryCloudProvider;
pub use provider::{
    operations, AssumeRoleRequest, CallerIdentity, CloudProvider, Organization,
    OrganizationAccount, ProviderCredentials,
};
pub use retry::{BackoffConfig, RetryPolicy, RetryingCloudProvider};
