//! # Accelerator Policy Resolution
//!
//! Hierarchical override resolution for configuration objects addressed by
//! account, organizational unit (OU) and root scope.
//!
//! ## Overview
//!
//! Configuration such as resource policy sets can be declared at three scopes.
//! The nearest scope wins:
//!
//! - **Account**: the set names the account directly
//! - **Organizational unit**: the set names the OU (or a parent OU) containing the account
//! - **Root**: the set targets the whole organization
//!
//! Within one scope the most recently declared entry for a key wins.
//!
//! ## Key Components
//!
//! - [`ScopedOverride`]: generic three-tier override map
//! - [`DeploymentTargets`]: predicate deciding whether, and at which scope, a set applies
//! - [`NearestScopeResolver`]: picks and merges the applicable policy sets for an environment
//!
//! ## Example
//!
//! ```rust,no_run
//! use accel_policy::{NearestScopeResolver, ScopedPolicySet};
//! use accel_cloud::AccountDirectory;
//! use accel_types::{AccountId, Region};
//!
//! # fn example(directory: &AccountDirectory, sets: &[ScopedPolicySet]) {
//! let resolver = NearestScopeResolver::new(["S3_BUCKET"]);
//! let resolved = resolver
//!     .resolve(sets, directory, &AccountId::new("222222222222"), &Region::new("us-east-1"))
//!     .expect("mandatory policies present");
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod overrides;
pub mod resolver;
pub mod scope;

pub use error::{PolicyError, Result};
pub use overrides::ScopedOverride;
pub use resolver::{
    NearestScopeResolver, PolicyEntry, ResolvedPolicy, ResolvedPolicySet, ScopedPolicySet,
};
pub use scope::{DeploymentTargets, ScopeTier, ROOT_OU};
