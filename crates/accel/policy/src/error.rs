//! Policy resolution error types

use accel_types::{AccountId, Region};
use thiserror::Error;

/// Policy resolution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("No policy for mandatory resource type {resource_type} in {account_id}/{region}")]
    MissingMandatoryResourceType {
        resource_type: String,
        account_id: AccountId,
        region: Region,
    },

    #[error("Policy set {set} declares an empty resource type")]
    EmptyResourceType { set: String },
}

/// Result type for policy resolution
pub type Result<T> = std::result::Result<T, PolicyError>;
