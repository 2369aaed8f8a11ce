//! Deployment orchestration error types

use accel_cloud::CloudError;
use accel_policy::PolicyError;
use accel_types::TypesError;
use thiserror::Error;

/// Deployment orchestration errors
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Duplicate stage definition: {0}")]
    DuplicateStage(String),

    #[error("Duplicate module {module} in stage {stage}")]
    DuplicateModule { stage: String, module: String },

    #[error("Module {module} of stage {stage} failed: {reason}")]
    ModuleFailed {
        stage: String,
        module: String,
        reason: String,
    },

    #[error("Duplicate deployment unit: {0}")]
    DuplicateUnit(String),

    #[error("Deployment unit {unit} depends on unknown unit {dependency}")]
    UnknownDependency { unit: String, dependency: String },

    #[error("Dependency cycle detected involving {0}")]
    DependencyCycle(String),

    #[error("Invalid import phase {phase:?} for unit {unit}")]
    InvalidImportPhase { unit: String, phase: String },

    #[error("Invalid import mapping: {0}")]
    ImportMapping(String),

    #[error("Resource discovery failed for unit {unit}: {reason}")]
    ImportFailed { unit: String, reason: String },

    #[error("Mapping store error: {0}")]
    MappingStore(String),

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Invalid invocation: {0}")]
    Invocation(#[from] TypesError),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeploymentError>;
