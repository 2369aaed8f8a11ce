//! Accelerator Types
//!
//! Shared data model for the Accelerator deployment orchestration engine.
//!
//! This crate contains no behaviour beyond validation and formatting. The engine
//! itself lives in `accel-deployment`; cloud access lives in `accel-cloud`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod context;
pub mod credentials;
pub mod ids;
pub mod stage;
pub mod synthesizer;

pub use context::{DeploymentContext, InvocationParameters, DEFAULT_PREFIX};
pub use credentials::AssumedCredential;
pub use ids::{AccountId, Partition, Region, TypesError};
pub use stage::{AcceleratorStage, ExecutionPhase};
pub use synthesizer::{SynthesizerConfig, SynthesizerStrategy};
