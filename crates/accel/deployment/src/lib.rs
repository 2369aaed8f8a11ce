//! Accelerator deployment orchestration
//!
//! Drives a multi-account deployment through ordered stages:
//!
//! - [`ModuleRegistry`]: immutable stage/module definitions, built from the
//!   [`AcceleratorModule`] catalog or by hand
//! - [`ModuleRunner`]: executes stages and modules by run order, fail-fast
//! - [`InclusionFilter`]: decides which (stage, account, region) combinations run
//! - [`SynthesizerSelector`]: picks identity and artifact storage per unit
//! - [`PlanningHandler`]: records deployment units into a [`UnitGraph`]
//! - [`PhaseImportSequencer`]: imports pre-existing resources phase by phase
//!
//! Run orders are plain integers. Equal run orders execute concurrently,
//! distinct ones strictly ascending.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod catalog;
pub mod error;
pub mod filter;
pub mod import;
pub mod parameters;
pub mod planner;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod synthesizer;
pub mod units;

pub use catalog::{stage_run_order, AcceleratorModule};
pub use error::{DeploymentError, Result};
pub use filter::{Candidate, InclusionFilter};
pub use import::{
    parse_import_mapping, plan_phases, FileMappingStore, ImportMapping, ImportMappingEntry,
    ImportModuleHandler, ImportPhase, ImportReport, ImportUnit, InMemoryMappingStore,
    MappingStore, PhaseImportSequencer, PhaseRecord, ResourceImporter, ResourceMapping,
    DEFAULT_EXPECTED_PHASES,
};
pub use parameters::{ModuleParams, ResourcePrefixes, RunParameters, RunnerParameters};
pub use planner::{DeploymentPlan, PlanDocument, PlanSettings, PlanningHandler, PolicyEnforcement};
pub use registry::{
    handler_fn, FnHandler, ModuleDefinition, ModuleHandler, ModuleRegistry, ModuleRegistryBuilder,
    StageDefinition,
};
pub use runner::{skip_variable, ModuleOverrides, ModuleRunner, SKIP_VARIABLE_PREFIX};
pub use scheduler::{
    execute_group, execute_groups, group_by_run_order, run_in_order, RunOrderGroup, RunOrderItem,
};
pub use synthesizer::{GlobalFlags, SynthesizerSelector};
pub use units::{DeploymentUnit, UnitGraph, UnitKey};
