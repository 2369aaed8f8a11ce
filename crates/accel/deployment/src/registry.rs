//! Stage and module registry
//!
//! The registry is built once at startup and never mutated afterwards. Validation
//! of duplicate names is deferred to execution so that a misconfigured registry
//! is reported with the name of the offending stage.

use crate::error::{DeploymentError, Result};
use crate::parameters::ModuleParams;
use accel_types::ExecutionPhase;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A unit of work run by the module runner
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    /// Run the module and return a human-readable status line
    async fn run(&self, params: ModuleParams) -> Result<String>;
}

/// Adapts an async closure into a [`ModuleHandler`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ModuleHandler for FnHandler<F>
where
    F: Fn(ModuleParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn run(&self, params: ModuleParams) -> Result<String> {
        (self.0)(params).await
    }
}

/// Wrap an async closure as a shared handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ModuleHandler>
where
    F: Fn(ModuleParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// A named module within a stage
#[derive(Clone)]
pub struct ModuleDefinition {
    pub name: String,
    pub description: String,
    pub run_order: i32,
    pub execution_phase: ExecutionPhase,
    pub handler: Arc<dyn ModuleHandler>,
}

impl ModuleDefinition {
    pub fn new(
        name: impl Into<String>,
        run_order: i32,
        execution_phase: ExecutionPhase,
        handler: Arc<dyn ModuleHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            run_order,
            execution_phase,
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("run_order", &self.run_order)
            .field("execution_phase", &self.execution_phase)
            .finish_non_exhaustive()
    }
}

/// A named stage and its modules
#[derive(Debug, Clone)]
pub struct StageDefinition {
    pub name: String,
    pub run_order: i32,
    pub modules: Vec<ModuleDefinition>,
}

impl StageDefinition {
    pub fn new(name: impl Into<String>, run_order: i32) -> Self {
        Self {
            name: name.into(),
            run_order,
            modules: Vec::new(),
        }
    }

    pub fn module(mut self, module: ModuleDefinition) -> Self {
        self.modules.push(module);
        self
    }

    /// Fails on the first module name declared twice
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(DeploymentError::DuplicateModule {
                    stage: self.name.clone(),
                    module: module.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Immutable set of stages
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    stages: Vec<StageDefinition>,
}

impl ModuleRegistry {
    pub fn new(stages: Vec<StageDefinition>) -> Self {
        Self { stages }
    }

    pub fn builder() -> ModuleRegistryBuilder {
        ModuleRegistryBuilder::default()
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stage registered under `name`, failing when it is registered more than once
    pub fn find_stage(&self, name: &str) -> Result<Option<&StageDefinition>> {
        let mut matches = self.stages.iter().filter(|s| s.name == name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(DeploymentError::DuplicateStage(name.to_string()));
        }
        Ok(first)
    }

    /// Fails on the first stage name declared twice or on duplicate modules
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(DeploymentError::DuplicateStage(stage.name.clone()));
            }
            stage.validate()?;
        }
        Ok(())
    }
}

/// Assembles a [`ModuleRegistry`]
#[derive(Debug, Default)]
pub struct ModuleRegistryBuilder {
    stages: Vec<StageDefinition>,
}

impl ModuleRegistryBuilder {
    pub fn stage(mut self, stage: StageDefinition) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a module to the last stage declared under `stage`, creating it when absent
    pub fn module(mut self, stage: &str, stage_run_order: i32, module: ModuleDefinition) -> Self {
        match self.stages.iter_mut().rev().find(|s| s.name == stage) {
            Some(existing) => existing.modules.push(module),
            None => self
                .stages
                .push(StageDefinition::new(stage, stage_run_order).module(module)),
        }
        self
    }

    pub fn build(self) -> ModuleRegistry {
        ModuleRegistry::new(self.stages)
    }
}
