//! Module runner
//!
//! Executes registered modules. Without a stage, every stage runs: stages are
//! grouped by run order, and each stage's modules are grouped again by their own
//! run order. With a stage, only that stage's modules run. Modules whose phase
//! differs from the invocation's are filtered out.

use crate::error::Result;
use crate::parameters::{ModuleParams, RunParameters, RunnerParameters};
use crate::registry::{ModuleDefinition, ModuleRegistry, StageDefinition};
use crate::scheduler::{run_in_order, RunOrderItem};
use accel_cloud::{CloudProvider, CredentialResolver};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

/// Prefix of the environment variables that skip a module
pub const SKIP_VARIABLE_PREFIX: &str = "ACCELERATOR_SKIP_";

/// Environment variable that skips `module` when set to `true`
pub fn skip_variable(module: &str) -> String {
    let suffix: String = module
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{SKIP_VARIABLE_PREFIX}{suffix}")
}

fn no_modules(stage: &str) -> String {
    format!("No modules found for \"{stage}\" stage")
}

/// Out-of-band module skip flags
#[derive(Debug, Clone, Default)]
pub struct ModuleOverrides {
    values: HashMap<String, String>,
}

impl ModuleOverrides {
    /// Snapshot the skip variables of the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            values: vars
                .into_iter()
                .filter(|(key, _)| key.starts_with(SKIP_VARIABLE_PREFIX))
                .collect(),
        }
    }

    pub fn skip(mut self, module: &str) -> Self {
        self.values.insert(skip_variable(module), "true".into());
        self
    }

    pub fn is_skipped(&self, module: &str) -> bool {
        self.values
            .get(&skip_variable(module))
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// Runs the modules of a registry for one invocation
pub struct ModuleRunner {
    registry: Arc<ModuleRegistry>,
    run: Arc<RunParameters>,
    provider: Arc<dyn CloudProvider>,
    overrides: ModuleOverrides,
    runner_parameters: OnceCell<Arc<RunnerParameters>>,
}

impl ModuleRunner {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        run: RunParameters,
        provider: Arc<dyn CloudProvider>,
    ) -> Self {
        Self {
            registry,
            run: Arc::new(run),
            provider,
            overrides: ModuleOverrides::default(),
            runner_parameters: OnceCell::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: ModuleOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn run_parameters(&self) -> &RunParameters {
        &self.run
    }

    /// Parameters shared by every handler, loaded on first use
    pub async fn runner_parameters(&self) -> Result<Arc<RunnerParameters>> {
        self.runner_parameters
            .get_or_try_init(|| async {
                RunnerParameters::load(self.provider.as_ref(), &self.run)
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }

    /// Execute one stage, or every stage when `stage` is `None`.
    ///
    /// Returns the status lines of the executed modules joined by newlines.
    #[instrument(skip(self), fields(phase = %self.run.phase))]
    pub async fn execute(self: &Arc<Self>, stage: Option<&str>) -> Result<String> {
        let lines = match stage {
            Some(stage) => self.execute_stage(stage).await?,
            None => self.execute_all_stages().await?,
        };
        Ok(lines.join("\n"))
    }

    async fn execute_stage(self: &Arc<Self>, name: &str) -> Result<Vec<String>> {
        match self.registry.find_stage(name)? {
            Some(stage) => self.execute_stage_modules(stage.clone()).await,
            None => {
                info!(stage = name, "No stage registered under this name");
                Ok(vec![no_modules(name)])
            }
        }
    }

    async fn execute_all_stages(self: &Arc<Self>) -> Result<Vec<String>> {
        self.registry.validate()?;

        let items = self
            .registry
            .stages()
            .iter()
            .map(|stage| RunOrderItem::new(stage.run_order, stage.clone()));

        let runner = Arc::clone(self);
        let per_stage = run_in_order(items, move |stage: StageDefinition| {
            let runner = runner.clone();
            async move { runner.execute_stage_modules(stage).await }
        })
        .await?;

        Ok(per_stage.into_iter().flatten().collect())
    }

    async fn execute_stage_modules(
        self: &Arc<Self>,
        stage: StageDefinition,
    ) -> Result<Vec<String>> {
        stage.validate()?;

        let items: Vec<_> = stage
            .modules
            .iter()
            .filter(|m| m.execution_phase == self.run.phase)
            .map(|m| RunOrderItem::new(m.run_order, m.clone()))
            .collect();

        if items.iter().all(|i| self.overrides.is_skipped(&i.item.name)) {
            info!(stage = %stage.name, phase = %self.run.phase, "No runnable modules");
            return Ok(vec![no_modules(&stage.name)]);
        }

        let runner = Arc::clone(self);
        let stage_name = stage.name;
        run_in_order(items, move |module: ModuleDefinition| {
            let runner = runner.clone();
            let stage_name = stage_name.clone();
            async move { runner.execute_module(&stage_name, module).await }
        })
        .await
    }

    async fn execute_module(&self, stage: &str, module: ModuleDefinition) -> Result<String> {
        if self.overrides.is_skipped(&module.name) {
            let variable = skip_variable(&module.name);
            warn!(stage, module = %module.name, %variable, "Module skipped by override");
            return Ok(format!(
                "Module \"{}\" of \"{stage}\" stage skipped by {variable}",
                module.name
            ));
        }

        let params = ModuleParams {
            stage: stage.to_string(),
            module: module.name.clone(),
            run: self.run.clone(),
            runner: self.runner_parameters().await?,
            credentials: CredentialResolver::new(self.provider.clone()),
        };

        info!(stage, module = %module.name, "Executing module");
        module.handler.run(params).await.map_err(|e| {
            error!(stage, module = %module.name, error = %e, "Module failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeploymentError;
    use crate::registry::{handler_fn, ModuleHandler};
    use accel_cloud::{operations, InMemoryCloudProvider};
    use accel_types::{AccountId, DeploymentContext, ExecutionPhase, Partition, Region};
    use std::path::PathBuf;

    fn run(phase: ExecutionPhase) -> RunParameters {
        RunParameters {
            context: DeploymentContext::all_stages(),
            partition: Partition::Aws,
            region: Region::new("us-east-1"),
            config_dir: PathBuf::from("config"),
            prefix: "Accelerator".into(),
            use_existing_role: false,
            dry_run: true,
            phase,
        }
    }

    fn echo() -> Arc<dyn ModuleHandler> {
        handler_fn(|params: ModuleParams| async move {
            Ok(format!("{}/{}", params.stage, params.module))
        })
    }

    fn provider() -> Arc<InMemoryCloudProvider> {
        Arc::new(InMemoryCloudProvider::new(AccountId::new("111111111111")))
    }

    fn runner(
        registry: ModuleRegistry,
        phase: ExecutionPhase,
        provider: Arc<InMemoryCloudProvider>,
    ) -> Arc<ModuleRunner> {
        Arc::new(ModuleRunner::new(Arc::new(registry), run(phase), provider))
    }

    #[test]
    fn test_skip_variable_normalizes_name() {
        assert_eq!(
            skip_variable("control-tower-landing-zone"),
            "ACCELERATOR_SKIP_CONTROL_TOWER_LANDING_ZONE"
        );
        assert_eq!(skip_variable("a.b c"), "ACCELERATOR_SKIP_A_B_C");
    }

    #[test]
    fn test_overrides_match_true_case_insensitively() {
        let overrides = ModuleOverrides::from_vars(vec![
            ("ACCELERATOR_SKIP_KEY_STACK".to_string(), "TRUE".to_string()),
            ("ACCELERATOR_SKIP_LOGGING_STACK".to_string(), "yes".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ]);
        assert!(overrides.is_skipped("key-stack"));
        assert!(!overrides.is_skipped("logging-stack"));
        assert!(!overrides.is_skipped("security-stack"));
    }

    #[tokio::test]
    async fn test_unknown_stage_is_not_an_error() {
        let registry = ModuleRegistry::builder()
            .module("security", 1, ModuleDefinition::new("m", 1, ExecutionPhase::Deploy, echo()))
            .build();
        let status = runner(registry, ExecutionPhase::Deploy, provider())
            .execute(Some("network-vpc"))
            .await
            .unwrap();
        assert_eq!(status, "No modules found for \"network-vpc\" stage");
    }

    #[tokio::test]
    async fn test_phase_filter_leaves_no_modules() {
        let registry = ModuleRegistry::builder()
            .module("security", 1, ModuleDefinition::new("m", 1, ExecutionPhase::Synth, echo()))
            .build();
        let status = runner(registry, ExecutionPhase::Deploy, provider())
            .execute(Some("security"))
            .await
            .unwrap();
        assert_eq!(status, "No modules found for \"security\" stage");
    }

    #[tokio::test]
    async fn test_phase_filter_keeps_matching_modules() {
        let registry = ModuleRegistry::builder()
            .module("security", 1, ModuleDefinition::new("synth", 1, ExecutionPhase::Synth, echo()))
            .module(
                "security",
                1,
                ModuleDefinition::new("deploy", 2, ExecutionPhase::Deploy, echo()),
            )
            .build();
        let status = runner(registry, ExecutionPhase::Deploy, provider())
            .execute(Some("security"))
            .await
            .unwrap();
        assert_eq!(status, "security/deploy");
    }

    #[tokio::test]
    async fn test_duplicate_stage_rejected_by_name() {
        let registry = ModuleRegistry::new(vec![
            StageDefinition::new("security", 1)
                .module(ModuleDefinition::new("a", 1, ExecutionPhase::Deploy, echo())),
            StageDefinition::new("security", 2)
                .module(ModuleDefinition::new("b", 1, ExecutionPhase::Deploy, echo())),
        ]);
        let runner = runner(registry, ExecutionPhase::Deploy, provider());

        for stage in [Some("security"), None] {
            match runner.execute(stage).await {
                Err(DeploymentError::DuplicateStage(name)) => assert_eq!(name, "security"),
                other => panic!("expected duplicate stage error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_skipped_module_reports_override() {
        let registry = ModuleRegistry::builder()
            .module("key", 1, ModuleDefinition::new("key-stack", 1, ExecutionPhase::Deploy, echo()))
            .module("key", 1, ModuleDefinition::new("other", 2, ExecutionPhase::Deploy, echo()))
            .build();
        let runner = Arc::new(
            ModuleRunner::new(Arc::new(registry), run(ExecutionPhase::Deploy), provider())
                .with_overrides(ModuleOverrides::default().skip("key-stack")),
        );

        let status = runner.execute(Some("key")).await.unwrap();
        assert_eq!(
            status,
            "Module \"key-stack\" of \"key\" stage skipped by ACCELERATOR_SKIP_KEY_STACK\nkey/other"
        );
    }

    #[tokio::test]
    async fn test_fully_skipped_stage_reports_no_modules() {
        let registry = ModuleRegistry::builder()
            .module("key", 1, ModuleDefinition::new("key-stack", 1, ExecutionPhase::Deploy, echo()))
            .build();
        let runner = Arc::new(
            ModuleRunner::new(Arc::new(registry), run(ExecutionPhase::Deploy), provider())
                .with_overrides(ModuleOverrides::default().skip("key-stack")),
        );

        let status = runner.execute(Some("key")).await.unwrap();
        assert_eq!(status, "No modules found for \"key\" stage");
    }

    #[tokio::test]
    async fn test_runner_parameters_loaded_once_per_invocation() {
        let registry = ModuleRegistry::builder()
            .module("a", 1, ModuleDefinition::new("a1", 1, ExecutionPhase::Deploy, echo()))
            .module("a", 1, ModuleDefinition::new("a2", 1, ExecutionPhase::Deploy, echo()))
            .module("b", 2, ModuleDefinition::new("b1", 1, ExecutionPhase::Deploy, echo()))
            .build();
        let provider = provider();
        let runner = runner(registry, ExecutionPhase::Deploy, provider.clone());

        runner.execute(None).await.unwrap();

        assert_eq!(provider.call_count(operations::LIST_ACCOUNTS), 1);
        assert_eq!(provider.call_count(operations::GET_PARAMETER), 1);
    }

    #[tokio::test]
    async fn test_module_failure_propagates() {
        let failing = handler_fn(|params: ModuleParams| async move {
            Err(DeploymentError::ModuleFailed {
                stage: params.stage,
                module: params.module,
                reason: "unavailable".into(),
            })
        });
        let registry = ModuleRegistry::builder()
            .module("a", 1, ModuleDefinition::new("bad", 1, ExecutionPhase::Deploy, failing))
            .module("b", 2, ModuleDefinition::new("never", 1, ExecutionPhase::Deploy, echo()))
            .build();

        let result = runner(registry, ExecutionPhase::Deploy, provider())
            .execute(None)
            .await;
        assert!(matches!(
            result,
            Err(DeploymentError::ModuleFailed { module, .. }) if module == "bad"
        ));
    }
}
