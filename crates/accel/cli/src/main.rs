//! Accelerator CLI
//!
//! Plans a multi-account deployment from a configuration directory:
//! - loads and validates the configuration
//! - runs the synthesis-phase modules of one stage or of every stage
//! - writes the resulting deployment plan as JSON

use accel_cloud::{AssumeRoleInput, CredentialResolver, RetryingCloudProvider};
use accel_config::{ConfigProvider, FileConfigProvider};
use accel_deployment::{
    DeploymentPlan, ModuleHandler, ModuleOverrides, ModuleRegistry, ModuleRunner,
    PlanningHandler, RunParameters,
};
use accel_types::{
    AcceleratorStage, AccountId, ExecutionPhase, InvocationParameters, Partition, Region,
    DEFAULT_PREFIX,
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;
mod setup;

use settings::RunnerSettings;

/// Accelerator CLI
#[derive(Parser)]
#[command(name = "accel")]
#[command(about = "Accelerator - multi-account deployment planner", long_about = None)]
#[command(version)]
struct Cli {
    /// Cloud partition (aws, aws-us-gov, aws-cn, ...)
    #[arg(short, long, env = "ACCELERATOR_PARTITION")]
    partition: Option<String>,

    /// Region the engine runs in
    #[arg(short, long, env = "ACCELERATOR_REGION")]
    region: Option<String>,

    /// Configuration directory
    #[arg(short, long, env = "ACCELERATOR_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Stage to run; every stage when omitted
    #[arg(short, long, env = "ACCELERATOR_STAGE")]
    stage: Option<String>,

    /// Restrict the run to one account (in the invocation region)
    #[arg(long, env = "ACCELERATOR_ACCOUNT")]
    account: Option<String>,

    /// Resource name prefix
    #[arg(long, env = "ACCELERATOR_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Use roles that already exist instead of creating them
    #[arg(long, env = "ACCELERATOR_USE_EXISTING_ROLE")]
    use_existing_role: bool,

    /// Plan without writing the plan document
    #[arg(long, env = "ACCELERATOR_DRY_RUN")]
    dry_run: bool,

    /// Runner settings file
    #[arg(long, env = "ACCELERATOR_SETTINGS")]
    settings: Option<String>,

    /// Plan document path, overriding the settings
    #[arg(long, env = "ACCELERATOR_PLAN_OUTPUT")]
    plan_output: Option<PathBuf>,

    /// Management account id, overriding the configuration
    #[arg(long, env = "MANAGEMENT_ACCOUNT_ID")]
    management_account_id: Option<String>,

    /// Role assumed in the management account
    #[arg(long, env = "MANAGEMENT_ACCOUNT_ROLE_NAME")]
    management_account_role_name: Option<String>,

    /// Log level
    #[arg(long, env = "ACCELERATOR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ACCELERATOR_LOG_JSON")]
    json: bool,
}

impl Cli {
    fn invocation(&self) -> anyhow::Result<InvocationParameters> {
        let partition = self
            .partition
            .as_deref()
            .map(str::parse::<Partition>)
            .transpose()?;

        // Well-known stages accept any casing; custom names pass through
        let stage = self.stage.as_deref().map(|s| {
            s.parse::<AcceleratorStage>()
                .map(|stage| stage.as_str().to_string())
                .unwrap_or_else(|_| s.to_string())
        });

        Ok(InvocationParameters {
            partition,
            region: self.region.as_deref().map(Region::new),
            config_dir: self.config_dir.clone(),
            stage,
            prefix: self.prefix.clone(),
            use_existing_role: self.use_existing_role,
            dry_run: self.dry_run,
            account_id: self.account.as_deref().map(AccountId::new),
        })
    }
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings =
        RunnerSettings::load(cli.settings.as_deref()).context("Failed to load runner settings")?;
    init_tracing(
        cli.log_level.as_deref().unwrap_or(&settings.logging.level),
        cli.json || settings.logging.json,
    );

    let run = RunParameters::from_invocation(&cli.invocation()?, ExecutionPhase::Synth)
        .context("Invalid invocation parameters")?;

    let config = FileConfigProvider::new(&run.config_dir)
        .with_management_account_id(cli.management_account_id.as_deref().map(AccountId::new))
        .load()
        .with_context(|| {
            format!("Failed to load configuration from {}", run.config_dir.display())
        })?;
    let management_account_id = config.management_account_id.clone();

    let provider = Arc::new(RetryingCloudProvider::new(
        setup::offline_provider(
            &config,
            &management_account_id,
            run.partition,
            cli.management_account_role_name.as_deref(),
        ),
        settings.retry.clone(),
    ));

    if let Some(role) = &cli.management_account_role_name {
        let input = AssumeRoleInput::with_role_name(
            management_account_id.clone(),
            run.region.clone(),
            role.as_str(),
            run.partition,
        );
        match CredentialResolver::new(provider.clone()).assume(&input).await? {
            Some(_) => info!(role = %role, "Assumed management account role"),
            None => info!(role = %role, "Already running as the management account role"),
        }
    }

    let plan = Arc::new(DeploymentPlan::new());
    let plan_settings = Arc::new(setup::plan_settings(&config));
    let registry = ModuleRegistry::from_catalog(|module| {
        (module.execution_phase() == ExecutionPhase::Synth).then(|| {
            Arc::new(PlanningHandler::new(plan_settings.clone(), plan.clone()))
                as Arc<dyn ModuleHandler>
        })
    });

    let stage = run.context.stage.clone();
    let use_existing_role = run.use_existing_role;
    let dry_run = run.dry_run;
    let runner = Arc::new(
        ModuleRunner::new(Arc::new(registry), run, provider)
            .with_overrides(ModuleOverrides::from_env()),
    );

    let status = runner.execute(stage.as_deref()).await?;
    println!("{status}");

    let document = plan.document(use_existing_role).await?;
    if dry_run {
        warn!(units = document.units.len(), "Dry run, plan document not written");
        return Ok(());
    }

    let path = cli.plan_output.unwrap_or(settings.plan.path);
    let json = serde_json::to_vec_pretty(&document)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write plan to {}", path.display()))?;
    info!(path = %path.display(), units = document.units.len(), "Plan written");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_invocation() {
        let cli = Cli::parse_from([
            "accel",
            "--partition",
            "aws-us-gov",
            "--region",
            "us-gov-west-1",
            "--config-dir",
            "config",
            "--stage",
            "Network_VPC",
            "--dry-run",
        ]);
        let params = cli.invocation().unwrap();
        assert_eq!(params.partition, Some(Partition::AwsUsGov));
        assert_eq!(params.stage.as_deref(), Some("network-vpc"));
        assert_eq!(params.prefix, "Accelerator");
        assert!(params.dry_run);
        assert!(!params.use_existing_role);
    }

    #[test]
    fn test_custom_stage_name_kept() {
        let cli = Cli::parse_from(["accel", "--stage", "Custom"]);
        assert_eq!(cli.invocation().unwrap().stage.as_deref(), Some("Custom"));
    }

    #[test]
    fn test_unknown_partition_rejected() {
        let cli = Cli::parse_from(["accel", "--partition", "moon"]);
        assert!(cli.invocation().is_err());
    }
}
