//! Parameters handed to module handlers

use crate::error::Result;
use accel_cloud::{AccountDirectory, CloudError, CloudProvider, CredentialResolver};
use accel_types::{
    DeploymentContext, ExecutionPhase, InvocationParameters, Partition, Region, TypesError,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Validated parameters of the current invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    pub context: DeploymentContext,
    pub partition: Partition,
    /// Region the engine was invoked in
    pub region: Region,
    pub config_dir: PathBuf,
    pub prefix: String,
    pub use_existing_role: bool,
    pub dry_run: bool,
    pub phase: ExecutionPhase,
}

impl RunParameters {
    /// Validate raw invocation parameters for a run of `phase`
    pub fn from_invocation(params: &InvocationParameters, phase: ExecutionPhase) -> Result<Self> {
        let context = params.validate()?;
        Ok(Self {
            context,
            partition: params
                .partition
                .ok_or(TypesError::MissingParameter("partition"))?,
            region: params
                .region
                .clone()
                .ok_or(TypesError::MissingParameter("region"))?,
            config_dir: params
                .config_dir
                .clone()
                .ok_or(TypesError::MissingParameter("config_dir"))?,
            prefix: params.prefix.clone(),
            use_existing_role: params.use_existing_role,
            dry_run: params.dry_run,
            phase,
        })
    }
}

/// Names derived from the resource prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePrefixes {
    pub accelerator: String,
    pub bucket_name: String,
    pub ssm_param_name: String,
    pub kms_alias: String,
    pub sns_topic_name: String,
    pub ssm_log_name: String,
    pub trail_log_name: String,
}

impl ResourcePrefixes {
    pub fn new(prefix: &str) -> Self {
        let lower = prefix.to_lowercase();
        Self {
            accelerator: prefix.to_string(),
            bucket_name: lower.clone(),
            ssm_param_name: format!("/{lower}"),
            kms_alias: format!("alias/{lower}"),
            sns_topic_name: lower.clone(),
            ssm_log_name: format!("/{lower}"),
            trail_log_name: lower,
        }
    }

    /// Role every account carries once bootstrapped
    pub fn deployment_role_name(&self) -> String {
        format!("{}-Deployment-Role", self.accelerator)
    }

    pub fn central_log_bucket_kms_key_parameter(&self) -> String {
        format!("{}/logging/central-bucket/kms/arn", self.ssm_param_name)
    }
}

/// Values every handler of one invocation shares. Computed once.
#[derive(Debug, Clone)]
pub struct RunnerParameters {
    pub directory: AccountDirectory,
    pub prefixes: ResourcePrefixes,
    pub central_log_bucket_kms_key_arn: Option<String>,
}

impl RunnerParameters {
    /// Load the account directory and optional lookups.
    ///
    /// A missing central log bucket key parameter is tolerated; the value is
    /// simply absent before the logging stage has deployed.
    #[instrument(skip(provider, run), fields(provider = provider.name()))]
    pub async fn load(provider: &dyn CloudProvider, run: &RunParameters) -> Result<Self> {
        let directory = AccountDirectory::load(provider).await?;
        let prefixes = ResourcePrefixes::new(&run.prefix);

        let parameter = prefixes.central_log_bucket_kms_key_parameter();
        let lookup = provider.get_parameter(&parameter, &run.region).await;
        let central_log_bucket_kms_key_arn = match lookup {
            Ok(value) => Some(value),
            Err(CloudError::ParameterNotFound(name)) => {
                warn!(parameter = %name, "Central log bucket key not found, continuing without it");
                None
            }
            Err(e) => return Err(e.into()),
        };

        debug!(accounts = directory.accounts().len(), "Runner parameters loaded");
        Ok(Self {
            directory,
            prefixes,
            central_log_bucket_kms_key_arn,
        })
    }
}

/// Everything a module handler receives
#[derive(Clone)]
pub struct ModuleParams {
    pub stage: String,
    pub module: String,
    pub run: Arc<RunParameters>,
    pub runner: Arc<RunnerParameters>,
    pub credentials: CredentialResolver,
}

impl std::fmt::Debug for ModuleParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleParams")
            .field("stage", &self.stage)
            .field("module", &self.module)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}
