//! Deployment planning
//!
//! The planning handler is the synthesis-phase module of every built-in stage.
//! It enumerates the environments of the organization, keeps those the
//! inclusion filter admits, and records one deployment unit per environment.

use crate::catalog::AcceleratorModule;
use crate::error::Result;
use crate::filter::{Candidate, InclusionFilter};
use crate::parameters::ModuleParams;
use crate::registry::ModuleHandler;
use crate::synthesizer::{GlobalFlags, SynthesizerSelector};
use crate::units::{DeploymentUnit, UnitGraph, UnitKey};
use accel_policy::{NearestScopeResolver, ScopedPolicySet};
use accel_types::{AcceleratorStage, Region};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Resource policy enforcement settings
#[derive(Debug, Clone, Default)]
pub struct PolicyEnforcement {
    pub mandatory_resource_types: Vec<String>,
    pub policy_sets: Vec<ScopedPolicySet>,
}

/// Configuration a planning run reads
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub home_region: Region,
    /// Enabled regions, home region first
    pub regions: Vec<Region>,
    pub flags: GlobalFlags,
    pub termination_protection: bool,
    pub policy_enforcement: Option<PolicyEnforcement>,
}

impl PlanSettings {
    pub fn new(home_region: Region, regions: Vec<Region>) -> Self {
        Self {
            home_region,
            regions,
            flags: GlobalFlags::default(),
            termination_protection: true,
            policy_enforcement: None,
        }
    }
}

/// Units recorded by the planning handlers of one invocation
#[derive(Debug, Default)]
pub struct DeploymentPlan {
    graph: Mutex<UnitGraph>,
}

/// Serialized form of a plan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub use_existing_role: bool,
    pub units: Vec<DeploymentUnit>,
}

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> UnitGraph {
        self.graph.lock().await.clone()
    }

    /// Record units, linking each one to the bootstrap unit of its environment
    /// when that unit has already been planned.
    pub async fn record(&self, units: Vec<DeploymentUnit>, bootstrap_unit: &str) -> Result<usize> {
        let mut graph = self.graph.lock().await;
        let count = units.len();
        for mut unit in units {
            if !AcceleratorStage::is_pre_bootstrap_name(&unit.stage)
                && !AcceleratorStage::is_pipeline_name(&unit.stage)
            {
                let bootstrap = UnitKey::new(
                    bootstrap_unit,
                    unit.key.account_id.clone(),
                    unit.key.region.clone(),
                );
                if graph.contains(&bootstrap) {
                    unit = unit.depends_on(bootstrap);
                }
            }
            graph.add(unit)?;
        }
        Ok(count)
    }

    /// Dependency-ordered plan document
    pub async fn document(&self, use_existing_role: bool) -> Result<PlanDocument> {
        let graph = self.graph.lock().await;
        let units = graph.execution_order()?.into_iter().cloned().collect();
        Ok(PlanDocument {
            use_existing_role,
            units,
        })
    }
}

/// Stages planned only in the management account's home region
fn is_management_only(stage: &str) -> bool {
    stage.parse::<AcceleratorStage>().is_ok_and(|s| {
        s.is_pipeline()
            || matches!(
                s,
                AcceleratorStage::Prepare | AcceleratorStage::Accounts | AcceleratorStage::Finalize
            )
    })
}

/// Plans one module's deployment units
pub struct PlanningHandler {
    settings: Arc<PlanSettings>,
    plan: Arc<DeploymentPlan>,
}

impl PlanningHandler {
    pub fn new(settings: Arc<PlanSettings>, plan: Arc<DeploymentPlan>) -> Self {
        Self { settings, plan }
    }

    fn policy_resolver(&self, stage: &str) -> Option<(NearestScopeResolver, &[ScopedPolicySet])> {
        if stage != AcceleratorStage::ResourcePolicyEnforcement.as_str() {
            return None;
        }
        self.settings.policy_enforcement.as_ref().map(|enforcement| {
            (
                NearestScopeResolver::new(enforcement.mandatory_resource_types.iter().cloned()),
                enforcement.policy_sets.as_slice(),
            )
        })
    }
}

#[async_trait]
impl ModuleHandler for PlanningHandler {
    #[instrument(skip(self, params), fields(stage = %params.stage, module = %params.module))]
    async fn run(&self, params: ModuleParams) -> Result<String> {
        let filter = InclusionFilter::new(params.run.context.clone());
        let directory = &params.runner.directory;
        let management_account_id = directory.management_account_id();
        let selector = SynthesizerSelector::new(
            params.run.partition,
            &params.run.prefix,
            management_account_id.clone(),
            self.settings.home_region.clone(),
            self.settings.flags.clone(),
        );
        let policies = self.policy_resolver(&params.stage);
        let management_only = is_management_only(&params.stage);
        let unit_name = format!("{}-{}", params.runner.prefixes.accelerator, params.module);

        let mut units = Vec::new();
        for account in directory.accounts() {
            if management_only && &account.id != management_account_id {
                continue;
            }
            for region in &self.settings.regions {
                if management_only && region != &self.settings.home_region {
                    continue;
                }
                if !filter.include(&Candidate::environment(&params.stage, &account.id, region)) {
                    continue;
                }

                let resolved = match &policies {
                    Some((resolver, sets)) => {
                        resolver.resolve(sets, directory, &account.id, region)?
                    }
                    None => None,
                };

                debug!(account_id = %account.id, %region, "Planning deployment unit");
                units.push(
                    DeploymentUnit::new(
                        UnitKey::new(&unit_name, account.id.clone(), region.clone()),
                        &params.stage,
                        selector.select(&account.id, region, &params.stage),
                    )
                    .with_termination_protection(self.settings.termination_protection)
                    .with_policies(resolved),
                );
            }
        }

        let bootstrap_unit = format!(
            "{}-{}",
            params.runner.prefixes.accelerator,
            AcceleratorModule::BootstrapEnvironments.name()
        );
        let count = self.plan.record(units, &bootstrap_unit).await?;

        Ok(format!(
            "Module \"{}\" of \"{}\" stage planned {count} deployment unit(s)",
            params.module, params.stage
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeploymentError;
    use crate::parameters::{ResourcePrefixes, RunParameters, RunnerParameters};
    use accel_cloud::{
        AccountDirectory, CredentialResolver, InMemoryCloudProvider, Organization,
        OrganizationAccount,
    };
    use accel_policy::{DeploymentTargets, PolicyEntry, PolicyError, ROOT_OU};
    use accel_types::{AccountId, DeploymentContext, ExecutionPhase, Partition};
    use std::path::PathBuf;

    fn account(id: &str, name: &str, ou: &str) -> OrganizationAccount {
        OrganizationAccount {
            id: AccountId::new(id),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            organizational_unit: Some(ou.into()),
        }
    }

    fn params(stage: &str, module: &str, context: DeploymentContext) -> ModuleParams {
        let directory = AccountDirectory::from_parts(
            Organization {
                id: Some("o-example".into()),
                management_account_id: AccountId::new("111111111111"),
            },
            vec![
                account("111111111111", "Management", ROOT_OU),
                account("222222222222", "Audit", "Security"),
            ],
        );
        ModuleParams {
            stage: stage.into(),
            module: module.into(),
            run: Arc::new(RunParameters {
                context,
                partition: Partition::Aws,
                region: Region::new("us-east-1"),
                config_dir: PathBuf::from("config"),
                prefix: "Accelerator".into(),
                use_existing_role: false,
                dry_run: true,
                phase: ExecutionPhase::Synth,
            }),
            runner: Arc::new(RunnerParameters {
                directory,
                prefixes: ResourcePrefixes::new("Accelerator"),
                central_log_bucket_kms_key_arn: None,
            }),
            credentials: CredentialResolver::new(Arc::new(InMemoryCloudProvider::new(
                AccountId::new("111111111111"),
            ))),
        }
    }

    fn settings() -> PlanSettings {
        PlanSettings::new(
            Region::new("us-east-1"),
            vec![Region::new("us-east-1"), Region::new("eu-west-1")],
        )
    }

    #[tokio::test]
    async fn test_plans_every_included_environment() {
        let plan = Arc::new(DeploymentPlan::new());
        let handler = PlanningHandler::new(Arc::new(settings()), plan.clone());

        let status = handler
            .run(params("security", "security-stack", DeploymentContext::all_stages()))
            .await
            .unwrap();
        assert_eq!(
            status,
            "Module \"security-stack\" of \"security\" stage planned 4 deployment unit(s)"
        );
        assert_eq!(plan.snapshot().await.len(), 4);
    }

    #[tokio::test]
    async fn test_environment_context_plans_single_unit() {
        let plan = Arc::new(DeploymentPlan::new());
        let handler = PlanningHandler::new(Arc::new(settings()), plan.clone());
        let context = DeploymentContext::for_stage("security")
            .with_environment(AccountId::new("222222222222"), Region::new("eu-west-1"));

        handler
            .run(params("security", "security-stack", context.clone()))
            .await
            .unwrap();
        // Excluded stage plans nothing
        handler
            .run(params("logging", "logging-stack", context))
            .await
            .unwrap();

        let graph = plan.snapshot().await;
        assert_eq!(graph.len(), 1);
        let unit = &graph.units()[0];
        assert_eq!(unit.key.name, "Accelerator-security-stack");
        assert_eq!(unit.key.account_id.as_str(), "222222222222");
        assert_eq!(unit.key.region.as_str(), "eu-west-1");
    }

    #[tokio::test]
    async fn test_management_only_stage() {
        let plan = Arc::new(DeploymentPlan::new());
        let handler = PlanningHandler::new(Arc::new(settings()), plan.clone());
        handler
            .run(params("accounts", "accounts-stack", DeploymentContext::all_stages()))
            .await
            .unwrap();

        let graph = plan.snapshot().await;
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.units()[0].key.account_id.as_str(), "111111111111");
    }

    #[tokio::test]
    async fn test_later_stages_depend_on_bootstrap() {
        let plan = Arc::new(DeploymentPlan::new());
        let handler = PlanningHandler::new(Arc::new(settings()), plan.clone());
        let context = DeploymentContext::all_stages();

        handler
            .run(params("bootstrap", "bootstrap-environments", context.clone()))
            .await
            .unwrap();
        handler
            .run(params("key", "key-stack", context))
            .await
            .unwrap();

        let document = plan.document(false).await.unwrap();
        assert_eq!(document.units.len(), 8);
        assert!(document.units[..4]
            .iter()
            .all(|u| u.key.name == "Accelerator-bootstrap-environments"));
        assert!(document.units[4..].iter().all(|u| u.dependencies.len() == 1));
    }

    #[tokio::test]
    async fn test_policy_enforcement_resolves_nearest_scope() {
        let mut settings = settings();
        settings.policy_enforcement = Some(PolicyEnforcement {
            mandatory_resource_types: vec!["S3".into()],
            policy_sets: vec![ScopedPolicySet {
                name: "root".into(),
                deployment_targets: DeploymentTargets {
                    organizational_units: vec![ROOT_OU.into()],
                    ..DeploymentTargets::default()
                },
                policies: vec![PolicyEntry {
                    resource_type: "S3".into(),
                    document: "s3-root.json".into(),
                }],
            }],
        });
        let plan = Arc::new(DeploymentPlan::new());
        let handler = PlanningHandler::new(Arc::new(settings), plan.clone());

        handler
            .run(params(
                "resource-policy-enforcement",
                "resource-policy-enforcement-stack",
                DeploymentContext::all_stages(),
            ))
            .await
            .unwrap();

        let graph = plan.snapshot().await;
        assert!(graph.units().iter().all(|u| {
            u.policies
                .as_ref()
                .and_then(|p| p.document("S3"))
                == Some("s3-root.json")
        }));
    }

    #[tokio::test]
    async fn test_missing_mandatory_policy_fails_planning() {
        let mut settings = settings();
        settings.policy_enforcement = Some(PolicyEnforcement {
            mandatory_resource_types: vec!["S3".into(), "KMS".into()],
            policy_sets: vec![ScopedPolicySet {
                name: "root".into(),
                deployment_targets: DeploymentTargets {
                    organizational_units: vec![ROOT_OU.into()],
                    ..DeploymentTargets::default()
                },
                policies: vec![PolicyEntry {
                    resource_type: "S3".into(),
                    document: "s3-root.json".into(),
                }],
            }],
        });
        let plan = Arc::new(DeploymentPlan::new());
        let handler = PlanningHandler::new(Arc::new(settings), plan.clone());

        let result = handler
            .run(params(
                "resource-policy-enforcement",
                "resource-policy-enforcement-stack",
                DeploymentContext::all_stages(),
            ))
            .await;
        assert!(matches!(
            result,
            Err(DeploymentError::Policy(PolicyError::MissingMandatoryResourceType { .. }))
        ));
        assert!(plan.snapshot().await.is_empty());
    }
}
