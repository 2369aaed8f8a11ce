//! Wiring from the configuration directory to the engine

use accel_cloud::InMemoryCloudProvider;
use accel_config::AcceleratorConfig;
use accel_deployment::{GlobalFlags, PlanSettings, PolicyEnforcement};
use accel_types::{AccountId, Partition};
use tracing::debug;

/// Organization view built from the configuration for offline planning
pub fn offline_provider(
    config: &AcceleratorConfig,
    management_account_id: &AccountId,
    partition: Partition,
    role_name: Option<&str>,
) -> InMemoryCloudProvider {
    let mut provider = InMemoryCloudProvider::new(management_account_id.clone());
    if let Some(role) = role_name {
        provider = provider.with_caller_arn(format!(
            "arn:{partition}:sts::{management_account_id}:assumed-role/{role}/accelerator"
        ));
    }
    for account in config.accounts.organization_accounts() {
        debug!(account = %account.name, account_id = %account.id, "Registering account");
        provider = provider.with_account(account);
    }
    provider
}

/// Planning settings read from the configuration
pub fn plan_settings(config: &AcceleratorConfig) -> PlanSettings {
    let global = &config.global;
    let cdk = &global.cdk_options;

    let mut settings = PlanSettings::new(global.home_region.clone(), global.regions());
    settings.flags = GlobalFlags {
        custom_deployment_role: cdk.custom_deployment_role.clone(),
        use_management_access_role: cdk.use_management_access_role,
        centralize_buckets: cdk.centralize_buckets,
    };
    settings.termination_protection = global.termination_protection;
    settings.policy_enforcement = config
        .security
        .resource_policy_enforcement
        .as_ref()
        .filter(|enforcement| enforcement.enable)
        .map(|enforcement| PolicyEnforcement {
            mandatory_resource_types: enforcement.mandatory_resource_types.clone(),
            policy_sets: enforcement.policy_sets.clone(),
        });
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_cloud::CloudProvider;
    use accel_config::{ConfigProvider, FileConfigProvider};
    use std::fs;
    use std::path::Path;

    fn write_config(dir: &Path) {
        fs::write(
            dir.join("global-config.yaml"),
            "homeRegion: us-east-1\nenabledRegions: [eu-west-1]\n\
             cdkOptions:\n  customDeploymentRole: OrgDeployer\n",
        )
        .unwrap();
        fs::write(
            dir.join("accounts-config.yaml"),
            r#"
mandatoryAccounts:
  - name: Management
    email: root@example.com
    organizationalUnit: Root
  - name: Audit
    email: audit@example.com
    organizationalUnit: Security
workloadAccounts:
  - name: NotYetCreated
    email: new@example.com
    organizationalUnit: Workloads
accountIds:
  - email: root@example.com
    accountId: "111111111111"
  - email: audit@example.com
    accountId: "222222222222"
"#,
        )
        .unwrap();
        fs::write(dir.join("organization-config.yaml"), "enable: true\n").unwrap();
        fs::write(
            dir.join("security-config.yaml"),
            r#"
resourcePolicyEnforcement:
  enable: true
  mandatoryResourceTypes: [S3]
  policySets:
    - name: baseline
      deploymentTargets:
        organizationalUnits: [Root]
      policies:
        - resourceType: S3
          document: s3.json
"#,
        )
        .unwrap();
        fs::write(dir.join("iam-config.yaml"), "{}\n").unwrap();
        fs::write(dir.join("network-config.yaml"), "{}\n").unwrap();
    }

    fn config() -> AcceleratorConfig {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path());
        FileConfigProvider::new(dir.path()).load().unwrap()
    }

    #[tokio::test]
    async fn test_offline_provider_lists_configured_accounts() {
        let config = config();
        let provider = offline_provider(
            &config,
            &AccountId::new("111111111111"),
            Partition::Aws,
            Some("OrganizationAccountAccessRole"),
        );

        let accounts = provider.list_organization_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        let caller = provider.get_caller_identity().await.unwrap();
        assert_eq!(
            caller.arn,
            "arn:aws:sts::111111111111:assumed-role/OrganizationAccountAccessRole/accelerator"
        );
    }

    #[test]
    fn test_plan_settings_carry_flags_and_policies() {
        let settings = plan_settings(&config());
        assert_eq!(settings.regions.len(), 2);
        assert_eq!(
            settings.flags.custom_deployment_role.as_deref(),
            Some("OrgDeployer")
        );
        assert!(settings.termination_protection);
        let enforcement = settings.policy_enforcement.unwrap();
        assert_eq!(enforcement.policy_sets.len(), 1);
    }
}
