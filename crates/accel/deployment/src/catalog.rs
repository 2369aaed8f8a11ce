//! Built-in module catalog
//!
//! Every module the engine knows about, with its stage, run order and phase. The
//! registry is assembled from this table by [`ModuleRegistry::from_catalog`].

use crate::registry::{ModuleDefinition, ModuleHandler, ModuleRegistry, ModuleRegistryBuilder};
use accel_types::{AcceleratorStage, ExecutionPhase};
use std::fmt;
use std::sync::Arc;

/// Built-in modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceleratorModule {
    PipelineStack,
    TesterPipelineStack,
    PrepareStack,
    ControlTowerLandingZone,
    OrganizationalUnits,
    AccountsStack,
    AccountCreation,
    BootstrapEnvironments,
    KeyStack,
    LoggingStack,
    OrganizationsStack,
    SecurityAuditStack,
    NetworkPrepStack,
    SecurityStack,
    OperationsStack,
    IdentityCenterStack,
    NetworkVpcStack,
    SecurityResourcesStack,
    NetworkAssociationsStack,
    ResourcePolicyEnforcementStack,
    ImportLegacyResources,
    CustomizationsStack,
    FinalizeStack,
}

impl AcceleratorModule {
    pub const ALL: [AcceleratorModule; 23] = [
        Self::PipelineStack,
        Self::TesterPipelineStack,
        Self::PrepareStack,
        Self::ControlTowerLandingZone,
        Self::OrganizationalUnits,
        Self::AccountsStack,
        Self::AccountCreation,
        Self::BootstrapEnvironments,
        Self::KeyStack,
        Self::LoggingStack,
        Self::OrganizationsStack,
        Self::SecurityAuditStack,
        Self::NetworkPrepStack,
        Self::SecurityStack,
        Self::OperationsStack,
        Self::IdentityCenterStack,
        Self::NetworkVpcStack,
        Self::SecurityResourcesStack,
        Self::NetworkAssociationsStack,
        Self::ResourcePolicyEnforcementStack,
        Self::ImportLegacyResources,
        Self::CustomizationsStack,
        Self::FinalizeStack,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PipelineStack => "pipeline-stack",
            Self::TesterPipelineStack => "tester-pipeline-stack",
            Self::PrepareStack => "prepare-stack",
            Self::ControlTowerLandingZone => "control-tower-landing-zone",
            Self::OrganizationalUnits => "organizational-units",
            Self::AccountsStack => "accounts-stack",
            Self::AccountCreation => "account-creation",
            Self::BootstrapEnvironments => "bootstrap-environments",
            Self::KeyStack => "key-stack",
            Self::LoggingStack => "logging-stack",
            Self::OrganizationsStack => "organizations-stack",
            Self::SecurityAuditStack => "security-audit-stack",
            Self::NetworkPrepStack => "network-prep-stack",
            Self::SecurityStack => "security-stack",
            Self::OperationsStack => "operations-stack",
            Self::IdentityCenterStack => "identity-center-stack",
            Self::NetworkVpcStack => "network-vpc-stack",
            Self::SecurityResourcesStack => "security-resources-stack",
            Self::NetworkAssociationsStack => "network-associations-stack",
            Self::ResourcePolicyEnforcementStack => "resource-policy-enforcement-stack",
            Self::ImportLegacyResources => "import-legacy-resources",
            Self::CustomizationsStack => "customizations-stack",
            Self::FinalizeStack => "finalize-stack",
        }
    }

    pub fn stage(&self) -> AcceleratorStage {
        use AcceleratorStage as S;
        match self {
            Self::PipelineStack => S::Pipeline,
            Self::TesterPipelineStack => S::TesterPipeline,
            Self::PrepareStack | Self::ControlTowerLandingZone | Self::OrganizationalUnits => {
                S::Prepare
            }
            Self::AccountsStack | Self::AccountCreation => S::Accounts,
            Self::BootstrapEnvironments => S::Bootstrap,
            Self::KeyStack => S::Key,
            Self::LoggingStack => S::Logging,
            Self::OrganizationsStack => S::Organizations,
            Self::SecurityAuditStack => S::SecurityAudit,
            Self::NetworkPrepStack => S::NetworkPrep,
            Self::SecurityStack => S::Security,
            Self::OperationsStack => S::Operations,
            Self::IdentityCenterStack => S::IdentityCenter,
            Self::NetworkVpcStack => S::NetworkVpc,
            Self::SecurityResourcesStack => S::SecurityResources,
            Self::NetworkAssociationsStack => S::NetworkAssociations,
            Self::ResourcePolicyEnforcementStack => S::ResourcePolicyEnforcement,
            Self::ImportLegacyResources => S::ImportLegacyResources,
            Self::CustomizationsStack => S::Customizations,
            Self::FinalizeStack => S::Finalize,
        }
    }

    /// Order of the module within its stage
    pub fn run_order(&self) -> i32 {
        match self {
            Self::OrganizationalUnits => 2,
            _ => 1,
        }
    }

    pub fn execution_phase(&self) -> ExecutionPhase {
        match self {
            Self::ControlTowerLandingZone
            | Self::OrganizationalUnits
            | Self::AccountCreation
            | Self::ImportLegacyResources => ExecutionPhase::Deploy,
            _ => ExecutionPhase::Synth,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ControlTowerLandingZone => "Set up or update the landing zone",
            Self::OrganizationalUnits => "Create configured organizational units",
            Self::AccountCreation => "Create configured accounts",
            Self::ImportLegacyResources => "Import pre-existing resources phase by phase",
            _ => "Plan the stage's deployment units",
        }
    }

    pub fn definition(&self, handler: Arc<dyn ModuleHandler>) -> ModuleDefinition {
        ModuleDefinition::new(self.name(), self.run_order(), self.execution_phase(), handler)
            .with_description(self.description())
    }
}

impl fmt::Display for AcceleratorModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Order of a stage among all stages. Stages sharing an order run concurrently.
pub fn stage_run_order(stage: AcceleratorStage) -> i32 {
    use AcceleratorStage as S;
    match stage {
        S::Pipeline | S::TesterPipeline | S::DiagnosticsPack => 0,
        S::Prepare => 1,
        S::Accounts => 2,
        S::Bootstrap => 3,
        S::Key => 4,
        S::Logging => 5,
        S::Organizations => 6,
        S::SecurityAudit => 7,
        S::NetworkPrep | S::Security => 8,
        S::Operations | S::IdentityCenter => 9,
        S::NetworkVpc | S::SecurityResources => 10,
        S::NetworkAssociations => 11,
        S::ResourcePolicyEnforcement | S::ImportLegacyResources => 12,
        S::Customizations => 13,
        S::Finalize => 14,
    }
}

impl ModuleRegistry {
    /// Build a registry from the catalog.
    ///
    /// `handler_for` returns the handler of each module, or `None` to leave the
    /// module out. Stages left without modules are not registered.
    pub fn from_catalog<F>(mut handler_for: F) -> Self
    where
        F: FnMut(AcceleratorModule) -> Option<Arc<dyn ModuleHandler>>,
    {
        let mut builder = ModuleRegistryBuilder::default();
        for module in AcceleratorModule::ALL {
            if let Some(handler) = handler_for(module) {
                let stage = module.stage();
                builder = builder.module(
                    stage.as_str(),
                    stage_run_order(stage),
                    module.definition(handler),
                );
            }
        }
        builder.build()
    }
}
