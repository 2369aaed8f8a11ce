//! Deployment stages and module execution phases

use crate::ids::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known deployment stages
///
/// Stage definitions carry free-form names so that custom stages can be
/// registered; these are the names the built-in module catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcceleratorStage {
    Pipeline,
    TesterPipeline,
    DiagnosticsPack,
    Prepare,
    Accounts,
    Bootstrap,
    Key,
    Logging,
    Organizations,
    SecurityAudit,
    NetworkPrep,
    Security,
    Operations,
    IdentityCenter,
    NetworkVpc,
    SecurityResources,
    NetworkAssociations,
    ResourcePolicyEnforcement,
    ImportLegacyResources,
    Customizations,
    Finalize,
}

impl AcceleratorStage {
    pub const ALL: [AcceleratorStage; 21] = [
        AcceleratorStage::Pipeline,
        AcceleratorStage::TesterPipeline,
        AcceleratorStage::DiagnosticsPack,
        AcceleratorStage::Prepare,
        AcceleratorStage::Accounts,
        AcceleratorStage::Bootstrap,
        AcceleratorStage::Key,
        AcceleratorStage::Logging,
        AcceleratorStage::Organizations,
        AcceleratorStage::SecurityAudit,
        AcceleratorStage::NetworkPrep,
        AcceleratorStage::Security,
        AcceleratorStage::Operations,
        AcceleratorStage::IdentityCenter,
        AcceleratorStage::NetworkVpc,
        AcceleratorStage::SecurityResources,
        AcceleratorStage::NetworkAssociations,
        AcceleratorStage::ResourcePolicyEnforcement,
        AcceleratorStage::ImportLegacyResources,
        AcceleratorStage::Customizations,
        AcceleratorStage::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcceleratorStage::Pipeline => "pipeline",
            AcceleratorStage::TesterPipeline => "tester-pipeline",
            AcceleratorStage::DiagnosticsPack => "diagnostics-pack",
            AcceleratorStage::Prepare => "prepare",
            AcceleratorStage::Accounts => "accounts",
            AcceleratorStage::Bootstrap => "bootstrap",
            AcceleratorStage::Key => "key",
            AcceleratorStage::Logging => "logging",
            AcceleratorStage::Organizations => "organizations",
            AcceleratorStage::SecurityAudit => "security-audit",
            AcceleratorStage::NetworkPrep => "network-prep",
            AcceleratorStage::Security => "security",
            AcceleratorStage::Operations => "operations",
            AcceleratorStage::IdentityCenter => "identity-center",
            AcceleratorStage::NetworkVpc => "network-vpc",
            AcceleratorStage::SecurityResources => "security-resources",
            AcceleratorStage::NetworkAssociations => "network-associations",
            AcceleratorStage::ResourcePolicyEnforcement => "resource-policy-enforcement",
            AcceleratorStage::ImportLegacyResources => "import-legacy-resources",
            AcceleratorStage::Customizations => "customizations",
            AcceleratorStage::Finalize => "finalize",
        }
    }

    /// Pipeline bootstrap stages. These never run as part of a broad synthesis.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            AcceleratorStage::Pipeline | AcceleratorStage::TesterPipeline
        )
    }

    /// Stages that run before a deployment role exists in the target account
    /// and therefore always use the management credentials.
    pub fn is_pre_bootstrap(&self) -> bool {
        matches!(
            self,
            AcceleratorStage::Prepare | AcceleratorStage::Accounts | AcceleratorStage::Bootstrap
        )
    }

    /// Name-based variant of [`AcceleratorStage::is_pipeline`] for free-form stage names
    pub fn is_pipeline_name(name: &str) -> bool {
        name.parse::<AcceleratorStage>()
            .map(|s| s.is_pipeline())
            .unwrap_or(false)
    }

    /// Name-based variant of [`AcceleratorStage::is_pre_bootstrap`]
    pub fn is_pre_bootstrap_name(name: &str) -> bool {
        name.parse::<AcceleratorStage>()
            .map(|s| s.is_pre_bootstrap())
            .unwrap_or(false)
    }
}

impl fmt::Display for AcceleratorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcceleratorStage {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        AcceleratorStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| TypesError::UnknownStage(s.to_string()))
    }
}

/// Phase of an invocation a module participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPhase {
    /// Synthesis-only run: templates and plans are produced, nothing is applied
    Synth,
    /// Full deploy run
    Deploy,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPhase::Synth => f.write_str("synth"),
            ExecutionPhase::Deploy => f.write_str("deploy"),
        }
    }
}
