//! Synthesizer configuration attached to every deployment unit

use serde::{Deserialize, Serialize};

/// How a deployment unit authenticates when it is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SynthesizerStrategy {
    /// Use the invoking identity's own permissions
    AmbientCredentials,
    /// Use an operator-supplied deployment role
    CustomRole,
    /// Use the computed `{prefix}-Deployment-Role`
    DefaultRole,
}

/// Role and artifact-store selection for one (account, region, stage)
///
/// Computed once and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizerConfig {
    pub strategy: SynthesizerStrategy,
    pub role_arn: Option<String>,
    pub asset_bucket_name: Option<String>,
    pub asset_bucket_prefix: Option<String>,
}

impl SynthesizerConfig {
    pub fn uses_ambient_credentials(&self) -> bool {
        self.strategy == SynthesizerStrategy::AmbientCredentials
    }
}
