//! Nearest-scope resolution of policy sets

use crate::error::{PolicyError, Result};
use crate::overrides::ScopedOverride;
use crate::scope::{DeploymentTargets, ScopeTier};
use accel_cloud::AccountDirectory;
use accel_types::{AccountId, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One policy document for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntry {
    pub resource_type: String,
    pub document: String,
}

/// A named policy set together with the environments it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedPolicySet {
    pub name: String,
    #[serde(default)]
    pub deployment_targets: DeploymentTargets,
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
}

/// A resolved document and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPolicy {
    pub document: String,
    pub scope: ScopeTier,
    pub source: String,
}

/// Result of resolving policy sets for one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPolicySet {
    pub account_id: AccountId,
    pub region: Region,
    /// Name of the nearest applicable set
    pub winner: String,
    pub scope: ScopeTier,
    /// Documents keyed by resource type
    pub policies: BTreeMap<String, ResolvedPolicy>,
}

impl ResolvedPolicySet {
    pub fn document(&self, resource_type: &str) -> Option<&str> {
        self.policies.get(resource_type).map(|p| p.document.as_str())
    }
}

/// Picks the most specific applicable policy set (account > OU > root) and
/// merges farther scopes underneath it key by key.
#[derive(Debug, Clone, Default)]
pub struct NearestScopeResolver {
    mandatory_resource_types: Vec<String>,
}

impl NearestScopeResolver {
    pub fn new<I, S>(mandatory_resource_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mandatory_resource_types: mandatory_resource_types
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    pub fn mandatory_resource_types(&self) -> &[String] {
        &self.mandatory_resource_types
    }

    /// Resolve the policy set for an environment.
    ///
    /// Returns `Ok(None)` when no candidate targets the environment. Fails when a
    /// mandatory resource type is absent from the merged result.
    pub fn resolve(
        &self,
        candidates: &[ScopedPolicySet],
        directory: &AccountDirectory,
        account_id: &AccountId,
        region: &Region,
    ) -> Result<Option<ResolvedPolicySet>> {
        let mut overrides: ScopedOverride<String, (String, String)> = ScopedOverride::new();
        let mut winner: Option<(ScopeTier, &str)> = None;

        for candidate in candidates {
            let Some(tier) = candidate
                .deployment_targets
                .scope_for(directory, account_id, region)
            else {
                continue;
            };

            for entry in &candidate.policies {
                if entry.resource_type.trim().is_empty() {
                    return Err(PolicyError::EmptyResourceType {
                        set: candidate.name.clone(),
                    });
                }
                overrides.insert(
                    tier,
                    entry.resource_type.clone(),
                    (entry.document.clone(), candidate.name.clone()),
                );
            }

            // Later declarations win ties within a tier
            if winner.map_or(true, |(best, _)| tier >= best) {
                winner = Some((tier, candidate.name.as_str()));
            }
        }

        let Some((scope, winner)) = winner else {
            debug!(account_id = %account_id, region = %region, "No policy set targets environment");
            return Ok(None);
        };

        let policies: BTreeMap<String, ResolvedPolicy> = overrides
            .merged()
            .into_iter()
            .map(|(resource_type, ((document, source), scope))| {
                (
                    resource_type,
                    ResolvedPolicy {
                        document,
                        scope,
                        source,
                    },
                )
            })
            .collect();

        if let Some(missing) = self
            .mandatory_resource_types
            .iter()
            .find(|rt| !policies.contains_key(rt.as_str()))
        {
            return Err(PolicyError::MissingMandatoryResourceType {
                resource_type: missing.clone(),
                account_id: account_id.clone(),
                region: region.clone(),
            });
        }

        debug!(
            account_id = %account_id,
            region = %region,
            winner = winner,
            scope = %scope,
            policy_count = policies.len(),
            "Policy set resolved"
        );

        Ok(Some(ResolvedPolicySet {
            account_id: account_id.clone(),
            region: region.clone(),
            winner: winner.to_string(),
            scope,
            policies,
        }))
    }
}
