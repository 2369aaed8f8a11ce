//! Inclusion filter
//!
//! Decides whether a (stage, account, region) combination is materialized in the
//! current invocation. Evaluated before any deployment unit is built so that
//! excluded environments never trigger credential resolution.

use accel_types::{AcceleratorStage, AccountId, DeploymentContext, Region};

/// A stage/environment combination considered for materialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub stage: &'a str,
    pub account_id: Option<&'a AccountId>,
    pub region: Option<&'a Region>,
}

impl<'a> Candidate<'a> {
    pub fn stage(stage: &'a str) -> Self {
        Self {
            stage,
            account_id: None,
            region: None,
        }
    }

    pub fn environment(stage: &'a str, account_id: &'a AccountId, region: &'a Region) -> Self {
        Self {
            stage,
            account_id: Some(account_id),
            region: Some(region),
        }
    }
}

/// Pure inclusion predicate bound to an invocation context
#[derive(Debug, Clone)]
pub struct InclusionFilter {
    context: DeploymentContext,
}

impl InclusionFilter {
    pub fn new(context: DeploymentContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.context
    }

    pub fn include(&self, candidate: &Candidate<'_>) -> bool {
        include(&self.context, candidate)
    }
}

/// Whether `candidate` runs under `context`
pub fn include(context: &DeploymentContext, candidate: &Candidate<'_>) -> bool {
    let Some(stage) = context.stage.as_deref() else {
        // Broad synthesis never includes the pipeline bootstrap stages
        return !AcceleratorStage::is_pipeline_name(candidate.stage);
    };

    if stage != candidate.stage {
        return false;
    }

    match (&context.account_id, &context.region) {
        (None, None) => true,
        (Some(account_id), Some(region)) => {
            candidate.account_id == Some(account_id) && candidate.region == Some(region)
        }
        _ => false,
    }
}
