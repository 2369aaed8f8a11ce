//! Deployment units and their dependency graph

use crate::error::{DeploymentError, Result};
use accel_policy::ResolvedPolicySet;
use accel_types::{AccountId, Region, SynthesizerConfig};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Identity of a deployment unit: one name per environment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitKey {
    pub name: String,
    pub account_id: AccountId,
    pub region: Region,
}

impl UnitKey {
    pub fn new(name: impl Into<String>, account_id: AccountId, region: Region) -> Self {
        Self {
            name: name.into(),
            account_id,
            region,
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.account_id, self.region)
    }
}

/// A named collection of resources targeted at exactly one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentUnit {
    pub key: UnitKey,
    pub stage: String,
    pub dependencies: Vec<UnitKey>,
    pub synthesizer: SynthesizerConfig,
    pub termination_protection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<ResolvedPolicySet>,
}

impl DeploymentUnit {
    pub fn new(key: UnitKey, stage: impl Into<String>, synthesizer: SynthesizerConfig) -> Self {
        Self {
            key,
            stage: stage.into(),
            dependencies: Vec::new(),
            synthesizer,
            termination_protection: false,
            policies: None,
        }
    }

    pub fn depends_on(mut self, dependency: UnitKey) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn with_termination_protection(mut self, enabled: bool) -> Self {
        self.termination_protection = enabled;
        self
    }

    pub fn with_policies(mut self, policies: Option<ResolvedPolicySet>) -> Self {
        self.policies = policies;
        self
    }
}

/// Units of a plan in insertion order
#[derive(Debug, Clone, Default)]
pub struct UnitGraph {
    units: Vec<DeploymentUnit>,
    index: HashMap<UnitKey, usize>,
}

impl UnitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &UnitKey) -> Option<&DeploymentUnit> {
        self.index.get(key).map(|&i| &self.units[i])
    }

    pub fn units(&self) -> &[DeploymentUnit] {
        &self.units
    }

    /// Add a unit. Its dependencies may be added later.
    pub fn add(&mut self, unit: DeploymentUnit) -> Result<()> {
        if self.index.contains_key(&unit.key) {
            return Err(DeploymentError::DuplicateUnit(unit.key.to_string()));
        }
        self.index.insert(unit.key.clone(), self.units.len());
        self.units.push(unit);
        Ok(())
    }

    fn build_graph(&self) -> Result<DiGraph<usize, ()>> {
        let mut graph = DiGraph::with_capacity(self.units.len(), 0);
        let nodes: Vec<NodeIndex> = (0..self.units.len()).map(|i| graph.add_node(i)).collect();

        for (i, unit) in self.units.iter().enumerate() {
            for dependency in &unit.dependencies {
                let &from = self.index.get(dependency).ok_or_else(|| {
                    DeploymentError::UnknownDependency {
                        unit: unit.key.to_string(),
                        dependency: dependency.to_string(),
                    }
                })?;
                graph.add_edge(nodes[from], nodes[i], ());
            }
        }
        Ok(graph)
    }

    /// Units ordered so that every unit follows its dependencies.
    ///
    /// Kahn's algorithm; ready units are taken in insertion order.
    pub fn execution_order(&self) -> Result<Vec<&DeploymentUnit>> {
        let graph = self.build_graph()?;

        let mut in_degree: Vec<usize> = vec![0; self.units.len()];
        for edge in graph.edge_references() {
            in_degree[edge.target().index()] += 1;
        }

        let mut queue: VecDeque<NodeIndex> = graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.units.len());
        while let Some(idx) = queue.pop_front() {
            order.push(&self.units[graph[idx]]);

            let mut neighbors: Vec<NodeIndex> =
                graph.neighbors_directed(idx, Direction::Outgoing).collect();
            neighbors.sort();
            neighbors.dedup();
            for neighbor in neighbors {
                let edges = graph.edges_connecting(idx, neighbor).count();
                let degree = &mut in_degree[neighbor.index()];
                *degree = degree.saturating_sub(edges);
                if *degree == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if order.len() != self.units.len() {
            let stuck = in_degree
                .iter()
                .position(|&d| d > 0)
                .map_or_else(|| "unknown".to_string(), |i| self.units[i].key.to_string());
            return Err(DeploymentError::DependencyCycle(stuck));
        }

        Ok(order)
    }

    /// Fails on unknown dependencies or cycles
    pub fn validate(&self) -> Result<()> {
        self.execution_order().map(|_| ())
    }
}
