//! Phased import of pre-existing resources
//!
//! A mapping assigns every unit to an import phase. Phases run in ascending
//! numeric order; the units of one phase are discovered concurrently and the
//! resulting resource mapping is persisted before the next phase starts.

use crate::error::{DeploymentError, Result};
use crate::parameters::ModuleParams;
use crate::registry::ModuleHandler;
use crate::scheduler::execute_group;
use accel_types::{AccountId, Region};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Phases processed when the caller names none
pub const DEFAULT_EXPECTED_PHASES: RangeInclusive<i64> = -1..=5;

/// One entry of the import mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMappingEntry {
    pub account_id: AccountId,
    pub region: Region,
    /// Phase number. Kept textual so that a malformed value is reported by unit.
    pub phase: String,
}

/// Unit name to mapping entry
pub type ImportMapping = BTreeMap<String, ImportMappingEntry>;

/// Logical resource id to physical resource id
pub type ResourceMapping = BTreeMap<String, String>;

/// Parse a JSON import mapping
pub fn parse_import_mapping(json: &str) -> Result<ImportMapping> {
    serde_json::from_str(json).map_err(|e| DeploymentError::ImportMapping(e.to_string()))
}

/// A unit selected for import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUnit {
    pub name: String,
    pub account_id: AccountId,
    pub region: Region,
    pub phase: i64,
}

/// Units of one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPhase {
    pub phase: i64,
    pub units: Vec<ImportUnit>,
}

/// Group the mapping's units targeting one environment by phase.
///
/// Every expected phase appears, empty when no unit uses it. Phases present in
/// the mapping but not expected are added.
pub fn plan_phases(
    mapping: &ImportMapping,
    account_id: &AccountId,
    region: &Region,
    expected: impl IntoIterator<Item = i64>,
) -> Result<Vec<ImportPhase>> {
    let mut phases: BTreeMap<i64, Vec<ImportUnit>> =
        expected.into_iter().map(|p| (p, Vec::new())).collect();

    for (name, entry) in mapping {
        let phase = entry.phase.trim().parse::<i64>().map_err(|_| {
            DeploymentError::InvalidImportPhase {
                unit: name.clone(),
                phase: entry.phase.clone(),
            }
        })?;

        let units = phases.entry(phase).or_default();
        if &entry.account_id == account_id && &entry.region == region {
            units.push(ImportUnit {
                name: name.clone(),
                account_id: entry.account_id.clone(),
                region: entry.region.clone(),
                phase,
            });
        }
    }

    Ok(phases
        .into_iter()
        .map(|(phase, units)| ImportPhase { phase, units })
        .collect())
}

/// Discovers the existing resources of a unit
#[async_trait]
pub trait ResourceImporter: Send + Sync {
    async fn discover(&self, unit: &ImportUnit) -> Result<ResourceMapping>;
}

/// Persists the resource mappings produced by one phase
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn persist(&self, record: &PhaseRecord) -> Result<()>;
}

/// Output of one processed phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub phase: i64,
    pub account_id: AccountId,
    pub region: Region,
    pub units: BTreeMap<String, ResourceMapping>,
}

/// Keeps persisted records in memory
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    records: RwLock<Vec<PhaseRecord>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<PhaseRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn persist(&self, record: &PhaseRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

/// Writes one JSON document per phase into a directory
#[derive(Debug, Clone)]
pub struct FileMappingStore {
    dir: PathBuf,
}

impl FileMappingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, record: &PhaseRecord) -> PathBuf {
        self.dir.join(format!(
            "import-phase-{}-{}-{}.json",
            record.phase, record.account_id, record.region
        ))
    }
}

#[async_trait]
impl MappingStore for FileMappingStore {
    async fn persist(&self, record: &PhaseRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| DeploymentError::MappingStore(e.to_string()))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DeploymentError::MappingStore(e.to_string()))?;
        tokio::fs::write(self.path_for(record), json)
            .await
            .map_err(|e| DeploymentError::MappingStore(e.to_string()))
    }
}

/// Result of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub processed: Vec<PhaseRecord>,
}

impl ImportReport {
    pub fn phases(&self) -> Vec<i64> {
        self.processed.iter().map(|r| r.phase).collect()
    }
}

/// Runs import phases strictly in order
pub struct PhaseImportSequencer {
    importer: Arc<dyn ResourceImporter>,
    store: Arc<dyn MappingStore>,
    expected_phases: BTreeSet<i64>,
}

impl PhaseImportSequencer {
    pub fn new(importer: Arc<dyn ResourceImporter>, store: Arc<dyn MappingStore>) -> Self {
        Self {
            importer,
            store,
            expected_phases: DEFAULT_EXPECTED_PHASES.collect(),
        }
    }

    pub fn with_expected_phases(mut self, phases: impl IntoIterator<Item = i64>) -> Self {
        self.expected_phases = phases.into_iter().collect();
        self
    }

    /// Import every unit of `mapping` targeting the environment.
    ///
    /// Phases without units are skipped with a warning and produce no output.
    #[instrument(skip(self, mapping), fields(units = mapping.len()))]
    pub async fn run(
        &self,
        mapping: &ImportMapping,
        account_id: &AccountId,
        region: &Region,
    ) -> Result<ImportReport> {
        let phases = plan_phases(
            mapping,
            account_id,
            region,
            self.expected_phases.iter().copied(),
        )?;

        let mut report = ImportReport::default();
        for ImportPhase { phase, units } in phases {
            if units.is_empty() {
                warn!(phase, "No units mapped to import phase, skipping");
                continue;
            }

            info!(phase, units = units.len(), "Importing phase");
            let importer = self.importer.clone();
            let discovered = execute_group(units, &move |unit: ImportUnit| {
                let importer = importer.clone();
                async move {
                    let resources = importer.discover(&unit).await?;
                    Ok::<_, DeploymentError>((unit.name, resources))
                }
            })
            .await?;

            let record = PhaseRecord {
                phase,
                account_id: account_id.clone(),
                region: region.clone(),
                units: discovered.into_iter().collect(),
            };
            self.store.persist(&record).await?;
            report.processed.push(record);
        }

        Ok(report)
    }
}

/// Module handler running the import sequencer.
///
/// Imports into the invocation's environment when one is set, otherwise into
/// every environment the mapping names.
pub struct ImportModuleHandler {
    sequencer: Arc<PhaseImportSequencer>,
    mapping: Arc<ImportMapping>,
}

impl ImportModuleHandler {
    pub fn new(sequencer: Arc<PhaseImportSequencer>, mapping: Arc<ImportMapping>) -> Self {
        Self { sequencer, mapping }
    }

    fn environments(&self, params: &ModuleParams) -> Vec<(AccountId, Region)> {
        let context = &params.run.context;
        if let (Some(account_id), Some(region)) = (&context.account_id, &context.region) {
            return vec![(account_id.clone(), region.clone())];
        }
        self.mapping
            .values()
            .map(|entry| (entry.account_id.clone(), entry.region.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[async_trait]
impl ModuleHandler for ImportModuleHandler {
    async fn run(&self, params: ModuleParams) -> Result<String> {
        let mut phases = 0;
        let environments = self.environments(&params);
        for (account_id, region) in &environments {
            phases += self
                .sequencer
                .run(&self.mapping, account_id, region)
                .await?
                .processed
                .len();
        }
        Ok(format!(
            "Module \"{}\" of \"{}\" stage imported {phases} phase(s) across {} environment(s)",
            params.module,
            params.stage,
            environments.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = r#"{
        "NetworkStack": {"accountId": "111111111111", "region": "us-east-1", "phase": "0"},
        "KeyStack": {"accountId": "111111111111", "region": "us-east-1", "phase": "-1"},
        "OtherRegion": {"accountId": "111111111111", "region": "eu-west-1", "phase": "1"}
    }"#;

    struct StaticImporter;

    #[async_trait]
    impl ResourceImporter for StaticImporter {
        async fn discover(&self, unit: &ImportUnit) -> Result<ResourceMapping> {
            Ok(BTreeMap::from([(
                format!("{}Resource", unit.name),
                format!("physical-{}", unit.phase),
            )]))
        }
    }

    fn env() -> (AccountId, Region) {
        (AccountId::new("111111111111"), Region::new("us-east-1"))
    }

    #[test]
    fn test_plan_phases_filters_environment() {
        let mapping = parse_import_mapping(MAPPING).unwrap();
        let (account, region) = env();
        let phases = plan_phases(&mapping, &account, &region, DEFAULT_EXPECTED_PHASES).unwrap();

        let numbers: Vec<_> = phases.iter().map(|p| p.phase).collect();
        assert_eq!(numbers, vec![-1, 0, 1, 2, 3, 4, 5]);
        assert_eq!(phases[0].units[0].name, "KeyStack");
        assert_eq!(phases[1].units[0].name, "NetworkStack");
        assert!(phases[2].units.is_empty());
    }

    #[test]
    fn test_unexpected_phase_is_added() {
        let mapping = parse_import_mapping(
            r#"{"Late": {"accountId": "111111111111", "region": "us-east-1", "phase": "9"}}"#,
        )
        .unwrap();
        let (account, region) = env();
        let phases = plan_phases(&mapping, &account, &region, [0]).unwrap();
        let numbers: Vec<_> = phases.iter().map(|p| p.phase).collect();
        assert_eq!(numbers, vec![0, 9]);
    }

    #[test]
    fn test_non_numeric_phase_rejected() {
        let mapping = parse_import_mapping(
            r#"{"Bad": {"accountId": "111111111111", "region": "us-east-1", "phase": "first"}}"#,
        )
        .unwrap();
        let (account, region) = env();
        assert!(matches!(
            plan_phases(&mapping, &account, &region, DEFAULT_EXPECTED_PHASES),
            Err(DeploymentError::InvalidImportPhase { unit, .. }) if unit == "Bad"
        ));
    }

    #[test]
    fn test_malformed_mapping_rejected() {
        assert!(matches!(
            parse_import_mapping("[1, 2]"),
            Err(DeploymentError::ImportMapping(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_writes_phase_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileMappingStore::new(dir.path().join("imports")));
        let sequencer = PhaseImportSequencer::new(Arc::new(StaticImporter), store.clone());

        let (account, region) = env();
        let mapping = parse_import_mapping(MAPPING).unwrap();
        let report = sequencer.run(&mapping, &account, &region).await.unwrap();
        assert_eq!(report.phases(), vec![-1, 0]);

        let path = store.path_for(&report.processed[0]);
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(written["phase"], -1);
        assert_eq!(written["units"]["KeyStack"]["KeyStackResource"], "physical--1");
    }
}
