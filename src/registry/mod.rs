//! Well Registry
//!
//! The registry is the sole source of truth for which wells exist and how
//! each well is keyed in the flow-identity and compression-identity feeds.
//! It is read once at the start of a run and never mutated by the engine.

use crate::feeds::csv::{parse_value, CsvTable};
use crate::feeds::FeedError;
use crate::types::{IdentityKind, WellAttributes, WellIdentity};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to load well registry: {0}")]
    Load(#[from] FeedError),
}

// ============================================================================
// Registry Seam
// ============================================================================

/// Lookup service for well identities.
pub trait WellRegistry: Send + Sync {
    /// Every well, ordered by name.
    fn wells(&self) -> Vec<&WellIdentity>;

    /// The well keyed by `flow_id` in flow-identity feeds.
    fn by_flow_id(&self, flow_id: &str) -> Option<&WellIdentity>;

    /// Wells sharing a compression identity. Several wells on one
    /// compression point is a normal layout.
    fn by_compression_id(&self, compression_id: &str) -> Vec<&WellIdentity>;

    /// Whether any well is keyed by `id` under `kind`.
    fn knows(&self, kind: IdentityKind, id: &str) -> bool {
        match kind {
            IdentityKind::Flow => self.by_flow_id(id).is_some(),
            IdentityKind::Compression => !self.by_compression_id(id).is_empty(),
        }
    }
}

/// Registry held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    wells: Vec<WellIdentity>,
    by_flow: HashMap<String, usize>,
    by_compression: BTreeMap<String, Vec<usize>>,
}

impl InMemoryRegistry {
    /// Build from identity records.
    ///
    /// Records with an empty flow identity are skipped. A repeated flow
    /// identity or well name keeps the first record.
    pub fn new(records: impl IntoIterator<Item = WellIdentity>) -> Self {
        let mut wells: Vec<WellIdentity> = Vec::new();
        let mut seen_flow: HashSet<String> = HashSet::new();
        let mut seen_name: HashSet<String> = HashSet::new();

        for mut well in records {
            well.name = well.name.trim().to_string();
            well.flow_id = well.flow_id.trim().to_string();
            well.compression_id = well.compression_id.trim().to_string();

            if well.flow_id.is_empty() {
                warn!(well = %well.name, "Registry row has no flow identity, skipped");
                continue;
            }
            if !seen_flow.insert(well.flow_id.clone()) {
                warn!(well = %well.name, flow_id = %well.flow_id, "Duplicate flow identity, keeping first");
                continue;
            }
            if !seen_name.insert(well.name.clone()) {
                warn!(well = %well.name, flow_id = %well.flow_id, "Duplicate well name, keeping first");
                continue;
            }
            wells.push(well);
        }

        wells.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_flow = HashMap::with_capacity(wells.len());
        let mut by_compression: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, well) in wells.iter().enumerate() {
            by_flow.insert(well.flow_id.clone(), idx);
            if !well.compression_id.is_empty() {
                by_compression
                    .entry(well.compression_id.clone())
                    .or_default()
                    .push(idx);
            }
        }

        Self {
            wells,
            by_flow,
            by_compression,
        }
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    /// Load the registry CSV file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let file = File::open(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::read(BufReader::new(file), path)?;
        info!(path = %path.display(), wells = registry.len(), "Well registry loaded");
        Ok(registry)
    }

    /// Parse registry rows from a reader. Header names follow the same
    /// case-insensitive alias matching as the feeds.
    pub fn read<R: BufRead>(reader: R, source: &Path) -> Result<Self, RegistryError> {
        let table = CsvTable::read(reader).map_err(|e| FeedError::Io {
            path: PathBuf::from(source),
            source: e,
        })?;
        if table.header.is_empty() {
            warn!(path = %source.display(), "Registry file is empty");
            return Ok(Self::default());
        }

        let required = |aliases: &[&'static str]| {
            table.find_column(aliases).ok_or(FeedError::MissingColumn {
                feed: "wells".to_string(),
                column: aliases[0],
            })
        };
        let name = required(&["well_name", "Well Name"])?;
        let flow = required(crate::feeds::key_aliases(IdentityKind::Flow))?;
        let compression = required(crate::feeds::key_aliases(IdentityKind::Compression))?;

        let formation = table.find_column(&["formation", "Formation Producer"]);
        let layer = table.find_column(&["layer", "Layer Producer"]);
        let fault_block = table.find_column(&["fault_block", "Fault Block"]);
        let pad = table.find_column(&["pad", "Pad Name"]);
        let lateral_length = table.find_column(&["lateral_length", "Lateral Length"]);
        let orientation = table.find_column(&["orientation", "Orient"]);

        let records = table.records.iter().map(|record| {
            let text = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .unwrap_or("")
                    .to_string()
            };
            WellIdentity::new(
                text(Some(name)),
                text(Some(flow)),
                text(Some(compression)),
            )
            .with_attributes(WellAttributes {
                formation: text(formation),
                layer: text(layer),
                fault_block: text(fault_block),
                pad: text(pad),
                lateral_length: lateral_length.and_then(|i| record.get(i)).and_then(parse_value),
                orientation: text(orientation),
            })
        });

        Ok(Self::new(records.collect::<Vec<_>>()))
    }
}

impl WellRegistry for InMemoryRegistry {
    fn wells(&self) -> Vec<&WellIdentity> {
        self.wells.iter().collect()
    }

    fn by_flow_id(&self, flow_id: &str) -> Option<&WellIdentity> {
        self.by_flow.get(flow_id).map(|&idx| &self.wells[idx])
    }

    fn by_compression_id(&self, compression_id: &str) -> Vec<&WellIdentity> {
        self.by_compression
            .get(compression_id)
            .map(|idxs| idxs.iter().map(|&idx| &self.wells[idx]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wells_sorted_by_name() {
        let registry = InMemoryRegistry::new(vec![
            WellIdentity::new("C-3", "F3", "P1"),
            WellIdentity::new("A-1", "F1", "P1"),
            WellIdentity::new("B-2", "F2", "P2"),
        ]);
        let names: Vec<_> = registry.wells().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["A-1", "B-2", "C-3"]);
    }

    #[test]
    fn test_duplicate_flow_id_keeps_first() {
        let registry = InMemoryRegistry::new(vec![
            WellIdentity::new("A-1", "F1", "P1"),
            WellIdentity::new("A-1 dup", " F1 ", "P9"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.by_flow_id("F1").map(|w| w.name.as_str()), Some("A-1"));
        assert!(!registry.knows(IdentityKind::Compression, "P9"));
    }

    #[test]
    fn test_empty_flow_id_skipped() {
        let registry = InMemoryRegistry::new(vec![
            WellIdentity::new("A-1", "", "P1"),
            WellIdentity::new("B-2", "F2", "P1"),
        ]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_shared_compression_identity() {
        let registry = InMemoryRegistry::new(vec![
            WellIdentity::new("B-2", "F2", "P1"),
            WellIdentity::new("A-1", "F1", "P1"),
        ]);
        let sharing: Vec<_> = registry
            .by_compression_id("P1")
            .iter()
            .map(|w| w.name.as_str())
            .collect();
        assert_eq!(sharing, vec!["A-1", "B-2"]);
        assert!(registry.knows(IdentityKind::Flow, "F2"));
        assert!(!registry.knows(IdentityKind::Flow, "F9"));
    }

    #[test]
    fn test_read_registry_with_source_headers() {
        let csv = "Well Name,GasIDREC,PressuresIDREC,Formation Producer,Lateral Length,Orient\n\
                   A-1,F1,P1,Montney,2450.5,N\n\
                   B-2,F2,P2,Montney,,S\n";
        let registry = InMemoryRegistry::read(csv.as_bytes(), Path::new("wells.csv")).unwrap();
        assert_eq!(registry.len(), 2);
        let a1 = registry.by_flow_id("F1").unwrap();
        assert_eq!(a1.compression_id, "P1");
        assert_eq!(a1.attributes.formation, "Montney");
        assert_eq!(a1.attributes.lateral_length, Some(2450.5));
        assert_eq!(a1.attributes.orientation, "N");
        assert_eq!(registry.by_flow_id("F2").unwrap().attributes.lateral_length, None);
    }

    #[test]
    fn test_read_registry_missing_identity_column() {
        let csv = "well_name,flow_id\nA-1,F1\n";
        let err = InMemoryRegistry::read(csv.as_bytes(), Path::new("wells.csv")).unwrap_err();
        assert!(err.to_string().contains("compression_id"), "got: {err}");
    }
}
