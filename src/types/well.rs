//! Well identity records supplied by the registry

use serde::{Deserialize, Serialize};

/// Which identity a feed is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityKind {
    /// Wellhead-meter identity (ECF, wellhead gas + hours)
    Flow,
    /// Gathering/compression-facility identity (ratios, pressures, allocations)
    Compression,
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flow => write!(f, "flow"),
            Self::Compression => write!(f, "compression"),
        }
    }
}

/// Static well attributes carried onto every spine row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellAttributes {
    #[serde(default)]
    pub formation: String,
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub fault_block: String,
    #[serde(default)]
    pub pad: String,
    /// Lateral length (m); `None` when the registry has no number for it
    #[serde(default)]
    pub lateral_length: Option<f64>,
    #[serde(default)]
    pub orientation: String,
}

/// A well as known to the registry.
///
/// Immutable for the duration of a run. The registry is the only source of
/// truth for which wells exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellIdentity {
    /// Display name, also the ordering key for every per-well output
    pub name: String,
    pub flow_id: String,
    pub compression_id: String,
    #[serde(default)]
    pub attributes: WellAttributes,
}

impl WellIdentity {
    pub fn new(
        name: impl Into<String>,
        flow_id: impl Into<String>,
        compression_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            flow_id: flow_id.into(),
            compression_id: compression_id.into(),
            attributes: WellAttributes::default(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: WellAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// The identity a feed of the given kind is keyed by.
    pub fn identity(&self, kind: IdentityKind) -> &str {
        match kind {
            IdentityKind::Flow => &self.flow_id,
            IdentityKind::Compression => &self.compression_id,
        }
    }
}
