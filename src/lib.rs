//! prodalloc: Production Reconciliation & Allocation Engine
//!
//! Reconciles daily well measurements from seven independent source feeds
//! into one record per well per calendar day, scales them to externally
//! reported monthly volumes, and derives production sequence counters,
//! cumulative volumes and monthly averages.
//!
//! ## Pipeline
//!
//! - **Registry**: well list with flow and compression identities
//! - **Spine**: one row per well per day from first measurement to cutoff
//! - **Merge**: left join of the seven deduplicated feeds
//! - **Allocation**: monthly factors and daily projected volumes
//! - **Sequence**: production timeline, Days Seq, Day Seq UPRT, cumulatives
//! - **Monthly**: zero-filled monthly averages
//! - **Storage**: sled store with idempotent window replacement

pub mod allocation;
pub mod config;
pub mod engine;
pub mod feeds;
pub mod merge;
pub mod monthly;
pub mod registry;
pub mod sequence;
pub mod spine;
pub mod storage;
pub mod types;

pub use config::{ConfigError, EngineConfig};

pub use types::{
    DailyProductionRecord, MonthlyAllocationFactor, ProductionMonth, ProductionRow, RunWindow,
    WellIdentity, WellOutput,
};

pub use allocation::{ratio_exceptions, ExternalVolumeTable, RatioExceptionGroup};
pub use engine::{EngineError, ReconciliationEngine, RunOutput, RunReport};
pub use feeds::{FeedError, FeedKind, FeedSet};
pub use registry::{InMemoryRegistry, RegistryError, WellRegistry};
pub use storage::{OutputWriter, ProductionStore, StorageError, WriteReport};
