//! System-wide default constants.
//!
//! Values that are not worth a config key but should not be scattered as
//! literals either. Grouped by subsystem.

// ============================================================================
// Storage
// ============================================================================

/// Default on-disk location of the sled output store.
pub const DEFAULT_STORE_PATH: &str = "data/prodalloc.db";

/// sled tree holding full-spine daily records.
pub const DAILY_TREE: &str = "daily";

/// sled tree holding production timeline rows.
pub const PRODUCTION_TREE: &str = "production";

/// sled tree holding monthly allocation factors.
pub const FACTOR_TREE: &str = "factors";

// ============================================================================
// Logging
// ============================================================================

/// Maximum per-row parse errors logged individually for a single feed file.
pub const MAX_LOGGED_ROW_ERRORS: usize = 10;

/// Progress is logged every this many wells.
pub const WELL_PROGRESS_INTERVAL: usize = 25;

// ============================================================================
// Input files
// ============================================================================

/// Registry file name inside a run input directory.
pub const REGISTRY_FILE: &str = "wells.csv";

/// External monthly volumes file name inside a run input directory.
pub const MONTHLY_VOLUMES_FILE: &str = "monthly_volumes.csv";
