//! Engine Configuration Module
//!
//! Run-level constants loaded from TOML, replacing the hardcoded fallback
//! start date, meter dead-band and sequence thresholds.
//!
//! ## Loading Order
//!
//! 1. `PRODALLOC_CONFIG` environment variable (path to TOML file)
//! 2. `prodalloc.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is passed to the engine, never read from a global:
//!
//! ```ignore
//! let config = EngineConfig::load();
//! let engine = ReconciliationEngine::new(config);
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;
