//! Shared data structures for the production reconciliation pipeline
//!
//! - `WellIdentity`: registry record (flow + compression identity, attributes)
//! - `DailyProductionRecord`: spine row with merged feeds and allocated volumes
//! - `MonthlyAllocationFactor`: per well-month ratios and the totals behind them
//! - `ProductionRow`: filtered timeline with sequences, cumulatives and averages

mod allocation;
mod daily;
mod production;
mod well;
mod window;

pub use allocation::*;
pub use daily::*;
pub use production::*;
pub use well::*;
pub use window::*;
