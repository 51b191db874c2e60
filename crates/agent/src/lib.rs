//! Scan/monitor/execute agent for same-day-expiry options.
//!
//! Drives the strategy analyzer against live chains through the brokerage
//! and market-data seams, tracking its own positions and a daily loss
//! budget. One agent, one task; no shared state.

pub mod agent;
pub mod position;
pub mod scheduler;
pub mod sizing;

pub use agent::TradingAgent;
pub use position::{ExitReason, TrackedPosition};
pub use scheduler::{Clock, SystemClock};
