//! # Fleet Monitor
//!
//! Tracks every registered agent, scrapes its metrics endpoint on a fixed
//! interval through a bounded worker pool, debounces failures with a retry
//! budget and persists what it learns through the [`FleetStore`] port.
//!
//! ```text
//!  scheduler tick ──try_send──▶ [ bounded queue (2N) ] ──▶ N workers
//!        │                                                   │
//!        └──── scans ────▶  Roster (DashMap)  ◀── updates ───┘
//!                                                            │
//!                                                 FleetStore (port)
//! ```

pub use agent_metrics;
pub use overseer_core;

mod health;
mod monitor;
mod roster;
mod store;

pub use health::Throughput;
pub use monitor::{FleetHealthMonitor, MonitorHandle, TickReport};
pub use roster::{AgentStatus, Roster};
pub use store::{FleetStore, MemoryStore};
