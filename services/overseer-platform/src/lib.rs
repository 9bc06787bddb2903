//! # Overseer Platform
//!
//! HTTP control plane around the fleet health monitor and the pipeline
//! compiler. Compiled configurations are pushed to agents by the
//! [`Distributor`].

pub mod distribution;
pub mod error;
pub mod routes;
pub mod state;

pub use distribution::{Distributor, PushOutcome};
pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, Deployment};
