//! en-core: stable foundation for ensrun.
//!
//! Contains:
//! - ids (report-step alias)
//! - state (storage-state selector shared by run and storage layers)

pub mod ids;
pub mod state;

// Re-exports: nice ergonomics for downstream crates
pub use ids::*;
pub use state::StateKind;
