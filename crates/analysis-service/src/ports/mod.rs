//! # Ports
//!
//! - [`AnalysisServiceApi`]: driving port, the call surface of the module.
//! - [`StateStore`]: driven port, where module snapshots are kept.

pub mod api;
pub mod database;

pub use api::*;
pub use database::*;
