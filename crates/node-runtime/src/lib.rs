//! # Node Runtime
//!
//! Host for the analysis module.
//!
//! ## Startup Sequence
//!
//! 1. Resolve options from environment and command line
//! 2. Initialize logging
//! 3. Load and validate the module configuration, bootstrap the module
//! 4. Restore the snapshot file, if one exists
//! 5. Execute the batch strictly in order
//! 6. Write the snapshot and print the report

pub mod config;
pub mod runner;

pub use config::{Args, NodeConfig, NodeConfigError};
pub use runner::{run_node, write_snapshot, BatchEntry, BatchReport, BatchRunner};
