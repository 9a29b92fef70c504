//! # Domain Layer
//!
//! Pure state-transition logic: no I/O, no clocks, no locks. External
//! interactions go through the `ports` module.

pub mod entities;
pub mod errors;
pub mod ledger;
pub mod merkle;
pub mod state;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use ledger::*;
pub use merkle::*;
pub use state::*;
pub use value_objects::*;
