//! # Shared Types Crate
//!
//! Primitive value types used by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: digests, identities, token ids and balances
//!   are defined once here.
//! - **Opaque Identity**: an [`Identity`] is compared and hashed as raw bytes;
//!   nothing in the workspace interprets it as a curve point.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
