//! mx-core: stable foundation for mixflow.
//!
//! Contains:
//! - units (uom time type + constructors, elapsed-time formatting)
//! - numeric (Real + tolerances + float helpers)
//! - thermal (ambient environment and the passive loss law shared by tanks and predictors)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod thermal;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{MxError, MxResult};
pub use numeric::*;
pub use thermal::ThermalEnvironment;
pub use units::*;
