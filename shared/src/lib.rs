//! Shared types and models for clinic stock management
//!
//! This crate contains the domain model, the reconciliation rules and input
//! validation shared between the backend, the dashboard (via WASM), and
//! other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
