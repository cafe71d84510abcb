//! Domain models for clinic stock management

mod purchase_order;
pub mod reconciliation;
mod stock;

pub use purchase_order::*;
pub use reconciliation::{CoverageError, LineClassification, ReceiptLine};
pub use stock::*;
