//! Business logic services for clinic stock management

pub mod ledger;
pub mod notification;
pub mod order_locks;
pub mod purchase_order;

pub use ledger::StockLedger;
pub use notification::{LogNotifier, SupplierNotifier};
pub use order_locks::OrderLocks;
pub use purchase_order::PurchaseOrderService;
