//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use csm_backend::services::notification::{SupplierNotice, SupplierNotifier};

/// Notifier that keeps every notice in memory, for inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SupplierNotice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SupplierNotice> {
        self.sent.lock().unwrap().clone()
    }
}

impl SupplierNotifier for RecordingNotifier {
    fn notify(&self, notice: SupplierNotice) {
        self.sent.lock().unwrap().push(notice);
    }
}
