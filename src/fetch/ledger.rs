//! Thread-safe collector of exhausted fetch failures

use serde::Serialize;
use std::sync::{Arc, Mutex};

/// One request that was given up on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub url: String,
    pub reason: String,
}

/// Run-scoped failure ledger
///
/// Created by the caller of a run and handed to the fetch client; clones share
/// the same records. Appends are synchronized because many workers can fail
/// at once. Recording a failure never aborts anything.
#[derive(Debug, Clone, Default)]
pub struct FailureLedger {
    records: Arc<Mutex<Vec<FailureRecord>>>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, url: &str, reason: impl Into<String>) {
        let record = FailureRecord {
            url: url.to_string(),
            reason: reason.into(),
        };
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }

    /// Copy of all records in the order they were recorded
    pub fn snapshot(&self) -> Vec<FailureRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
