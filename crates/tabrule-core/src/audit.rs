//! Append-only audit log.
//!
//! Every pipeline step and every rule-management call appends one
//! [`AuditEntry`]. Entries are never updated or removed; the log only grows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tabrule_model::{AuditEntry, AuditOperation, AuditStatus, Caller};
use tracing::debug;

/// Shared audit trail, safe for concurrent writers.
///
/// Clones share the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
    next_id: Arc<AtomicU64>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its id.
    pub fn record(
        &self,
        file_id: &str,
        caller: &Caller,
        operation: AuditOperation,
        status: AuditStatus,
        details: impl Into<String>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = AuditEntry {
            id,
            file_id: file_id.to_string(),
            caller: caller.clone(),
            operation,
            status,
            details: details.into(),
            timestamp: Utc::now(),
        };
        debug!(
            id,
            file_id,
            operation = operation.as_str(),
            status = ?status,
            "audit entry"
        );
        // Appends never leave the vector half-written, so a poisoned lock
        // still guards a consistent log.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry);
        id
    }

    pub fn success(
        &self,
        file_id: &str,
        caller: &Caller,
        operation: AuditOperation,
        details: impl Into<String>,
    ) -> u64 {
        self.record(file_id, caller, operation, AuditStatus::Success, details)
    }

    pub fn failure(
        &self,
        file_id: &str,
        caller: &Caller,
        operation: AuditOperation,
        details: impl Into<String>,
    ) -> u64 {
        self.record(file_id, caller, operation, AuditStatus::Failure, details)
    }

    /// Page through entries, newest first.
    pub fn entries(&self, limit: usize, offset: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        // Concurrent writers may append slightly out of id order.
        let mut ordered: Vec<&AuditEntry> = entries.iter().collect();
        ordered.sort_by(|a, b| b.id.cmp(&a.id));
        ordered.into_iter().skip(offset).take(limit).cloned().collect()
    }

    /// All entries of one file, oldest first.
    pub fn for_file(&self, file_id: &str) -> Vec<AuditEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<AuditEntry> = entries
            .iter()
            .filter(|entry| entry.file_id == file_id)
            .cloned()
            .collect();
        found.sort_by_key(|entry| entry.id);
        found
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_page_newest_first() {
        let log = AuditLog::new();
        let caller = Caller::new("u1", "analyst");
        for n in 0..5 {
            log.success("f1", &caller, AuditOperation::Normalize, format!("step {n}"));
        }
        let page = log.entries(2, 1);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].details, "step 3");
        assert_eq!(page[1].details, "step 2");
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn concurrent_writers_keep_every_entry() {
        let log = AuditLog::new();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        log.failure(&format!("f{n}"), &Caller::system(), AuditOperation::Clean, "x");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 200);
        assert_eq!(log.for_file("f3").len(), 25);
    }
}
