use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// One tracked query, added on start and removed on completion (§4.2, §5).
#[derive(Debug, Clone)]
pub struct ActiveQuery {
    pub id: u64,
    pub started_at: Instant,
    pub sql_prefix: String,
    pub backend_pid: Option<i32>,
    pub cancelled: bool,
}

const SQL_PREFIX_LEN: usize = 80;

/// A small concurrent mapping from query id to its tracking entry (§5.3). A
/// single mutex is sufficient; contention is bounded by pool size.
pub struct ActiveQueryTable {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, ActiveQuery>>,
}

impl Default for ActiveQueryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveQueryTable {
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), entries: Mutex::new(HashMap::new()) }
    }

    pub fn track(&self, sql: &str, backend_pid: Option<i32>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let sql_prefix = sql.chars().take(SQL_PREFIX_LEN).collect();
        let entry = ActiveQuery { id, started_at: Instant::now(), sql_prefix, backend_pid, cancelled: false };
        self.entries.lock().expect("active query table mutex poisoned").insert(id, entry);
        id
    }

    pub fn untrack(&self, id: u64) {
        self.entries.lock().expect("active query table mutex poisoned").remove(&id);
    }

    pub fn mark_cancelled(&self, id: u64) {
        if let Some(entry) = self.entries.lock().expect("active query table mutex poisoned").get_mut(&id) {
            entry.cancelled = true;
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.lock().expect("active query table mutex poisoned").len()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ActiveQuery> {
        self.entries.lock().expect("active query table mutex poisoned").values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_then_untrack_returns_count_to_zero() {
        let table = ActiveQueryTable::new();
        let id = table.track("SELECT 1", None);
        assert_eq!(table.count(), 1);
        table.untrack(id);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn sql_prefix_is_truncated() {
        let table = ActiveQueryTable::new();
        let long_sql = "SELECT ".to_string() + &"x".repeat(200);
        let id = table.track(&long_sql, None);
        let snapshot = table.snapshot();
        let entry = snapshot.iter().find(|e| e.id == id).unwrap();
        assert_eq!(entry.sql_prefix.len(), SQL_PREFIX_LEN);
    }

    #[test]
    fn mark_cancelled_flips_flag() {
        let table = ActiveQueryTable::new();
        let id = table.track("SELECT 1", Some(42));
        table.mark_cancelled(id);
        let snapshot = table.snapshot();
        assert!(snapshot.iter().find(|e| e.id == id).unwrap().cancelled);
    }
}
