//! Fixed-size table inventory with atomic claim and release.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::types::TableId;

/// Finite pool of tables, claimed one at a time by orders or seated guests.
///
/// Slots are 1-based to match table numbering on the floor. A slot is
/// unavailable exactly while one in-flight order or seated guest holds it;
/// single ownership on release is the caller's responsibility.
pub struct TableInventory {
    // true = available. Index 0 is table 1.
    slots: Mutex<Vec<bool>>,
    freed: Condvar,
}

impl TableInventory {
    /// Create an inventory with `count` available tables.
    pub fn new(count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![true; count]),
            freed: Condvar::new(),
        }
    }

    /// Number of tables in the inventory.
    pub fn len(&self) -> usize {
        let guard = self.slots.lock().expect("table mutex poisoned");
        guard.len()
    }

    /// Claim the lowest-numbered available table, without blocking.
    pub fn try_acquire(&self) -> Option<TableId> {
        let mut guard = self.slots.lock().expect("table mutex poisoned");
        let index = guard.iter().position(|&available| available)?;
        guard[index] = false;
        Some(index + 1)
    }

    /// Claim a specific table; false if it is taken or out of range.
    pub fn try_select(&self, table: TableId) -> bool {
        let mut guard = self.slots.lock().expect("table mutex poisoned");
        if table == 0 || table > guard.len() {
            return false;
        }
        if !guard[table - 1] {
            return false;
        }
        guard[table - 1] = false;
        true
    }

    /// Mark a table available again and wake anyone parked on the pool.
    pub fn release(&self, table: TableId) {
        let mut guard = self.slots.lock().expect("table mutex poisoned");
        debug_assert!(
            table >= 1 && table <= guard.len(),
            "table {table} out of range"
        );
        if let Some(slot) = guard.get_mut(table.wrapping_sub(1)) {
            *slot = true;
            self.freed.notify_all();
        }
    }

    /// Block until at least one table is available or the timeout elapses.
    ///
    /// Returns true when a table was available at wake-up. Used by workers
    /// that re-enqueued an order after a failed acquire, so retries park
    /// here instead of spinning on the queue.
    pub fn wait_for_release(&self, timeout: Duration) -> bool {
        let guard = self.slots.lock().expect("table mutex poisoned");
        let (guard, _timed_out) = self
            .freed
            .wait_timeout_while(guard, timeout, |slots| !slots.iter().any(|&a| a))
            .expect("condvar wait failed");
        guard.iter().any(|&available| available)
    }

    /// Snapshot of per-table availability, table 1 first.
    pub fn status(&self) -> Vec<bool> {
        let guard = self.slots.lock().expect("table mutex poisoned");
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn acquires_lowest_table_first() {
        let tables = TableInventory::new(3);
        assert_eq!(tables.try_acquire(), Some(1));
        assert_eq!(tables.try_acquire(), Some(2));
        tables.release(1);
        // Table 1 is free again and must win over table 3.
        assert_eq!(tables.try_acquire(), Some(1));
        assert_eq!(tables.try_acquire(), Some(3));
        assert_eq!(tables.try_acquire(), None);
    }

    #[test]
    fn select_rejects_taken_and_out_of_range() {
        let tables = TableInventory::new(5);
        assert!(tables.try_select(3));
        assert!(!tables.try_select(3));
        assert!(!tables.try_select(0));
        assert!(!tables.try_select(6));
        tables.release(3);
        assert!(tables.try_select(3));
    }

    #[test]
    fn no_table_is_ever_double_claimed() {
        let tables = Arc::new(TableInventory::new(2));
        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));
        let claims = Arc::new(AtomicUsize::new(0));
        let violation = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..contenders {
            let tables = Arc::clone(&tables);
            let barrier = Arc::clone(&barrier);
            let claims = Arc::clone(&claims);
            let violation = Arc::clone(&violation);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    if let Some(table) = tables.try_acquire() {
                        let held = claims.fetch_add(1, Ordering::SeqCst) + 1;
                        if held > 2 {
                            violation.store(true, Ordering::SeqCst);
                        }
                        claims.fetch_sub(1, Ordering::SeqCst);
                        tables.release(table);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().expect("contender thread panicked");
        }
        assert!(!violation.load(Ordering::SeqCst));
        assert_eq!(tables.status(), vec![true, true]);
    }

    #[test]
    fn release_wakes_waiter() {
        let tables = Arc::new(TableInventory::new(1));
        assert_eq!(tables.try_acquire(), Some(1));

        let waiter = {
            let tables = Arc::clone(&tables);
            thread::spawn(move || tables.wait_for_release(Duration::from_secs(5)))
        };
        // Give the waiter a moment to park before releasing.
        thread::sleep(Duration::from_millis(30));
        tables.release(1);
        assert!(waiter.join().expect("waiter thread panicked"));
    }

    #[test]
    fn wait_times_out_when_nothing_is_released() {
        let tables = TableInventory::new(1);
        assert_eq!(tables.try_acquire(), Some(1));
        assert!(!tables.wait_for_release(Duration::from_millis(20)));
    }
}
