//! Append-only record of finished orders.

use std::sync::Mutex;

use crate::types::Order;

/// Completed-order ledger: written by dispatch workers, read by reporting.
pub struct Ledger {
    completed: Mutex<Vec<Order>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Append a finished order. Entries are immutable once recorded.
    pub fn record(&self, order: Order) {
        debug_assert!(order.completed, "ledger entry not marked completed");
        let mut guard = self.completed.lock().expect("ledger mutex poisoned");
        guard.push(order);
    }

    /// Snapshot of all completed orders, in completion order.
    pub fn snapshot(&self) -> Vec<Order> {
        let guard = self.completed.lock().expect("ledger mutex poisoned");
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_completion_order() {
        let ledger = Ledger::new();
        for id in [3, 1, 2] {
            let mut order = Order::new(id, vec!["Pasta".to_string()], Some(1));
            order.completed = true;
            order.completed_by = Some(10);
            ledger.record(order);
        }
        let ids: Vec<u64> = ledger.snapshot().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
