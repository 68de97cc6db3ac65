//! The dispatch core: shared queue, table inventory, ledger, waiting list.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use crate::ledger::Ledger;
use crate::order_queue::OrderQueue;
use crate::tables::TableInventory;
use crate::types::{Order, OrderId, TableId};

/// Guests on hold after requesting an unavailable table.
const WAITING_LIST_CAPACITY: usize = 10;

/// Why an order submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("table {0} is unavailable")]
    TableUnavailable(TableId),
    #[error("the floor has shut down")]
    ShutDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("waiting list is full ({WAITING_LIST_CAPACITY} guests)")]
pub struct WaitingListFull;

/// Owns every piece of shared dispatch state. Passed by `Arc` to each worker
/// thread; no ambient globals.
pub struct DispatchFloor {
    queue: OrderQueue,
    tables: TableInventory,
    ledger: Ledger,
    waiting: Mutex<Vec<String>>,
    next_order_id: AtomicU64,
}

impl DispatchFloor {
    /// Create a floor with `table_count` available tables.
    pub fn new(table_count: usize) -> Self {
        Self {
            queue: OrderQueue::new(),
            tables: TableInventory::new(table_count),
            ledger: Ledger::new(),
            waiting: Mutex::new(Vec::new()),
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Submit a new order, optionally claiming a guest-chosen table first.
    ///
    /// A pre-assigned table is claimed atomically before the order is
    /// enqueued; if the claim fails the order is rejected, not enqueued, and
    /// the guest belongs on the waiting list. Orders without a table are
    /// seated later by the worker that dequeues them.
    pub fn submit_order(
        &self,
        items: Vec<String>,
        preassigned: Option<TableId>,
    ) -> Result<OrderId, SubmitError> {
        if let Some(table) = preassigned {
            if !self.tables.try_select(table) {
                debug!(table, "requested table unavailable");
                return Err(SubmitError::TableUnavailable(table));
            }
        }
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let order = Order::new(id, items, preassigned);
        if let Err(rejected) = self.queue.submit(order) {
            // Hand the claimed table back; the order never entered the queue.
            if let Some(table) = rejected.table {
                self.tables.release(table);
            }
            return Err(SubmitError::ShutDown);
        }
        info!(order = id, table = ?preassigned, "order submitted");
        Ok(id)
    }

    /// Put a guest on the bounded waiting list.
    ///
    /// Guests are never promoted back into the order queue automatically;
    /// they must resubmit once a table frees up.
    pub fn join_waiting_list(&self, guest: impl Into<String>) -> Result<(), WaitingListFull> {
        let mut guard = self.waiting.lock().expect("waiting list mutex poisoned");
        if guard.len() >= WAITING_LIST_CAPACITY {
            return Err(WaitingListFull);
        }
        guard.push(guest.into());
        Ok(())
    }

    /// Snapshot of the waiting list, oldest guest first.
    pub fn waiting_list(&self) -> Vec<String> {
        let guard = self.waiting.lock().expect("waiting list mutex poisoned");
        guard.clone()
    }

    /// Signal drain-and-stop to every worker. Non-blocking; callers join the
    /// worker handles separately. Idempotent.
    pub fn request_shutdown(&self) {
        info!("shutdown requested");
        self.queue.shutdown();
    }

    /// Read-only snapshot of finished orders for reporting.
    pub fn completed_orders(&self) -> Vec<Order> {
        self.ledger.snapshot()
    }

    /// Read-only snapshot of table availability, table 1 first.
    pub fn table_status(&self) -> Vec<bool> {
        self.tables.status()
    }

    /// Orders still waiting for a worker.
    pub fn pending_orders(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn queue(&self) -> &OrderQueue {
        &self.queue
    }

    /// Table pool accessor, also used by collaborators to release a table
    /// when a guest leaves.
    pub fn tables(&self) -> &TableInventory {
        &self.tables
    }

    pub(crate) fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
