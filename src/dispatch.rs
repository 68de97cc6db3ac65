//! Per-worker dispatch loops: dequeue, seat, execute, record.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::floor::DispatchFloor;
use crate::types::{OrderId, Role, TableId, Worker, WorkerId};

/// Upper bound on how long a worker parks after a failed table acquisition
/// before re-checking the queue. A `release` wakes it earlier.
const TABLE_RETRY_WAIT: Duration = Duration::from_millis(50);

/// A request for an explicit table choice, emitted by the Select Table
/// worker and answered by an external collaborator (a terminal prompt in
/// the original, any responder thread here).
pub struct TableChoice {
    pub order: OrderId,
    pub worker: WorkerId,
    /// Availability snapshot at the time of the request, table 1 first.
    pub status: Vec<bool>,
    /// Where the chosen table number goes.
    pub reply: mpsc::Sender<TableId>,
}

/// Spawn one named dispatch thread per worker. Threads run until shutdown
/// is requested and the queue has drained; the caller joins the handles.
pub fn start_dispatch(
    floor: &Arc<DispatchFloor>,
    workers: &[Worker],
    choices: &mpsc::Sender<TableChoice>,
    step: Duration,
) -> Vec<thread::JoinHandle<()>> {
    workers
        .iter()
        .map(|worker| {
            let floor = Arc::clone(floor);
            let worker = worker.clone();
            let choices = choices.clone();
            thread::Builder::new()
                .name(format!("worker-{}", worker.id))
                .spawn(move || run_worker(floor, worker, choices, step))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

/// The consume-allocate-execute-complete cycle for a single worker.
pub fn run_worker(
    floor: Arc<DispatchFloor>,
    worker: Worker,
    choices: mpsc::Sender<TableChoice>,
    step: Duration,
) {
    info!(worker = worker.id, role = %worker.role, "worker started");
    loop {
        // Blocks until an order arrives or shutdown drains the queue.
        let Some(mut order) = floor.queue().take_blocking() else {
            info!(worker = worker.id, "worker shutting down");
            return;
        };

        if order.table.is_none() {
            let seated = match worker.role {
                Role::SelectTable => choose_table(&floor, &worker, order.id, &choices),
                _ => floor.tables().try_acquire(),
            };
            match seated {
                Some(table) => order.table = Some(table),
                None => {
                    // No table free: back to the tail, then park until a
                    // release (or the retry window) instead of spinning.
                    debug!(worker = worker.id, order = order.id, "no table free, requeueing");
                    floor.queue().requeue(order);
                    floor.tables().wait_for_release(TABLE_RETRY_WAIT);
                    continue;
                }
            }
        }

        info!(
            worker = worker.id,
            name = %worker.name,
            order = order.id,
            table = order.table,
            "processing order"
        );

        // One step per item, strictly sequential within the order.
        for item in &order.items {
            perform_step(&worker, item, order.table);
            thread::sleep(step);
        }

        order.completed = true;
        order.completed_by = Some(worker.id);
        info!(worker = worker.id, order = order.id, "order completed");
        floor.ledger().record(order);
    }
}

/// Execute the worker's fixed task for one item.
fn perform_step(worker: &Worker, item: &str, table: Option<TableId>) {
    match worker.role {
        Role::Cook => info!(worker = worker.id, item, "cooking"),
        Role::Serve => info!(worker = worker.id, item, "serving"),
        Role::CleanTable => info!(worker = worker.id, table, "cleaning table"),
        Role::WashDishes => info!(worker = worker.id, table, "washing dishes for table"),
        Role::SelectTable => info!(worker = worker.id, table, "table set"),
    }
}

/// Obtain an explicit table choice for the Select Table role.
///
/// Re-prompts on out-of-range or already-taken choices until a free table
/// is claimed. Returns `None` only when the collaborator has hung up, in
/// which case the caller treats the order like a failed acquisition.
fn choose_table(
    floor: &DispatchFloor,
    worker: &Worker,
    order: OrderId,
    choices: &mpsc::Sender<TableChoice>,
) -> Option<TableId> {
    loop {
        let (reply, response) = mpsc::channel();
        let request = TableChoice {
            order,
            worker: worker.id,
            status: floor.tables().status(),
            reply,
        };
        if choices.send(request).is_err() {
            warn!(worker = worker.id, order, "table chooser gone");
            return None;
        }
        let Ok(choice) = response.recv() else {
            warn!(worker = worker.id, order, "table chooser gone");
            return None;
        };
        if choice == 0 || choice > floor.tables().len() {
            warn!(worker = worker.id, choice, "invalid table number, try again");
            continue;
        }
        if floor.tables().try_select(choice) {
            return Some(choice);
        }
        warn!(worker = worker.id, table = choice, "table unavailable, choose another");
    }
}
