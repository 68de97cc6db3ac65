//! Thread-safe FIFO order queue with blocking, shutdown-aware consumers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::types::Order;

/// A minimal, synchronized FIFO queue of pending orders.
///
/// Doubles as the shutdown coordinator: `shutdown` sets a one-way flag and
/// broadcasts to every blocked consumer, which then drain the remaining
/// orders before exiting.
pub struct OrderQueue {
    inner: Mutex<OrderQueueState>,
    pending: Condvar,
}

struct OrderQueueState {
    queue: VecDeque<Order>,
    shut_down: bool,
}

impl OrderQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(OrderQueueState {
                queue: VecDeque::new(),
                shut_down: false,
            }),
            pending: Condvar::new(),
        }
    }

    /// Append an order; returns the order back if shutdown was requested.
    pub fn submit(&self, order: Order) -> Result<(), Order> {
        let mut guard = self.inner.lock().expect("order queue mutex poisoned");
        if guard.shut_down {
            return Err(order);
        }
        guard.queue.push_back(order);
        self.pending.notify_one();
        Ok(())
    }

    /// Re-append an order a worker could not seat.
    ///
    /// Unlike `submit`, this is allowed during shutdown: a draining worker
    /// must never lose an order it has already taken off the queue.
    pub fn requeue(&self, order: Order) {
        let mut guard = self.inner.lock().expect("order queue mutex poisoned");
        guard.queue.push_back(order);
        self.pending.notify_one();
    }

    /// Block until an order is available or the queue has shut down.
    ///
    /// Returns `None` only once shutdown has been signalled *and* the queue
    /// is empty, so queued orders are always drained first.
    pub fn take_blocking(&self) -> Option<Order> {
        let mut guard = self.inner.lock().expect("order queue mutex poisoned");
        loop {
            if let Some(order) = guard.queue.pop_front() {
                return Some(order);
            }
            if guard.shut_down {
                return None;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.pending.wait(guard).expect("condvar wait failed");
        }
    }

    /// Signal shutdown and wake every blocked consumer. Idempotent.
    pub fn shutdown(&self) {
        let mut guard = self.inner.lock().expect("order queue mutex poisoned");
        guard.shut_down = true;
        self.pending.notify_all();
    }

    /// Current number of pending orders.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("order queue mutex poisoned");
        guard.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn order(id: u64) -> Order {
        Order::new(id, vec![format!("item-{id}")], None)
    }

    #[test]
    fn orders_come_out_in_submission_order() {
        let queue = OrderQueue::new();
        for id in 1..=5 {
            queue.submit(order(id)).expect("queue shut down");
        }
        for id in 1..=5 {
            assert_eq!(queue.take_blocking().map(|o| o.id), Some(id));
        }
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn requeue_goes_to_the_tail() {
        let queue = OrderQueue::new();
        queue.submit(order(1)).expect("queue shut down");
        queue.submit(order(2)).expect("queue shut down");
        let first = queue.take_blocking().expect("queue shut down");
        queue.requeue(first);
        assert_eq!(queue.take_blocking().map(|o| o.id), Some(2));
        assert_eq!(queue.take_blocking().map(|o| o.id), Some(1));
    }

    #[test]
    fn take_blocking_wakes_on_submit() {
        let queue = Arc::new(OrderQueue::new());
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("send ready");
            let taken = queue_clone.take_blocking().expect("queue shut down");
            tx.send(taken.id).expect("send order id");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        // Submitting after the consumer blocks should wake it.
        queue.submit(order(99)).expect("queue shut down");

        let received = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("receive order id");
        assert_eq!(received, 99);
        handle.join().expect("blocking take thread panicked");
    }

    #[test]
    fn blocking_consumers_each_get_unique_order() {
        let queue = Arc::new(OrderQueue::new());
        let consumers = 4;
        let barrier = Arc::new(Barrier::new(consumers));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let ready_tx = ready_tx.clone();
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                ready_tx.send(()).expect("ready");
                let taken = queue.take_blocking().expect("queue shut down");
                done_tx.send(taken.id).expect("done");
            }));
        }

        for _ in 0..consumers {
            ready_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("ready recv");
        }

        // Provide exactly one order per consumer.
        for id in 0..consumers as u64 {
            queue.submit(order(id)).expect("queue shut down");
        }

        let mut seen = HashSet::new();
        for _ in 0..consumers {
            let id = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("done recv");
            assert!(seen.insert(id));
        }

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn take_blocking_unblocks_on_shutdown() {
        let queue = Arc::new(OrderQueue::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("ready");
            let taken = queue_clone.take_blocking();
            done_tx.send(taken.is_none()).expect("done");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        queue.shutdown();

        let stopped = done_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("done recv");
        assert!(stopped);
        handle.join().expect("consumer thread panicked");
    }

    #[test]
    fn queued_orders_are_drained_before_stopping() {
        let queue = OrderQueue::new();
        queue.submit(order(1)).expect("queue shut down");
        queue.submit(order(2)).expect("queue shut down");
        queue.shutdown();
        assert_eq!(queue.take_blocking().map(|o| o.id), Some(1));
        assert_eq!(queue.take_blocking().map(|o| o.id), Some(2));
        assert!(queue.take_blocking().is_none());
    }

    #[test]
    fn submit_fails_after_shutdown_but_requeue_succeeds() {
        let queue = OrderQueue::new();
        queue.shutdown();
        assert!(queue.submit(order(1)).is_err());
        queue.requeue(order(2));
        assert_eq!(queue.take_blocking().map(|o| o.id), Some(2));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let queue = Arc::new(OrderQueue::new());
        queue.shutdown();
        queue.shutdown();
        assert!(queue.take_blocking().is_none());
    }
}
