//! Priority queue with single-flight per command code.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{LinkError, Result};
use crate::request::{Priority, Request, RequestId};

#[derive(Debug, Default)]
struct QueueState {
    /// Keyed by priority, then submission order.
    queue: BTreeMap<(Priority, u64), Request>,
    in_flight: HashSet<u8>,
    next_seq: u64,
    closed: bool,
}

/// Pending requests, ordered by priority then submission order.
///
/// A request is eligible only while no other request with the same code is
/// in flight. Ineligible requests keep their place and are skipped.
#[derive(Debug)]
pub struct Scheduler {
    state: Mutex<QueueState>,
    available: Condvar,
    capacity: usize,
}

impl Scheduler {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a request. On failure the request is dropped unresolved.
    pub fn enqueue(&self, request: Request) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(LinkError::Stopped);
        }
        if state.queue.len() >= self.capacity {
            return Err(LinkError::QueueFull {
                capacity: self.capacity,
            });
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        trace!(id = %request.id(), code = request.code(), priority = request.priority().0, "enqueued");
        state.queue.insert((request.priority(), seq), request);
        drop(state);
        self.available.notify_all();
        Ok(())
    }

    /// Take the first eligible request and mark its code in flight.
    pub fn dequeue_next(&self) -> Option<Request> {
        let mut state = self.lock();
        Self::take_eligible(&mut state)
    }

    fn take_eligible(state: &mut QueueState) -> Option<Request> {
        if state.closed {
            return None;
        }
        let key = state
            .queue
            .iter()
            .find(|(_, request)| !state.in_flight.contains(&request.code()))
            .map(|(key, _)| *key)?;
        let request = state.queue.remove(&key)?;
        state.in_flight.insert(request.code());
        Some(request)
    }

    /// Like [`dequeue_next`](Self::dequeue_next), but wait up to `timeout`
    /// for an eligible request. Returns `None` on timeout or close.
    pub fn wait_next(&self, timeout: Duration) -> Option<Request> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(request) = Self::take_eligible(&mut state) {
                return Some(request);
            }
            if state.closed {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            state = self
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Release the in-flight slot for `code`.
    pub fn complete(&self, code: u8) {
        let mut state = self.lock();
        state.in_flight.remove(&code);
        drop(state);
        self.available.notify_all();
    }

    /// Remove a queued request and resolve it with [`LinkError::Cancelled`].
    pub fn cancel(&self, id: RequestId) -> bool {
        let mut state = self.lock();
        let key = state
            .queue
            .iter()
            .find(|(_, request)| request.id() == id)
            .map(|(key, _)| *key);
        let request = key.and_then(|key| state.queue.remove(&key));
        drop(state);

        match request {
            Some(request) => {
                trace!(%id, code = request.code(), "cancelled");
                request.resolve(Err(LinkError::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Refuse new requests and hand back everything still queued, in order.
    pub fn close(&self) -> Vec<Request> {
        let mut state = self.lock();
        state.closed = true;
        let drained = std::mem::take(&mut state.queue).into_values().collect();
        drop(state);
        self.available.notify_all();
        drained
    }

    /// Accept requests again after [`close`](Self::close).
    pub fn reopen(&self) {
        let mut state = self.lock();
        state.closed = false;
        state.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Codes currently in flight, ascending.
    pub fn in_flight(&self) -> Vec<u8> {
        let mut codes: Vec<u8> = self.lock().in_flight.iter().copied().collect();
        codes.sort_unstable();
        codes
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use tokio::sync::oneshot;
    use wiiproxy_command::{CommandTable, Descriptor, Layout, Values};

    use super::*;

    type Rx = oneshot::Receiver<Result<Values>>;

    fn descriptor(code: u8) -> Arc<Descriptor> {
        CommandTable::builder()
            .register(code, Layout::empty())
            .unwrap()
    }

    fn request(id: u64, code: u8, priority: u8) -> (Request, Rx) {
        Request::new(RequestId(id), descriptor(code), None, Priority(priority)).unwrap()
    }

    fn served_order(scheduler: &Scheduler) -> Vec<u64> {
        let mut order = Vec::new();
        while let Some(request) = scheduler.dequeue_next() {
            order.push(request.id().0);
            scheduler.complete(request.code());
        }
        order
    }

    #[test]
    fn lower_priority_value_first() {
        let scheduler = Scheduler::new(10);
        for (id, priority) in [(1, 5), (2, 1), (3, 3)] {
            scheduler.enqueue(request(id, 100 + id as u8, priority).0).unwrap();
        }
        assert_eq!(served_order(&scheduler), vec![2, 3, 1]);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let scheduler = Scheduler::new(10);
        for id in 1..=4 {
            scheduler.enqueue(request(id, 100 + id as u8, 7).0).unwrap();
        }
        assert_eq!(served_order(&scheduler), vec![1, 2, 3, 4]);
    }

    #[test]
    fn one_request_per_code_in_flight() {
        let scheduler = Scheduler::new(10);
        scheduler.enqueue(request(1, 108, 1).0).unwrap();
        scheduler.enqueue(request(2, 108, 1).0).unwrap();
        scheduler.enqueue(request(3, 109, 9).0).unwrap();

        let first = scheduler.dequeue_next().unwrap();
        assert_eq!(first.id(), RequestId(1));
        assert_eq!(scheduler.in_flight(), vec![108]);

        // Code 108 is busy, so the lower-priority 109 goes next.
        let second = scheduler.dequeue_next().unwrap();
        assert_eq!(second.id(), RequestId(3));
        assert!(scheduler.dequeue_next().is_none());

        scheduler.complete(108);
        assert_eq!(scheduler.dequeue_next().unwrap().id(), RequestId(2));
    }

    #[test]
    fn full_queue_rejects() {
        let scheduler = Scheduler::new(2);
        scheduler.enqueue(request(1, 101, 1).0).unwrap();
        scheduler.enqueue(request(2, 102, 1).0).unwrap();
        assert!(matches!(
            scheduler.enqueue(request(3, 103, 1).0),
            Err(LinkError::QueueFull { capacity: 2 })
        ));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn cancel_resolves_queued_request() {
        let scheduler = Scheduler::new(10);
        let (req, mut rx) = request(1, 101, 1);
        scheduler.enqueue(req).unwrap();

        assert!(scheduler.cancel(RequestId(1)));
        assert!(!scheduler.cancel(RequestId(1)));
        assert!(matches!(rx.try_recv(), Ok(Err(LinkError::Cancelled))));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn close_drains_and_refuses() {
        let scheduler = Scheduler::new(10);
        scheduler.enqueue(request(1, 101, 9).0).unwrap();
        scheduler.enqueue(request(2, 102, 1).0).unwrap();

        let drained: Vec<u64> = scheduler.close().iter().map(|r| r.id().0).collect();
        assert_eq!(drained, vec![2, 1]);
        assert!(scheduler.is_closed());
        assert!(matches!(
            scheduler.enqueue(request(3, 103, 1).0),
            Err(LinkError::Stopped)
        ));
        assert!(scheduler.wait_next(Duration::from_secs(5)).is_none());

        scheduler.reopen();
        scheduler.enqueue(request(4, 104, 1).0).unwrap();
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn wait_next_wakes_on_enqueue() {
        let scheduler = Arc::new(Scheduler::new(10));
        let producer = {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                let (req, rx) = request(1, 101, 1);
                scheduler.enqueue(req).unwrap();
                rx
            })
        };

        let request = scheduler.wait_next(Duration::from_secs(5));
        assert_eq!(request.map(|r| r.id()), Some(RequestId(1)));
        producer.join().unwrap();
    }

    #[test]
    fn wait_next_times_out() {
        let scheduler = Scheduler::new(10);
        let started = Instant::now();
        assert!(scheduler.wait_next(Duration::from_millis(20)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
