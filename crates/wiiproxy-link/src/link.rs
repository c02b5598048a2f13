use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::sync::watch;
use tracing::{error, info};
use wiiproxy_command::{CommandTable, Kind, MspRecord, Values};
use wiiproxy_transport::{Transport, TransportError};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::request::{Completion, Priority, Request, RequestId};
use crate::scheduler::Scheduler;
use crate::snapshot::{SnapshotEntry, SnapshotStore};
use crate::worker::{Counters, LinkStats, Worker, WorkerExit, WorkerState};

/// State shared by the link, its handles and the worker thread.
pub(crate) struct Shared {
    pub(crate) scheduler: Scheduler,
    pub(crate) snapshots: SnapshotStore,
    pub(crate) table: Arc<CommandTable>,
    pub(crate) config: LinkConfig,
    pub(crate) state: watch::Sender<WorkerState>,
    pub(crate) stats: Counters,
    pub(crate) active: AtomicBool,
    pub(crate) stop: AtomicBool,
    pub(crate) fatal: Mutex<Option<LinkError>>,
    next_id: AtomicU64,
}

impl Shared {
    pub(crate) fn next_request_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn last_error(&self) -> Option<LinkError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_fatal(&self, err: Option<LinkError>) {
        *self.fatal.lock().unwrap_or_else(PoisonError::into_inner) = err;
    }
}

enum Phase<T> {
    Ready(T),
    Running(JoinHandle<WorkerExit<T>>),
    /// The transport was lost with a panicked or unspawned worker.
    Detached,
}

/// One MSP link to a flight controller.
///
/// Requests can be queued before [`start`](Self::start); they are served once
/// the worker runs. [`stop`](Self::stop) lets the request in flight finish,
/// fails everything still queued with [`LinkError::Stopped`], and keeps the
/// transport so the link can be started again. Dropping the link stops it.
///
/// ```no_run
/// use wiiproxy_command::{codes, multiwii};
/// use wiiproxy_link::{Link, LinkConfig};
/// use wiiproxy_transport::MemoryTransport;
///
/// let (transport, _handle) = MemoryTransport::new();
/// let mut link = Link::new(transport, multiwii()?, LinkConfig::default())?;
/// link.start()?;
/// let attitude = link.get(codes::ATTITUDE)?.wait()?;
/// println!("{attitude}");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Link<T: Transport + 'static> {
    handle: LinkHandle,
    phase: Phase<T>,
}

impl<T: Transport + 'static> Link<T> {
    /// Create a stopped link over `transport`.
    ///
    /// Fails if the configuration is invalid or a default command is not a
    /// registered get command.
    pub fn new(
        transport: T,
        table: impl Into<Arc<CommandTable>>,
        config: LinkConfig,
    ) -> Result<Self> {
        config.validate()?;
        let table = table.into();
        for &code in &config.default_commands {
            let descriptor = table.lookup(code)?;
            if descriptor.kind() != Kind::Get {
                return Err(LinkError::InvalidConfig(format!(
                    "default command {code} ({}) is not a get command",
                    descriptor.name()
                )));
            }
        }

        let shared = Arc::new(Shared {
            scheduler: Scheduler::new(config.queue_capacity),
            snapshots: SnapshotStore::new(),
            table,
            config,
            state: watch::channel(WorkerState::Stopped).0,
            stats: Counters::default(),
            active: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            fatal: Mutex::new(None),
            next_id: AtomicU64::new(1),
        });

        Ok(Self {
            handle: LinkHandle { shared },
            phase: Phase::Ready(transport),
        })
    }

    /// Start the worker. Does nothing if it is already running.
    ///
    /// A link whose worker stopped on a transport failure can be started
    /// again; the failure is cleared.
    pub fn start(&mut self) -> Result<()> {
        let active = self.handle.shared.active.load(Ordering::Acquire);
        if active && matches!(&self.phase, Phase::Running(worker) if !worker.is_finished()) {
            return Ok(());
        }
        self.join_worker();

        let Phase::Ready(transport) = std::mem::replace(&mut self.phase, Phase::Detached) else {
            return Err(LinkError::Stopped);
        };

        let shared = &self.handle.shared;
        shared.scheduler.reopen();
        shared.set_fatal(None);
        shared.stop.store(false, Ordering::Release);
        shared.active.store(true, Ordering::Release);
        shared.state.send_replace(WorkerState::Idle);

        let name = transport.name().to_string();
        let worker = Worker::new(transport, Arc::clone(shared));
        match thread::Builder::new()
            .name("wiiproxy-link".to_string())
            .spawn(move || worker.run())
        {
            Ok(worker) => {
                self.phase = Phase::Running(worker);
                info!(transport = %name, "link started");
                Ok(())
            }
            Err(err) => {
                shared.active.store(false, Ordering::Release);
                shared.state.send_replace(WorkerState::Stopped);
                Err(LinkError::Transport(Arc::new(TransportError::Io(err))))
            }
        }
    }

    /// Stop the worker and fail every queued request. Idempotent.
    pub fn stop(&mut self) {
        let shared = &self.handle.shared;
        shared.stop.store(true, Ordering::Release);
        for request in shared.scheduler.close() {
            request.resolve(Err(LinkError::Stopped));
        }

        let was_running = matches!(self.phase, Phase::Running(_));
        self.join_worker();
        let shared = &self.handle.shared;
        shared.active.store(false, Ordering::Release);
        shared.state.send_replace(WorkerState::Stopped);
        if was_running {
            info!("link stopped");
        }
    }

    fn join_worker(&mut self) {
        if !matches!(self.phase, Phase::Running(_)) {
            return;
        }
        let Phase::Running(worker) = std::mem::replace(&mut self.phase, Phase::Detached) else {
            return;
        };
        match worker.join() {
            Ok(exit) => {
                if let Some(err) = exit.error {
                    info!(error = %err, "link worker exited after failure");
                }
                self.phase = Phase::Ready(exit.transport);
            }
            Err(_) => error!("link worker panicked; transport lost"),
        }
    }

    /// Stop the link and take the transport back.
    ///
    /// Returns `None` if the worker panicked and the transport was lost.
    pub fn into_transport(mut self) -> Option<T> {
        self.stop();
        match std::mem::replace(&mut self.phase, Phase::Detached) {
            Phase::Ready(transport) => Some(transport),
            _ => None,
        }
    }

    /// A cloneable handle for submitting requests from other threads.
    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    pub fn submit(
        &self,
        code: u8,
        values: Option<Values>,
        priority: Priority,
    ) -> Result<Completion> {
        self.handle.submit(code, values, priority)
    }

    pub fn get(&self, code: u8) -> Result<Completion> {
        self.handle.get(code)
    }

    pub fn set(&self, code: u8, values: Values) -> Result<Completion> {
        self.handle.set(code, values)
    }

    pub fn request_record<R: MspRecord>(&self) -> Result<R> {
        self.handle.request_record()
    }

    pub fn send_record<R: MspRecord>(&self, record: &R) -> Result<Completion> {
        self.handle.send_record(record)
    }

    pub fn snapshot(&self, code: u8) -> Option<Arc<SnapshotEntry>> {
        self.handle.snapshot(code)
    }

    pub fn snapshot_record<R: MspRecord>(&self) -> Result<Option<R>> {
        self.handle.snapshot_record()
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        self.handle.snapshots()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    pub fn state(&self) -> WorkerState {
        self.handle.state()
    }

    pub fn stats(&self) -> LinkStats {
        self.handle.stats()
    }

    pub fn last_error(&self) -> Option<LinkError> {
        self.handle.last_error()
    }
}

impl<T: Transport + 'static> Drop for Link<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T: Transport + 'static> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Ready(_) => "ready",
            Phase::Running(_) => "running",
            Phase::Detached => "detached",
        };
        f.debug_struct("Link")
            .field("phase", &phase)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Cloneable access to a running link.
///
/// Handles stay valid after the link is dropped; submissions then fail with
/// [`LinkError::Stopped`].
#[derive(Clone)]
pub struct LinkHandle {
    shared: Arc<Shared>,
}

impl LinkHandle {
    /// Queue a request for `code`.
    ///
    /// Get commands take no values; set commands need values matching their
    /// layout. Fails with [`LinkError::QueueFull`] when the queue is at
    /// capacity, or with the stored transport error if the link has failed.
    pub fn submit(
        &self,
        code: u8,
        values: Option<Values>,
        priority: Priority,
    ) -> Result<Completion> {
        let shared = &self.shared;
        let descriptor = shared.table.lookup(code)?;
        let id = shared.next_request_id();
        let (request, rx) = Request::new(id, descriptor, values, priority)?;

        match shared.scheduler.enqueue(request) {
            Ok(()) => Ok(Completion::new(id, code, rx, Arc::downgrade(shared))),
            Err(LinkError::Stopped) => Err(shared.last_error().unwrap_or(LinkError::Stopped)),
            Err(err) => Err(err),
        }
    }

    /// Queue a get request at the configured default priority.
    pub fn get(&self, code: u8) -> Result<Completion> {
        self.submit(code, None, self.shared.config.default_priority)
    }

    /// Queue a set request at the configured default priority.
    pub fn set(&self, code: u8, values: Values) -> Result<Completion> {
        self.submit(code, Some(values), self.shared.config.default_priority)
    }

    /// Fetch a record and wait for it. Blocks the calling thread.
    pub fn request_record<R: MspRecord>(&self) -> Result<R> {
        let values = self.get(R::CODE)?.wait()?;
        Ok(R::from_values(&values)?)
    }

    /// Queue a set request carrying `record`.
    pub fn send_record<R: MspRecord>(&self, record: &R) -> Result<Completion> {
        self.set(R::CODE, record.to_values())
    }

    /// Latest reply for `code`, if any.
    pub fn snapshot(&self, code: u8) -> Option<Arc<SnapshotEntry>> {
        self.shared.snapshots.get(code)
    }

    /// Latest reply for `R`, as a record.
    pub fn snapshot_record<R: MspRecord>(&self) -> Result<Option<R>> {
        self.snapshot(R::CODE)
            .map(|entry| entry.record::<R>())
            .transpose()
            .map_err(LinkError::from)
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.shared.snapshots
    }

    /// Whether the worker is running.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.state.borrow()
    }

    /// Watch worker state changes.
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.shared.state.subscribe()
    }

    pub fn stats(&self) -> LinkStats {
        self.shared.stats.snapshot()
    }

    pub fn table(&self) -> &Arc<CommandTable> {
        &self.shared.table
    }

    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    /// Number of requests waiting to be sent.
    pub fn queued(&self) -> usize {
        self.shared.scheduler.len()
    }

    /// The transport error that stopped the worker, if it failed.
    pub fn last_error(&self) -> Option<LinkError> {
        self.shared.last_error()
    }
}

impl fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkHandle")
            .field("active", &self.is_active())
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish()
    }
}
