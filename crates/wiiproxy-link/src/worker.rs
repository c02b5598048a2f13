//! The thread that owns the transport.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread;

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};
use wiiproxy_command::{assemble, decode_values, Values};
use wiiproxy_frame::{Direction, FrameError, FrameReader, FrameWriter};
use wiiproxy_transport::Transport;

use crate::error::{LinkError, Result};
use crate::link::Shared;
use crate::request::{Priority, Request};

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Sending,
    AwaitingResponse,
    Decoding,
    Publishing,
    Resync,
    Stopped,
}

impl WorkerState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::AwaitingResponse => "awaiting_response",
            Self::Decoding => "decoding",
            Self::Publishing => "publishing",
            Self::Resync => "resync",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters since the link was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStats {
    pub completed: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub corrupt_frames: u64,
    pub resyncs: u64,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub filler_polls: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    timeouts: AtomicU64,
    corrupt_frames: AtomicU64,
    resyncs: AtomicU64,
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    filler_polls: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl Counters {
    pub(crate) fn snapshot(&self) -> LinkStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        LinkStats {
            completed: load(&self.completed),
            failed: load(&self.failed),
            timeouts: load(&self.timeouts),
            corrupt_frames: load(&self.corrupt_frames),
            resyncs: load(&self.resyncs),
            bytes_written: load(&self.bytes_written),
            bytes_read: load(&self.bytes_read),
            filler_polls: load(&self.filler_polls),
        }
    }
}

/// Returned when the worker thread ends, so the transport can be reused.
pub(crate) struct WorkerExit<T> {
    pub(crate) transport: T,
    pub(crate) error: Option<LinkError>,
}

pub(crate) struct Worker<T> {
    transport: T,
    shared: Arc<Shared>,
    reader: FrameReader,
    writer: FrameWriter,
    rotation: usize,
}

impl<T: Transport> Worker<T> {
    pub(crate) fn new(transport: T, shared: Arc<Shared>) -> Self {
        Self {
            transport,
            shared,
            reader: FrameReader::new(Direction::ControllerToHost),
            writer: FrameWriter::new(),
            rotation: 0,
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.shared.state.send_replace(state);
    }

    pub(crate) fn run(mut self) -> WorkerExit<T> {
        let shared = Arc::clone(&self.shared);
        info!(transport = self.transport.name(), "link worker started");

        let mut error = None;
        while !shared.stop.load(Ordering::Acquire) && !shared.scheduler.is_closed() {
            self.set_state(WorkerState::Idle);
            let Some(request) = shared.scheduler.wait_next(shared.config.idle_interval) else {
                self.enqueue_filler();
                continue;
            };

            let code = request.code();
            trace!(id = %request.id(), code, waited = ?request.age(), "serving request");
            let outcome = self.transact(&request);
            shared.scheduler.complete(code);

            match outcome {
                Ok(values) => request.resolve(Ok(values)),
                Err(err) if err.is_fatal() => {
                    bump(&shared.stats.failed, 1);
                    // Mark the link inactive before anyone observes the failure.
                    self.fail_all(&err);
                    request.resolve(Err(err.clone()));
                    error = Some(err);
                    break;
                }
                Err(err) => {
                    bump(&shared.stats.failed, 1);
                    debug!(code, error = %err, "request failed");
                    request.resolve(Err(err));
                }
            }
        }

        self.set_state(WorkerState::Stopped);
        info!(transport = self.transport.name(), "link worker stopped");
        WorkerExit {
            transport: self.transport,
            error,
        }
    }

    /// One request/response cycle.
    fn transact(&mut self, request: &Request) -> Result<Values> {
        let code = request.code();
        let config = &self.shared.config;
        let (read_timeout, write_delay) = (config.read_timeout, config.write_delay);

        self.set_state(WorkerState::Sending);
        let wire = assemble(request.descriptor(), request.values())?;
        let written = self.writer.write_bytes(&mut self.transport, &wire)?;
        bump(&self.shared.stats.bytes_written, written as u64);
        if !write_delay.is_zero() {
            thread::sleep(write_delay);
        }

        self.set_state(WorkerState::AwaitingResponse);
        let frame = match self.reader.read_frame(&mut self.transport, read_timeout) {
            Ok(frame) => frame,
            Err(err) => {
                let err = LinkError::from(err);
                match &err {
                    LinkError::Timeout(_) => {
                        bump(&self.shared.stats.timeouts, 1);
                        warn!(code, timeout = ?read_timeout, "no response");
                        self.resync()?;
                    }
                    // The error frame was consumed whole; the stream is in sync.
                    LinkError::Frame(FrameError::ErrorResponse { .. }) => {
                        debug!(code, "controller rejected command");
                    }
                    LinkError::Frame(frame_err) => {
                        bump(&self.shared.stats.corrupt_frames, 1);
                        warn!(code, error = %frame_err, "corrupt response");
                        self.resync()?;
                    }
                    _ => {}
                }
                return Err(err);
            }
        };
        bump(&self.shared.stats.bytes_read, frame.wire_size() as u64);

        self.set_state(WorkerState::Decoding);
        if frame.code != code {
            warn!(expected = code, found = frame.code, "response for another command");
            self.resync()?;
            return Err(LinkError::UnexpectedResponse {
                expected: code,
                found: frame.code,
            });
        }
        let values = match decode_values(request.descriptor(), &frame) {
            Ok(values) => values,
            Err(err) => {
                bump(&self.shared.stats.corrupt_frames, 1);
                warn!(code, error = %err, "response does not match layout");
                self.resync()?;
                return Err(err.into());
            }
        };

        self.set_state(WorkerState::Publishing);
        let entry = self.shared.snapshots.publish(code, values.clone());
        bump(&self.shared.stats.completed, 1);
        debug!(code, version = entry.version, values = %values, "snapshot updated");
        Ok(values)
    }

    /// Drop everything buffered on both sides of the link.
    fn resync(&mut self) -> Result<()> {
        self.set_state(WorkerState::Resync);
        bump(&self.shared.stats.resyncs, 1);
        let dropped = self.reader.clear();
        debug!(dropped, "resynchronising link");
        self.transport.reset_input_buffer()?;
        self.transport.reset_output_buffer()?;
        Ok(())
    }

    /// Queue the next default command, round-robin.
    fn enqueue_filler(&mut self) {
        let shared = &self.shared;
        let commands = &shared.config.default_commands;
        if commands.is_empty() || shared.stop.load(Ordering::Acquire) {
            return;
        }
        let code = commands[self.rotation % commands.len()];
        self.rotation = self.rotation.wrapping_add(1);

        let Ok(descriptor) = shared.table.lookup(code) else {
            return;
        };
        // Nobody waits on a filler; its reply only refreshes the snapshot.
        match Request::new(shared.next_request_id(), descriptor, None, Priority::FILLER) {
            Ok((request, _rx)) => {
                if shared.scheduler.enqueue(request).is_ok() {
                    bump(&shared.stats.filler_polls, 1);
                }
            }
            Err(err) => debug!(code, error = %err, "cannot poll default command"),
        }
    }

    /// Stop serving and fail every queued request with `err`.
    fn fail_all(&self, err: &LinkError) {
        error!(error = %err, "link failed; stopping worker");
        *self
            .shared
            .fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err.clone());
        self.shared.active.store(false, Ordering::Release);
        for request in self.shared.scheduler.close() {
            request.resolve(Err(err.clone()));
        }
    }
}
