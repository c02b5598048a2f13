use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Produces the controller's reply to one flushed outgoing message.
///
/// An empty reply means the controller stays silent.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// In-process transport that stands in for a flight controller.
///
/// Bytes written are collected until `flush`, at which point the message is
/// logged and handed to the responder; whatever it returns becomes readable.
/// The paired [`MemoryHandle`] lets another thread inject bytes, inspect
/// traffic, or break the link.
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

/// Control side of a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryHandle {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    readable: Condvar,
}

#[derive(Default)]
struct State {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    written: Vec<Vec<u8>>,
    responder: Option<Responder>,
    input_resets: usize,
    output_resets: usize,
    read_chunk: Option<usize>,
    fault: Option<ErrorKind>,
    closed: bool,
}

impl MemoryTransport {
    /// Create a silent transport and its control handle.
    pub fn new() -> (Self, MemoryHandle) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            readable: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MemoryHandle { shared },
        )
    }

    /// Create a transport that answers each flushed message with `responder`.
    pub fn with_responder(
        responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    ) -> (Self, MemoryHandle) {
        let (transport, handle) = Self::new();
        handle.set_responder(responder);
        (transport, handle)
    }

    fn check(state: &State) -> Result<()> {
        if let Some(kind) = state.fault {
            return Err(TransportError::Io(std::io::Error::from(kind)));
        }
        if state.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.shared.lock();
        Self::check(&state)?;
        state.outgoing.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        Self::check(&state)?;
        if state.outgoing.is_empty() {
            return Ok(());
        }

        let message = std::mem::take(&mut state.outgoing);
        let reply = match state.responder.as_mut() {
            Some(responder) => responder(&message),
            None => Vec::new(),
        };
        trace!(written = message.len(), reply = reply.len(), "memory transport flush");
        state.written.push(message);
        if !reply.is_empty() {
            state.incoming.extend(reply);
            self.shared.readable.notify_all();
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            Self::check(&state)?;
            if !state.incoming.is_empty() {
                let limit = state.read_chunk.unwrap_or(usize::MAX).max(1);
                let n = buf.len().min(state.incoming.len()).min(limit);
                for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::TimedOut(timeout));
            }
            state = self
                .shared
                .readable
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        Self::check(&state)?;
        state.incoming.clear();
        state.input_resets += 1;
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        Self::check(&state)?;
        state.outgoing.clear();
        state.output_resets += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        state.closed = true;
        self.shared.readable.notify_all();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl MemoryHandle {
    /// Replace the responder used for subsequent flushes.
    pub fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) {
        self.shared.lock().responder = Some(Box::new(responder));
    }

    /// Make bytes readable as if the controller had sent them.
    pub fn push_incoming(&self, bytes: &[u8]) {
        let mut state = self.shared.lock();
        state.incoming.extend(bytes.iter().copied());
        self.shared.readable.notify_all();
    }

    /// Every flushed outgoing message, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.shared.lock().written.clone()
    }

    /// Number of bytes waiting to be read.
    pub fn pending_incoming(&self) -> usize {
        self.shared.lock().incoming.len()
    }

    /// How many times the input buffer was reset.
    pub fn input_resets(&self) -> usize {
        self.shared.lock().input_resets
    }

    /// How many times the output buffer was reset.
    pub fn output_resets(&self) -> usize {
        self.shared.lock().output_resets
    }

    /// Deliver at most `chunk` bytes per read call.
    pub fn set_read_chunk(&self, chunk: usize) {
        self.shared.lock().read_chunk = Some(chunk);
    }

    /// Fail every subsequent operation with an I/O error of `kind`.
    pub fn fail_with(&self, kind: ErrorKind) {
        let mut state = self.shared.lock();
        state.fault = Some(kind);
        self.shared.readable.notify_all();
    }

    /// Stop injecting the fault set by [`fail_with`](Self::fail_with).
    pub fn clear_fault(&self) {
        self.shared.lock().fault = None;
    }

    /// Whether the transport side has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn silent_transport_times_out() {
        let (mut transport, _handle) = MemoryTransport::new();
        let mut buf = [0u8; 8];
        let err = transport.read(&mut buf, SHORT).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn responder_sees_flushed_message() {
        let (mut transport, handle) = MemoryTransport::with_responder(|msg| msg.to_vec());

        transport.write(b"ab").unwrap();
        transport.write(b"cd").unwrap();
        transport.flush().unwrap();

        assert_eq!(handle.written(), vec![b"abcd".to_vec()]);
        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf, SHORT).unwrap();
        assert_eq!(&buf[..n], b"abcd");
    }

    #[test]
    fn read_chunk_limits_delivery() {
        let (mut transport, handle) = MemoryTransport::new();
        handle.push_incoming(b"xyz");
        handle.set_read_chunk(1);

        let mut buf = [0u8; 8];
        assert_eq!(transport.read(&mut buf, SHORT).unwrap(), 1);
        assert_eq!(buf[0], b'x');
        assert_eq!(handle.pending_incoming(), 2);
    }

    #[test]
    fn reset_discards_and_counts() {
        let (mut transport, handle) = MemoryTransport::new();
        handle.push_incoming(b"junk");
        transport.write(b"half").unwrap();

        transport.reset_input_buffer().unwrap();
        transport.reset_output_buffer().unwrap();

        assert_eq!(handle.pending_incoming(), 0);
        assert_eq!(handle.input_resets(), 1);
        assert_eq!(handle.output_resets(), 1);
        transport.flush().unwrap();
        assert!(handle.written().is_empty());
    }

    #[test]
    fn fault_fails_every_operation() {
        let (mut transport, handle) = MemoryTransport::new();
        handle.fail_with(ErrorKind::BrokenPipe);

        assert!(matches!(transport.write(b"x"), Err(TransportError::Io(_))));
        let mut buf = [0u8; 1];
        assert!(matches!(
            transport.read(&mut buf, SHORT),
            Err(TransportError::Io(e)) if e.kind() == ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn push_from_other_thread_wakes_reader() {
        let (mut transport, handle) = MemoryTransport::new();
        let pusher = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            handle.push_incoming(b"late");
        });

        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf, Duration::from_secs(2)).unwrap();
        assert_eq!(&buf[..n], b"late");
        pusher.join().unwrap();
    }

    #[test]
    fn closed_transport_rejects_io() {
        let (mut transport, handle) = MemoryTransport::new();
        transport.close().unwrap();
        assert!(handle.is_closed());
        assert!(matches!(transport.write(b"x"), Err(TransportError::Closed)));
    }
}
