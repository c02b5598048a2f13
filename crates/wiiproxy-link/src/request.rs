use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use wiiproxy_command::{check_outgoing, Descriptor, Values};

use crate::error::{LinkError, Result};
use crate::link::Shared;

/// Scheduling priority. Lower values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u8);

impl Priority {
    pub const URGENT: Self = Self(0);
    pub const HIGH: Self = Self(64);
    pub const NORMAL: Self = Self(128);
    pub const LOW: Self = Self(192);
    /// Used for default polling; anything a caller queues goes first.
    pub const FILLER: Self = Self(255);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Identifies a request for cancellation and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Outcome = Result<Values>;

/// One command to run on the link.
///
/// Owned by the scheduler while queued and by the worker while in flight.
/// [`resolve`](Self::resolve) consumes it, so it is resolved at most once;
/// dropping it unresolved reports [`LinkError::Stopped`] to the waiter.
pub struct Request {
    id: RequestId,
    descriptor: Arc<Descriptor>,
    values: Option<Values>,
    priority: Priority,
    created_at: Instant,
    resolver: oneshot::Sender<Outcome>,
}

impl Request {
    /// Create a request and the receiver its outcome is delivered to.
    ///
    /// Fails if get commands are given values, or set commands are given
    /// none or values not matching their layout.
    pub fn new(
        id: RequestId,
        descriptor: Arc<Descriptor>,
        values: Option<Values>,
        priority: Priority,
    ) -> Result<(Self, oneshot::Receiver<Outcome>)> {
        check_outgoing(&descriptor, values.as_ref())?;
        let values = values.filter(|v| !v.is_empty() || descriptor.kind().is_set());
        let (resolver, rx) = oneshot::channel();
        Ok((
            Self {
                id,
                descriptor,
                values,
                priority,
                created_at: Instant::now(),
                resolver,
            },
            rx,
        ))
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn code(&self) -> u8 {
        self.descriptor.code()
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Values to send; `None` for get commands.
    pub fn values(&self) -> Option<&Values> {
        self.values.as_ref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since the request was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Deliver the outcome. A waiter that has gone away is ignored.
    pub fn resolve(self, outcome: Outcome) {
        let _ = self.resolver.send(outcome);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("code", &self.code())
            .field("priority", &self.priority)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

/// Handle to the eventual outcome of a submitted request.
///
/// The outcome is assigned once. After it arrives it is kept, so every
/// later [`wait`](Self::wait), [`try_result`](Self::try_result) or `.await`
/// returns the same value.
pub struct Completion {
    id: RequestId,
    code: u8,
    rx: Option<oneshot::Receiver<Outcome>>,
    outcome: Option<Outcome>,
    link: Weak<Shared>,
}

impl Completion {
    pub(crate) fn new(
        id: RequestId,
        code: u8,
        rx: oneshot::Receiver<Outcome>,
        link: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            code,
            rx: Some(rx),
            outcome: None,
            link,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    /// The outcome, if it has arrived. Never blocks.
    pub fn try_result(&mut self) -> Option<&Outcome> {
        if self.outcome.is_none() {
            let outcome = match self.rx.as_mut().map(|rx| rx.try_recv()) {
                Some(Ok(outcome)) => outcome,
                Some(Err(oneshot::error::TryRecvError::Empty)) => return None,
                Some(Err(oneshot::error::TryRecvError::Closed)) | None => {
                    Err(LinkError::Stopped)
                }
            };
            self.settle(outcome);
        }
        self.outcome.as_ref()
    }

    pub fn is_resolved(&mut self) -> bool {
        self.try_result().is_some()
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// Must not be called from inside an async runtime; `.await` the
    /// completion there instead.
    pub fn wait(&mut self) -> Outcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self
            .rx
            .take()
            .and_then(|rx| rx.blocking_recv().ok())
            .unwrap_or(Err(LinkError::Stopped));
        self.settle(outcome.clone());
        outcome
    }

    fn settle(&mut self, outcome: Outcome) {
        self.rx = None;
        self.outcome = Some(outcome);
    }

    /// Withdraw the request if it has not been sent yet.
    ///
    /// Returns `true` if it was still queued; it then resolves with
    /// [`LinkError::Cancelled`]. A request already in flight runs to the end.
    pub fn cancel(&mut self) -> bool {
        match self.link.upgrade() {
            Some(shared) => shared.scheduler.cancel(self.id),
            None => false,
        }
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = &this.outcome {
            return Poll::Ready(outcome.clone());
        }
        let outcome = match this.rx.as_mut() {
            Some(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(outcome) => outcome.unwrap_or(Err(LinkError::Stopped)),
                Poll::Pending => return Poll::Pending,
            },
            None => Err(LinkError::Stopped),
        };
        this.settle(outcome.clone());
        Poll::Ready(outcome)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.id)
            .field("code", &self.code)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
