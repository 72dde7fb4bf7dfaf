//! The asynchronous event-serialization wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::machine::Machine;
use crate::states::{EventSink, StateHandler, States};
use crate::types::{EventId, StateId, Transitions};

/// Serializes concurrently submitted events into a [`Machine`].
///
/// Any number of [`Handle`] clones may submit events from any task or
/// thread; the [`AsyncMachine::run`] loop is the only code path that
/// touches the wrapped machine, which is what keeps its mutation safe
/// without a lock. Events reach the machine in the order their
/// [`Handle::send`] calls completed.
///
/// The wrapper starts out running and becomes permanently inert after
/// [`Handle::stop`]; there is no resume.
pub struct AsyncMachine<S: StateId, E: EventId> {
    machine: Machine<S, E>,
    events: mpsc::UnboundedReceiver<E>,
    stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<S>,
    handle: Handle<S, E>,
}

impl<S: StateId, E: EventId> AsyncMachine<S, E> {
    /// Returns a new machine wrapped for asynchronous use.
    ///
    /// The underlying synchronous machine is constructed here, so the
    /// start state's `enter` notification has already fired by the time
    /// this returns.
    pub fn new(
        start: S,
        transitions: Transitions<S, E>,
        states: States<S>,
        default_handler: Option<Box<dyn StateHandler>>,
    ) -> Self {
        let machine = Machine::new(start, transitions, states, default_handler);
        let (event_tx, events) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(machine.current());
        let handle = Handle {
            event_tx,
            stop_tx: Arc::new(stop_tx),
            state_rx,
        };
        Self {
            machine,
            events,
            stop_rx,
            state_tx,
            handle,
        }
    }

    /// Returns a handle for submitting events and observing state.
    #[must_use]
    pub fn handle(&self) -> Handle<S, E> {
        self.handle.clone()
    }

    /// Processes events until stopped.
    ///
    /// The loop suspends while the queue is empty, forwards dequeued
    /// events to the machine one at a time in submission order, and
    /// returns once a stop has been observed. Events still queued at that
    /// point are dropped. Panics raised by a state handler propagate to
    /// whoever drives this future.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow_and_update() {
                        debug!("event loop stopped");
                        return;
                    }
                }
                event = self.events.recv() => {
                    let Some(event) = event else { return };
                    self.machine.send(event);
                    let current = self.machine.current();
                    self.state_tx.send_if_modified(|state| {
                        let moved = *state != current;
                        *state = current;
                        moved
                    });
                }
            }
        }
    }

    /// Spawns [`AsyncMachine::run`] onto the current tokio runtime and
    /// returns the submission handle together with the running task.
    pub fn spawn(self) -> (Handle<S, E>, Task) {
        let handle = self.handle();
        let task = Task {
            handle: tokio::spawn(self.run()),
        };
        (handle, task)
    }
}

/// Cloneable submission and observation handle for an [`AsyncMachine`].
#[derive(Clone)]
pub struct Handle<S, E> {
    event_tx: mpsc::UnboundedSender<E>,
    stop_tx: Arc<watch::Sender<bool>>,
    state_rx: watch::Receiver<S>,
}

impl<S: StateId, E: EventId> Handle<S, E> {
    /// Enqueues the event for processing and returns immediately; the
    /// caller is never blocked or suspended, regardless of queue depth.
    ///
    /// After [`Handle::stop`] the event is dropped instead. An event whose
    /// send races a concurrent stop is either processed before the loop
    /// observes the stop or dropped with the queue; it is never applied
    /// after [`AsyncMachine::run`] has returned.
    pub fn send(&self, event: E) {
        if *self.stop_tx.borrow() {
            debug!(event = ?event, "event dropped after stop");
            return;
        }
        let _ = self.event_tx.send(event);
    }

    /// Stops the machine. Irreversible; safe to call more than once.
    ///
    /// The run loop exits as soon as it observes the stop, without
    /// draining queued events; an event callback already executing inside
    /// the machine completes first. Stopping does not wait for the loop to
    /// exit; await [`AsyncMachine::run`] or the [`Task`] for that.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Returns the machine's state as of the last processed event.
    #[must_use]
    pub fn current_state(&self) -> S {
        *self.state_rx.borrow()
    }

    /// Waits for the machine to reach the given state.
    pub async fn wait_for_state(&self, target: S) -> Result<(), watch::error::RecvError> {
        let mut rx = self.state_rx.clone();
        while *rx.borrow_and_update() != target {
            rx.changed().await?;
        }
        Ok(())
    }
}

impl<S: StateId, E: EventId> EventSink<E> for Handle<S, E> {
    fn send(&self, event: E) {
        Handle::send(self, event);
    }
}

/// Error type returned by the spawned event-loop task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task panicked or was cancelled. A panic inside a state handler
    /// surfaces here rather than being caught by the engine.
    #[error("event loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a spawned event-loop task. Resolves once the loop has exited
/// after a stop.
pub struct Task {
    handle: JoinHandle<()>,
}

impl Future for Task {
    type Output = Result<(), TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
            Poll::Ready(Err(e)) => Poll::Ready(Err(TaskError::Join(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}
