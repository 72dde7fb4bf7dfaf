//! State capabilities: the handler contract and its combinators.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::types::EventId;

/// Notification contract implemented by application states.
///
/// Both notifications default to no-ops so a state only spells out the
/// side it cares about. Handlers are stored boxed in a [`States`] registry
/// and driven exclusively by the machine that owns them.
pub trait StateHandler: Send {
    /// Called upon entering this state.
    fn enter(&mut self) {}

    /// Called upon leaving this state.
    fn leave(&mut self) {}
}

/// State event handlers, keyed by state.
///
/// The registry is intentionally sparse: a state without an entry resolves
/// to the machine's default handler.
pub type States<S> = HashMap<S, Box<dyn StateHandler>>;

/// State handler that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl StateHandler for DefaultHandler {}

/// Dispatches enter and leave notifications to every contained handler.
///
/// Both notifications fan out in construction order; leave is not
/// reversed. An empty composite is a no-op, and a composite is itself a
/// [`StateHandler`], so nesting is legal.
#[derive(Default)]
pub struct Composite {
    children: Vec<Box<dyn StateHandler>>,
}

impl Composite {
    /// Number of contained handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the composite contains no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl StateHandler for Composite {
    fn enter(&mut self) {
        for child in &mut self.children {
            child.enter();
        }
    }

    fn leave(&mut self) {
        for child in &mut self.children {
            child.leave();
        }
    }
}

/// Wraps the given handlers with a composite handler.
#[must_use]
pub fn compose<I>(children: I) -> Composite
where
    I: IntoIterator<Item = Box<dyn StateHandler>>,
{
    Composite {
        children: children.into_iter().collect(),
    }
}

/// Anything that accepts machine events.
///
/// Implemented by the async [`Handle`](crate::task::Handle); test doubles
/// can implement it to capture events instead.
pub trait EventSink<E>: Send + Sync {
    /// Accepts one event.
    fn send(&self, event: E);
}

/// Late-bound reference to a running machine.
///
/// States are handed to the machine constructor, but a state that sends
/// events needs a handle to a machine that does not exist yet. The
/// provider breaks that cycle: construct it first, hand it to the states,
/// then wire the machine in with [`MachineProvider::set`]. The reference
/// must be set before the machine can enter any state that sends through
/// the provider, in particular before starting the async run loop.
pub struct MachineProvider<E> {
    sink: OnceLock<Box<dyn EventSink<E>>>,
}

impl<E: EventId> MachineProvider<E> {
    /// Returns an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sink: OnceLock::new(),
        }
    }

    /// Wires the machine reference.
    ///
    /// # Panics
    ///
    /// Panics if a reference has already been set.
    pub fn set(&self, sink: impl EventSink<E> + 'static) {
        if self.sink.set(Box::new(sink)).is_err() {
            panic!("machine reference set twice");
        }
    }

    /// Forwards the event to the wired machine.
    ///
    /// # Panics
    ///
    /// Panics if called before [`MachineProvider::set`].
    pub fn send(&self, event: E) {
        let Some(sink) = self.sink.get() else {
            panic!("event sent before the machine reference was set");
        };
        sink.send(event);
    }
}

impl<E: EventId> Default for MachineProvider<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels a scheduled callback.
///
/// Best effort: a callback that already started running is not retracted.
pub type Cancel = Box<dyn FnOnce() + Send>;

/// Schedules a callback to run after some interval and returns a handle
/// that cancels the pending run.
pub type Scheduler = Box<dyn FnMut(Box<dyn FnOnce() + Send>) -> Cancel + Send>;

/// Returns a scheduler that fires after a fixed duration.
///
/// The callback runs on a spawned tokio timer task; cancelling aborts the
/// task. Arming the schedule therefore requires a tokio runtime.
#[must_use]
pub fn after(duration: Duration) -> Scheduler {
    lazy_after(move || duration)
}

/// Returns a scheduler that re-evaluates its duration every time it is
/// armed, supporting randomized and backoff-style timeouts.
#[must_use]
pub fn lazy_after<F>(mut duration: F) -> Scheduler
where
    F: FnMut() -> Duration + Send + 'static,
{
    Box::new(move |callback| {
        let duration = duration();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            callback();
        });
        Box::new(move || timer.abort())
    })
}

/// State handler with a timeout.
///
/// Entering the state arms a timer through the scheduler; once the timer
/// fires, the configured event is sent to the machine behind the provider.
/// Leaving the state cancels the timer.
///
/// Cancellation cannot retract a callback that has already started
/// forwarding the event, so a timeout racing the leave notification may
/// still be delivered; the machine then discards it as an event with no
/// matching transition. Pair this handler with the async machine, which
/// serializes such late deliveries with all other events.
///
/// The machine must be wired into the provider before this state is first
/// entered.
pub struct Expiring<E> {
    provider: Arc<MachineProvider<E>>,
    event: E,
    schedule: Scheduler,
    cancel: Option<Cancel>,
}

impl<E: EventId> Expiring<E> {
    /// Returns the handler which sends the event to the machine after the
    /// interval decided by `schedule`; see [`after`] and [`lazy_after`].
    #[must_use]
    pub fn new(provider: Arc<MachineProvider<E>>, schedule: Scheduler, event: E) -> Self {
        Self {
            provider,
            event,
            schedule,
            cancel: None,
        }
    }
}

impl<E: EventId> StateHandler for Expiring<E> {
    fn enter(&mut self) {
        let provider = Arc::clone(&self.provider);
        let event = self.event.clone();
        let send_event = Box::new(move || provider.send(event));
        self.cancel = Some((self.schedule)(send_event));
    }

    fn leave(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    enum Ev {
        Timeout,
    }

    #[derive(Clone, Default)]
    struct Counting {
        enters: Arc<AtomicUsize>,
        leaves: Arc<AtomicUsize>,
    }

    impl StateHandler for Counting {
        fn enter(&mut self) {
            self.enters.fetch_add(1, Ordering::Relaxed);
        }

        fn leave(&mut self) {
            self.leaves.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<Ev>>>,
    }

    impl EventSink<Ev> for RecordingSink {
        fn send(&self, event: Ev) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn counters(n: usize) -> (Composite, Counting) {
        let counting = Counting::default();
        let children = (0..n)
            .map(|_| Box::new(counting.clone()) as Box<dyn StateHandler>)
            .collect::<Vec<_>>();
        (compose(children), counting)
    }

    #[test]
    fn default_handler_does_nothing() {
        let mut handler = DefaultHandler;
        handler.enter();
        handler.leave();
    }

    #[test]
    fn composite_dispatches_to_every_child() {
        for n in [0, 1, 100] {
            let (mut composite, counting) = counters(n);
            composite.enter();
            composite.leave();
            assert_eq!(counting.enters.load(Ordering::Relaxed), n, "enters for {n} children");
            assert_eq!(counting.leaves.load(Ordering::Relaxed), n, "leaves for {n} children");
        }
    }

    #[test]
    fn composite_nests() {
        let (inner, counting) = counters(2);
        let mut outer = compose([
            Box::new(counting.clone()) as Box<dyn StateHandler>,
            Box::new(inner),
        ]);
        outer.enter();
        assert_eq!(counting.enters.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn compose_keeps_all_handlers() {
        assert_eq!(Composite::default().len(), 0);
        assert!(Composite::default().is_empty());
        let (composite, _) = counters(3);
        assert_eq!(composite.len(), 3);
    }

    #[test]
    fn provider_forwards_once_set() {
        let provider = MachineProvider::new();
        let sink = RecordingSink::default();
        provider.set(sink.clone());
        provider.send(Ev::Timeout);
        assert_eq!(*sink.events.lock().unwrap(), vec![Ev::Timeout]);
    }

    #[test]
    #[should_panic(expected = "machine reference set twice")]
    fn provider_rejects_second_set() {
        let provider = MachineProvider::new();
        provider.set(RecordingSink::default());
        provider.set(RecordingSink::default());
    }

    #[test]
    #[should_panic(expected = "before the machine reference was set")]
    fn provider_rejects_send_before_set() {
        MachineProvider::new().send(Ev::Timeout);
    }

    // Hand-driven scheduler: captures the callback and records whether the
    // cancel handle was invoked.
    fn capturing_scheduler() -> (
        Scheduler,
        Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
        Arc<AtomicBool>,
    ) {
        let scheduled = Arc::new(Mutex::new(None));
        let cancelled = Arc::new(AtomicBool::new(false));
        let schedule = {
            let scheduled = Arc::clone(&scheduled);
            let cancelled = Arc::clone(&cancelled);
            Box::new(move |callback: Box<dyn FnOnce() + Send>| {
                *scheduled.lock().unwrap() = Some(callback);
                let cancelled = Arc::clone(&cancelled);
                Box::new(move || cancelled.store(true, Ordering::Relaxed)) as Cancel
            })
        };
        (schedule, scheduled, cancelled)
    }

    #[test]
    fn expiring_cancels_when_left_before_firing() {
        let (schedule, scheduled, cancelled) = capturing_scheduler();
        let provider = Arc::new(MachineProvider::new());
        let sink = RecordingSink::default();
        provider.set(sink.clone());
        let mut expiring = Expiring::new(provider, schedule, Ev::Timeout);

        expiring.enter();
        assert!(scheduled.lock().unwrap().is_some(), "enter arms the timer");
        assert!(!cancelled.load(Ordering::Relaxed));

        expiring.leave();
        assert!(cancelled.load(Ordering::Relaxed), "leave cancels the timer");
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[test]
    fn expiring_still_delivers_when_fired_before_leaving() {
        let (schedule, scheduled, cancelled) = capturing_scheduler();
        let provider = Arc::new(MachineProvider::new());
        let sink = RecordingSink::default();
        provider.set(sink.clone());
        let mut expiring = Expiring::new(provider, schedule, Ev::Timeout);

        expiring.enter();
        let fire = scheduled.lock().unwrap().take().unwrap();
        fire();
        assert_eq!(*sink.events.lock().unwrap(), vec![Ev::Timeout]);

        // Cancelling after the fact must not retract the delivery.
        expiring.leave();
        assert!(cancelled.load(Ordering::Relaxed));
        assert_eq!(*sink.events.lock().unwrap(), vec![Ev::Timeout]);
    }

    #[test]
    fn expiring_rearms_on_every_enter() {
        let (schedule, scheduled, _) = capturing_scheduler();
        let provider = Arc::new(MachineProvider::new());
        provider.set(RecordingSink::default());
        let mut expiring = Expiring::new(provider, schedule, Ev::Timeout);

        expiring.enter();
        expiring.leave();
        assert!(scheduled.lock().unwrap().take().is_some());

        expiring.enter();
        assert!(scheduled.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn lazy_schedule_reevaluates_each_arming() {
        let evals = Arc::new(AtomicUsize::new(0));
        let mut schedule = lazy_after({
            let evals = Arc::clone(&evals);
            move || {
                evals.fetch_add(1, Ordering::Relaxed);
                Duration::from_secs(3600)
            }
        });

        let cancel_first = schedule(Box::new(|| {}));
        let cancel_second = schedule(Box::new(|| {}));
        assert_eq!(evals.load(Ordering::Relaxed), 2);

        cancel_first();
        cancel_second();
    }
}
