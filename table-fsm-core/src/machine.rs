//! The synchronous transition engine.

use tracing::debug;

use crate::states::{DefaultHandler, StateHandler, States};
use crate::types::{EventId, StateId, Transitions};

/// A finite-state machine. It implements state transitions and events.
///
/// The machine holds a current state, a transition table, and a sparse
/// registry of state handlers. Sending an event looks up
/// `(current state, event)` in the table and, when the destination differs
/// from the current state, fires `leave` on the old state's handler and
/// `enter` on the new one.
///
/// A `Machine` is not safe for concurrent use: the `&mut self` receiver on
/// [`Machine::send`] makes the single-driver rule a compile-time property.
/// Use [`AsyncMachine`](crate::task::AsyncMachine) to feed one machine from
/// many tasks.
pub struct Machine<S, E> {
    current: S,
    transitions: Transitions<S, E>,
    states: States<S>,
    default_handler: Box<dyn StateHandler>,
}

impl<S: StateId, E: EventId> Machine<S, E> {
    /// Returns a new configured finite-state machine.
    ///
    /// The start state's `enter` notification fires synchronously inside
    /// this constructor, before the caller can observe the machine. `None`
    /// for `default_handler` selects the shared no-op [`DefaultHandler`].
    pub fn new(
        start: S,
        transitions: Transitions<S, E>,
        states: States<S>,
        default_handler: Option<Box<dyn StateHandler>>,
    ) -> Self {
        let mut machine = Self {
            current: start,
            transitions,
            states,
            default_handler: default_handler.unwrap_or_else(|| Box::new(DefaultHandler)),
        };
        machine.handler(start).enter();
        debug!(state = ?machine.current, "machine initialized");
        machine
    }

    /// Current state of the machine.
    #[must_use]
    pub fn current(&self) -> S {
        self.current
    }

    /// Sends the event to the machine. The machine changes its state
    /// according to the transition table; an event with no matching
    /// transition is discarded without touching any handler.
    ///
    /// Panics raised by a state handler propagate to the caller.
    pub fn send(&mut self, event: E) {
        debug!(state = ?self.current, event = ?event, "received event");
        let Some(&next) = self.transitions.get(&(self.current, event)) else {
            return;
        };
        self.change(next);
    }

    // Changes the state, firing leave and enter. Does not fire handlers
    // when the destination equals the current state.
    fn change(&mut self, next: S) {
        if self.current == next {
            return;
        }
        debug!(state = ?self.current, next = ?next, "changing state");
        let current = self.current;
        self.handler(current).leave();
        self.handler(next).enter();
        self.current = next;
    }

    fn handler(&mut self, state: S) -> &mut dyn StateHandler {
        match self.states.get_mut(&state) {
            Some(handler) => handler.as_mut(),
            None => self.default_handler.as_mut(),
        }
    }
}
