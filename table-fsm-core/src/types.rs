//! Identifier contracts and the transition table.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Contract for state identifiers.
///
/// Any cheap comparable token qualifies: unit-variant enums, integers,
/// `&'static str`. Blanket-implemented, never implemented by hand.
pub trait StateId: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + Debug + Send + Sync + 'static> StateId for T {}

/// Contract for event identifiers. Cloned when a stored event is re-sent,
/// so implementations should be cheap to clone.
pub trait EventId: Clone + Eq + Hash + Debug + Send + 'static {}

impl<T: Clone + Eq + Hash + Debug + Send + 'static> EventId for T {}

/// State transitions in the form of a mapping from a state and an event to
/// a new state.
///
/// A key absent from the table means "no transition": the machine stays
/// where it is and fires no handler. The machine takes ownership of its
/// table at construction and never mutates it.
pub type Transitions<S, E> = HashMap<(S, E), S>;

/// Builds one transition-table key, with an intention to make table
/// literals read as rules.
///
/// # Example
///
/// ```
/// use table_fsm_core::{Transitions, when};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum St {
///     Init,
///     Start,
/// }
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Ev {
///     Initialized,
/// }
///
/// let transitions = Transitions::from([
///     (when(St::Init, Ev::Initialized), St::Start),
/// ]);
/// # assert_eq!(transitions[&(St::Init, Ev::Initialized)], St::Start);
/// ```
#[must_use]
pub fn when<S: StateId, E: EventId>(state: S, event: E) -> (S, E) {
    (state, event)
}
