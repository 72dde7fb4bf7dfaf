//! Core runtime for table-fsm.
//!
//! A machine is configured from plain data: a start state, a transition
//! table mapping `(state, event)` pairs to destination states, and a
//! sparse registry of state handlers. [`Machine`] applies one event at a
//! time on the caller's thread; [`AsyncMachine`] wraps a machine with an
//! event queue and a single consuming loop so any number of tasks can
//! submit concurrently.
//!
//! See the `table-fsm` facade crate for the full documentation example.

pub mod machine;
pub mod states;
pub mod task;
pub mod types;

pub use machine::Machine;
pub use states::{
    Cancel, Composite, DefaultHandler, EventSink, Expiring, MachineProvider, Scheduler,
    StateHandler, States, after, compose, lazy_after,
};
pub use task::{AsyncMachine, Handle, Task, TaskError};
pub use types::{EventId, StateId, Transitions, when};
