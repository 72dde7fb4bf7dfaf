//! # table-fsm
//!
//! Runtime table-driven finite state machines: a synchronous transition
//! engine plus a Tokio event loop that serializes concurrent submitters
//! into it.
//!
//! A machine is configured from plain data. The transition table maps
//! `(state, event)` pairs to destination states; events with no matching
//! entry are silently discarded, and transitions back into the current
//! state fire no handlers. State handlers implement [`StateHandler`], a
//! two-notification contract of `enter` and `leave`, and can be combined
//! with [`compose`] or decorated with a timeout via [`Expiring`].
//!
//! ## Example
//!
//! A three-state flow where the middle state times out on its own:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use table_fsm::{
//!     AsyncMachine, Expiring, MachineProvider, StateHandler, States, Transitions, after, when,
//! };
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum St {
//!     Init,
//!     WaitTimeout,
//!     Final,
//! }
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum Ev {
//!     Initialized,
//!     Timeout,
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let transitions = Transitions::from([
//!         (when(St::Init, Ev::Initialized), St::WaitTimeout),
//!         (when(St::WaitTimeout, Ev::Timeout), St::Final),
//!     ]);
//!
//!     // The provider breaks the cycle between the machine and the
//!     // expiring state that needs to send events back into it.
//!     let provider = Arc::new(MachineProvider::new());
//!     let states = States::from([(
//!         St::WaitTimeout,
//!         Box::new(Expiring::new(
//!             Arc::clone(&provider),
//!             after(Duration::from_millis(10)),
//!             Ev::Timeout,
//!         )) as Box<dyn StateHandler>,
//!     )]);
//!
//!     let machine = AsyncMachine::new(St::Init, transitions, states, None);
//!     provider.set(machine.handle());
//!     let (handle, task) = machine.spawn();
//!
//!     handle.send(Ev::Initialized);
//!     handle.wait_for_state(St::Final).await.unwrap();
//!     handle.stop();
//!     task.await.unwrap();
//! }
//! ```

#[doc(inline)]
pub use table_fsm_core::*;
