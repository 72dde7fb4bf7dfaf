//! Demo: a lazily evaluated expiry, re-rolled on every entry.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use table_fsm::{
    AsyncMachine, Expiring, MachineProvider, StateHandler, States, Transitions, lazy_after, when,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum St {
    Idle,
    Waiting,
    Done,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Ev {
    Kick,
    Expired,
}

struct Printing(&'static str);

impl StateHandler for Printing {
    fn enter(&mut self) {
        println!("ENTER: {}", self.0);
    }

    fn leave(&mut self) {
        println!("LEAVE: {}", self.0);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let transitions = Transitions::from([
        (when(St::Idle, Ev::Kick), St::Waiting),
        (when(St::Waiting, Ev::Expired), St::Done),
    ]);

    // The duration is computed fresh each time the state is entered.
    let expire_after = lazy_after(|| {
        let jitter = rand::rng().random_range(0..500);
        let duration = Duration::from_millis(500 + jitter);
        println!("expiring in {duration:?}");
        duration
    });

    let provider = Arc::new(MachineProvider::new());
    let states = States::from([
        (St::Waiting, Box::new(Expiring::new(
            Arc::clone(&provider),
            expire_after,
            Ev::Expired,
        )) as Box<dyn StateHandler>),
        (St::Done, Box::new(Printing("Done")) as Box<dyn StateHandler>),
    ]);

    let machine = AsyncMachine::new(St::Idle, transitions, states, None);
    provider.set(machine.handle());
    let (handle, task) = machine.spawn();

    handle.send(Ev::Kick);
    handle.wait_for_state(St::Done).await.expect("machine gone");
    handle.stop();
    task.await.expect("event loop failed");
}
