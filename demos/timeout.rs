//! Demo: a three-state flow where the middle state expires on its own.

use std::sync::Arc;
use std::time::Duration;

use table_fsm::{
    AsyncMachine, Expiring, MachineProvider, StateHandler, States, Transitions, after, compose,
    when,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum St {
    Init,
    WaitTimeout,
    Final,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Ev {
    Initialized,
    Timeout,
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
        (when(St::Init, Ev::Initialized), St::WaitTimeout),
        (when(St::WaitTimeout, Ev::Timeout), St::Final),
    ]);

    let provider = Arc::new(MachineProvider::new());
    let states = States::from([
        (St::Init, Box::new(Printing("Init")) as Box<dyn StateHandler>),
        (
            St::WaitTimeout,
            Box::new(compose([
                Box::new(Printing("WaitTimeout")) as Box<dyn StateHandler>,
                Box::new(Expiring::new(
                    Arc::clone(&provider),
                    after(Duration::from_millis(100)),
                    Ev::Timeout,
                )),
            ])) as Box<dyn StateHandler>,
        ),
        (St::Final, Box::new(Printing("Final")) as Box<dyn StateHandler>),
    ]);

    let machine = AsyncMachine::new(St::Init, transitions, states, None);
    provider.set(machine.handle());
    let (handle, task) = machine.spawn();

    handle.send(Ev::Initialized);
    handle.wait_for_state(St::Final).await.expect("machine gone");
    handle.stop();
    task.await.expect("event loop failed");
}
