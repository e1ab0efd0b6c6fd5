//! Modem Actor
//!
//! The actor is the single execution context that runs state machine code.
//! It owns the [`ModemStateMachine`] and the consumer side of the
//! [`EventQueue`], and waits on three things:
//!
//! - a producer posting to the queue
//! - the timeout timer's deadline
//! - a control command from the [`ModemCellular`](crate::ModemCellular) handle
//!
//! Every wake-up ends with a full drain of the queue, so a transition made
//! by one event is visible to the next.
//!
//! # Example
//!
//! ```rust,ignore
//! use modem_cellular::actor::{run_modem_actor, ModemCommand};
//! use modem_cellular::{EventQueue, ModemStateMachine};
//! use tokio::sync::mpsc;
//!
//! let queue = EventQueue::new(config.event_queue_capacity);
//! let mut machine = ModemStateMachine::new(config, resources, queue.sender(), info);
//! machine.start();
//! let (cmd_tx, cmd_rx) = mpsc::channel(4);
//!
//! tokio::spawn(run_modem_actor(machine, queue, cmd_rx));
//! ```

use tokio::sync::mpsc;
use tracing::info;

use crate::machine::ModemStateMachine;
use crate::queue::EventQueue;
use crate::timer::wait_deadline;

/// Control commands for the modem actor
#[derive(Debug)]
pub enum ModemCommand {
    /// Stop the actor, leaving the modem in its current state
    Shutdown,
}

/// Run the modem actor until shut down or the command channel closes
///
/// The machine should already have been [started](ModemStateMachine::start).
pub async fn run_modem_actor(
    mut machine: ModemStateMachine,
    queue: EventQueue,
    mut cmd_rx: mpsc::Receiver<ModemCommand>,
) {
    info!("modem actor started in state {}", machine.state());

    loop {
        let deadline = machine.timer().deadline();

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ModemCommand::Shutdown) | None => {
                        info!("modem actor shutting down in state {}", machine.state());
                        break;
                    }
                }
            }

            _ = queue.wait() => {
                machine.dispatch(&queue);
            }

            _ = wait_deadline(deadline) => {
                machine.expire_timer();
                machine.dispatch(&queue);
            }
        }
    }
}
