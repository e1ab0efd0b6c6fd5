//! When simulated collaborators report completion

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Completion policy shared by every simulated collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Completion {
    /// Report completion from inside the call that started the operation
    #[default]
    Immediate,
    /// Report completion from a spawned task after a delay
    Delayed(Duration),
    /// Never report on its own; the test completes operations explicitly
    Manual,
}

impl Completion {
    /// Run `finish` according to the policy
    pub(crate) fn schedule<F>(&self, finish: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match *self {
            Completion::Immediate => finish(),
            Completion::Delayed(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    finish();
                });
            }
            Completion::Manual => {}
        }
    }

    /// Whether operations wait for an explicit completion
    pub fn is_manual(&self) -> bool {
        matches!(self, Completion::Manual)
    }
}
