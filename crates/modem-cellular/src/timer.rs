//! Re-armable timeout timer
//!
//! The timer holds at most one deadline. It does not run on its own task:
//! the modem actor awaits [`TimeoutTimer::expired`] in its select loop and
//! calls [`TimeoutTimer::fire`] when it completes, which posts a single
//! [`ModemEvent::Timeout`].
//!
//! Arming or stopping the timer also purges any `Timeout` still waiting in
//! the event queue, so a state never sees the expiry of a timer that an
//! earlier state armed.

use std::future::pending;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::events::ModemEvent;
use crate::queue::EventSender;

/// Single-shot timer posting [`ModemEvent::Timeout`]
#[derive(Debug)]
pub struct TimeoutTimer {
    deadline: Option<Instant>,
    events: EventSender,
}

impl TimeoutTimer {
    /// Create a disarmed timer posting to `events`
    pub fn new(events: EventSender) -> Self {
        Self {
            deadline: None,
            events,
        }
    }

    /// Arm the timer, cancelling any pending expiry
    pub fn start(&mut self, timeout: Duration) {
        self.events.purge(ModemEvent::Timeout);
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Disarm the timer
    pub fn stop(&mut self) {
        self.events.purge(ModemEvent::Timeout);
        self.deadline = None;
    }

    /// Whether an expiry is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Post the timeout if the timer is armed, then disarm it
    ///
    /// Returns whether an event was posted.
    pub fn fire(&mut self) -> bool {
        match self.deadline.take() {
            Some(_) => self.events.post(ModemEvent::Timeout),
            None => false,
        }
    }

    /// Complete when the current deadline passes; never completes while disarmed
    pub async fn expired(&self) {
        wait_deadline(self.deadline).await;
    }
}

/// Sleep until `deadline`, or forever if there is none
pub(crate) async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;

    #[tokio::test(start_paused = true)]
    async fn test_fire_posts_once() {
        let queue = EventQueue::default();
        let mut timer = TimeoutTimer::new(queue.sender());

        timer.start(Duration::from_millis(100));
        timer.expired().await;
        assert!(timer.fire());
        assert!(!timer.fire());

        assert_eq!(queue.drain(), vec![ModemEvent::Timeout]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_leaves_single_expiry() {
        let queue = EventQueue::default();
        let mut timer = TimeoutTimer::new(queue.sender());

        let start = Instant::now();
        timer.start(Duration::from_millis(100));
        timer.start(Duration::from_millis(300));
        timer.expired().await;

        assert!(start.elapsed() >= Duration::from_millis(300));
        timer.fire();
        assert_eq!(queue.drain(), vec![ModemEvent::Timeout]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_purges_queued_timeout() {
        let queue = EventQueue::default();
        let tx = queue.sender();
        let mut timer = TimeoutTimer::new(tx.clone());

        timer.start(Duration::from_millis(10));
        timer.expired().await;
        timer.fire();
        tx.post(ModemEvent::Registered);

        timer.start(Duration::from_secs(8));
        assert_eq!(queue.drain(), vec![ModemEvent::Registered]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timer_never_expires() {
        let queue = EventQueue::default();
        let mut timer = TimeoutTimer::new(queue.sender());
        timer.start(Duration::from_millis(10));
        timer.stop();

        let waited = tokio::time::timeout(Duration::from_secs(60), timer.expired()).await;
        assert!(waited.is_err());
        assert!(!timer.is_armed());
        assert!(queue.is_empty());
    }
}
