//! Idle timeout monitor.
//!
//! Each connection with a configured idle window gets one monitor task. The
//! deadline is pushed forward on every inbound frame and every successful
//! outbound write. Firing and cancellation both race against I/O, so the
//! monitor is only the first guard: a late firing is still a no-op at the
//! state-machine layer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::connection::machine::CloseStateMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleState {
    /// No idle window configured; the monitor never fires.
    Disarmed,
    /// Deadline in force.
    Armed(Instant),
    /// Connection closed; the monitor must not fire.
    Cancelled,
}

/// Handle for re-arming or cancelling a connection's idle deadline.
#[derive(Debug, Clone)]
pub(crate) struct IdleHandle {
    tx: watch::Sender<IdleState>,
    timeout: Option<Duration>,
}

impl IdleHandle {
    /// Push the deadline forward by the configured window.
    pub(crate) fn on_activity(&self) {
        let Some(timeout) = self.timeout else { return };
        let deadline = Instant::now() + timeout;
        // Never resurrect a cancelled deadline.
        self.tx.send_if_modified(|state| match state {
            IdleState::Cancelled => false,
            _ => {
                *state = IdleState::Armed(deadline);
                true
            }
        });
    }

    /// Cancel the deadline permanently. Best effort; the monitor may already
    /// be past the point of no return, in which case the state machine
    /// swallows the late firing.
    pub(crate) fn cancel(&self) {
        let _ = self.tx.send(IdleState::Cancelled);
    }
}

/// Watches one connection's inactivity deadline.
pub(crate) struct IdleMonitor {
    rx: watch::Receiver<IdleState>,
}

impl IdleMonitor {
    pub(crate) fn new(timeout: Option<Duration>) -> (Self, IdleHandle) {
        let initial = match timeout {
            Some(t) => IdleState::Armed(Instant::now() + t),
            None => IdleState::Disarmed,
        };
        let (tx, rx) = watch::channel(initial);
        (Self { rx }, IdleHandle { tx, timeout })
    }

    /// Run until the deadline elapses, the deadline is cancelled, or the
    /// connection is dropped.
    ///
    /// Fires on its own task, never synchronously from the connection's I/O
    /// path.
    pub(crate) async fn run(mut self, machine: Arc<CloseStateMachine>) {
        loop {
            let state = *self.rx.borrow_and_update();
            match state {
                IdleState::Cancelled => return,
                IdleState::Disarmed => {
                    if self.rx.changed().await.is_err() {
                        return;
                    }
                }
                IdleState::Armed(deadline) => {
                    tokio::select! {
                        () = tokio::time::sleep_until(deadline) => {
                            // The deadline may have moved while we slept.
                            if *self.rx.borrow() == IdleState::Armed(deadline) {
                                machine.on_idle_timeout();
                                return;
                            }
                        }
                        changed = self.rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::close::CloseCause;
    use crate::config::Config;
    use crate::connection::machine::tests::standalone_machine;
    use crate::connection::writer::WriteHandle;

    #[tokio::test(start_paused = true)]
    async fn test_monitor_fires_after_window() {
        let config = Config::new().with_idle_timeout(Duration::from_millis(500));
        let (writer, _commands) = WriteHandle::test_handle();
        let (machine, _events, _idle) = standalone_machine(config.clone(), writer);
        let (monitor, _handle) = IdleMonitor::new(config.idle_timeout);

        let task = tokio::spawn(monitor.run(machine.clone()));
        tokio::time::sleep(Duration::from_millis(600)).await;
        task.await.unwrap();

        assert_eq!(machine.outcome().unwrap().cause, CloseCause::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_pushes_deadline_forward() {
        let config = Config::new().with_idle_timeout(Duration::from_millis(500));
        let (writer, _commands) = WriteHandle::test_handle();
        let (machine, _events, _idle) = standalone_machine(config.clone(), writer);
        let (monitor, handle) = IdleMonitor::new(config.idle_timeout);

        let task = tokio::spawn(monitor.run(machine.clone()));
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(300)).await;
            handle.on_activity();
        }
        assert!(machine.outcome().is_none());

        tokio::time::sleep(Duration::from_millis(600)).await;
        task.await.unwrap();
        assert_eq!(machine.outcome().unwrap().cause, CloseCause::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let config = Config::new().with_idle_timeout(Duration::from_millis(500));
        let (writer, _commands) = WriteHandle::test_handle();
        let (machine, _events, _idle) = standalone_machine(config.clone(), writer);
        let (monitor, handle) = IdleMonitor::new(config.idle_timeout);

        let task = tokio::spawn(monitor.run(machine.clone()));
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        task.await.unwrap();

        assert!(machine.outcome().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_after_cancel_does_not_rearm() {
        let config = Config::new().with_idle_timeout(Duration::from_millis(500));
        let (writer, _commands) = WriteHandle::test_handle();
        let (machine, _events, _idle) = standalone_machine(config.clone(), writer);
        let (monitor, handle) = IdleMonitor::new(config.idle_timeout);

        let task = tokio::spawn(monitor.run(machine.clone()));
        handle.cancel();
        handle.on_activity();
        tokio::time::sleep(Duration::from_secs(2)).await;
        task.await.unwrap();

        assert!(machine.outcome().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_monitor_never_fires() {
        let (writer, _commands) = WriteHandle::test_handle();
        let (machine, _events, _idle) = standalone_machine(Config::default(), writer);
        let (monitor, handle) = IdleMonitor::new(None);

        let task = tokio::spawn(monitor.run(machine.clone()));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(machine.outcome().is_none());

        handle.cancel();
        task.await.unwrap();
    }
}
