//! Shared run state for the frame loop and its stop requests.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// Lifecycle of the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Running,
    Stopping,
}

impl CycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CycleState::Running,
            2 => CycleState::Stopping,
            _ => CycleState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CycleState::Idle => 0,
            CycleState::Running => 1,
            CycleState::Stopping => 2,
        }
    }
}

/// Cloneable handle on the loop state.
///
/// Every blocking wait in the loop goes through [`RunSignal::sleep`] or
/// selects on [`RunSignal::wake_receiver`], so a stop request interrupts it.
#[derive(Debug, Clone)]
pub struct RunSignal {
    state: Arc<AtomicU8>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSignal {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            state: Arc::new(AtomicU8::new(CycleState::Idle.as_u8())),
            wake_tx,
            wake_rx,
        }
    }

    pub fn state(&self) -> CycleState {
        CycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == CycleState::Running
    }

    /// Idle → Running. Returns false if the loop is not idle.
    pub fn try_start(&self) -> bool {
        let started = self
            .state
            .compare_exchange(
                CycleState::Idle.as_u8(),
                CycleState::Running.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if started {
            // Discard a wakeup left over from an earlier run
            while self.wake_rx.try_recv().is_ok() {}
        }
        started
    }

    /// Running → Stopping, waking any blocked wait. Returns false if the
    /// loop was not running.
    pub fn request_stop(&self) -> bool {
        let stopping = self
            .state
            .compare_exchange(
                CycleState::Running.as_u8(),
                CycleState::Stopping.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if stopping {
            let _ = self.wake_tx.try_send(());
        }
        stopping
    }

    /// Back to Idle once the loop has exited
    pub fn finish(&self) {
        self.state
            .store(CycleState::Idle.as_u8(), Ordering::SeqCst);
    }

    /// Sleep up to `duration`; returns true if a stop was requested meanwhile
    pub fn sleep(&self, duration: Duration) -> bool {
        if !self.is_running() {
            return true;
        }
        match self.wake_rx.recv_timeout(duration) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => !self.is_running(),
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    /// Receiver that becomes ready when a stop is requested
    pub fn wake_receiver(&self) -> &Receiver<()> {
        &self.wake_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_state_transitions() {
        let signal = RunSignal::new();
        assert_eq!(signal.state(), CycleState::Idle);
        assert!(!signal.request_stop());

        assert!(signal.try_start());
        assert!(!signal.try_start());
        assert!(signal.is_running());

        assert!(signal.request_stop());
        assert_eq!(signal.state(), CycleState::Stopping);
        assert!(!signal.try_start());

        signal.finish();
        assert_eq!(signal.state(), CycleState::Idle);
        assert!(signal.try_start());
    }

    #[test]
    fn test_sleep_times_out_while_running() {
        let signal = RunSignal::new();
        signal.try_start();
        assert!(!signal.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_stop_interrupts_sleep() {
        let signal = RunSignal::new();
        signal.try_start();

        let remote = signal.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.request_stop();
        });

        let started = Instant::now();
        assert!(signal.sleep(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(5));
        stopper.join().unwrap();
    }

    #[test]
    fn test_stale_wakeup_discarded_on_restart() {
        let signal = RunSignal::new();
        signal.try_start();
        signal.request_stop();
        signal.finish();

        signal.try_start();
        assert!(!signal.sleep(Duration::from_millis(5)));
    }
}
