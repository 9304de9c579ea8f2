use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, warn};

use crate::errors::{BridgeError, EpisodeError};
use crate::state::Frame;

use super::emulator::Emulator;

type StepResult = Result<Option<Frame>, BridgeError>;

/// Owns the emulator on a dedicated thread so each blocking step can be given a deadline.
///
/// A step that misses its deadline is abandoned, not cancelled: the thread stays blocked until
/// the emulator process is stopped. A thread with a step still in flight is never joined.
///
/// Only steps are bounded. Controller writes run on the control loop's task and block if the
/// bridge stops draining its stdin; stopping the bridge fails such a write with a broken pipe.
pub struct StepThread {
    requests: mpsc::Sender<()>,
    results: UnboundedReceiver<StepResult>,
    handle: JoinHandle<()>,
    in_flight: bool,
}

impl StepThread {
    pub fn spawn<E: Emulator>(mut emulator: E) -> io::Result<Self> {
        let (requests, request_rx) = mpsc::channel::<()>();
        let (result_tx, results) = unbounded_channel();

        let handle = thread::Builder::new()
            .name("emulator-step".to_string())
            .spawn(move || {
                while request_rx.recv().is_ok() {
                    if result_tx.send(emulator.step()).is_err() {
                        break;
                    }
                }
                debug!("Step thread exiting");
            })?;

        Ok(Self {
            requests,
            results,
            handle,
            in_flight: false,
        })
    }

    /// Advance the emulator by one frame, failing if that takes longer than `timeout`.
    pub async fn step(&mut self, timeout: Duration) -> Result<Option<Frame>, EpisodeError> {
        if self.in_flight || self.requests.send(()).is_err() {
            return Err(BridgeError::NotRunning.into());
        }
        self.in_flight = true;

        match tokio::time::timeout(timeout, self.results.recv()).await {
            Ok(Some(result)) => {
                self.in_flight = false;
                Ok(result?)
            }
            Ok(None) => Err(BridgeError::Disconnected.into()),
            Err(_) => Err(EpisodeError::StepTimeout(timeout)),
        }
    }

    /// Let the thread exit. Joins it unless a step is still in flight.
    pub fn finish(self) {
        let StepThread {
            requests,
            handle,
            in_flight,
            ..
        } = self;
        drop(requests);

        if in_flight {
            warn!("Leaving blocked step thread behind");
            return;
        }
        if handle.join().is_err() {
            warn!("Step thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Menu;
    use crate::runner::Shutdown;
    use std::sync::Arc;
    use std::time::Instant;

    struct Counter {
        next: i64,
        delay: Duration,
    }

    struct NoopShutdown;

    impl Shutdown for NoopShutdown {
        fn stop(&self) {}
    }

    impl Emulator for Counter {
        fn connect(&mut self) -> bool {
            true
        }

        fn step(&mut self) -> Result<Option<Frame>, BridgeError> {
            thread::sleep(self.delay);
            self.next += 1;
            Ok(Some(Frame::new(self.next, Menu::InGame)))
        }

        fn shutdown_handle(&self) -> Arc<dyn Shutdown> {
            Arc::new(NoopShutdown)
        }
    }

    #[tokio::test]
    async fn test_steps_in_order() {
        let mut steps = StepThread::spawn(Counter {
            next: 0,
            delay: Duration::ZERO,
        })
        .unwrap();
        for expected in 1..=3 {
            let frame = steps.step(Duration::from_secs(1)).await.unwrap().unwrap();
            assert_eq!(frame.index, expected);
        }
        steps.finish();
    }

    #[tokio::test]
    async fn test_slow_step_times_out() {
        let mut steps = StepThread::spawn(Counter {
            next: 0,
            delay: Duration::from_millis(500),
        })
        .unwrap();

        let started = Instant::now();
        let result = steps.step(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(EpisodeError::StepTimeout(_))));
        assert!(started.elapsed() < Duration::from_millis(400));

        // The abandoned step is still running, so no further step is accepted
        assert!(steps.step(Duration::from_millis(50)).await.is_err());
        steps.finish();
    }
}
