//! Debounced background validation.
//!
//! A [`ValidationTimer`] is restarted by every change; the single worker
//! thread sleeps until the timer has been quiet for the configured delay and
//! then runs one validation pass. Restarting the timer only postpones a pass
//! that has not started yet.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use super::NedError;

#[derive(Debug)]
pub(crate) struct ValidationTimer {
    deadline: Mutex<Option<Instant>>,
    cv: Condvar,
    delay: Duration,
    cancel: CancellationToken,
}

impl ValidationTimer {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            deadline: Mutex::new(None),
            cv: Condvar::new(),
            delay,
            cancel: CancellationToken::new(),
        })
    }

    /// Schedule a pass `delay` from now, replacing any pending deadline.
    pub fn restart(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        *self.deadline.lock() = Some(Instant::now() + self.delay);
        self.cv.notify_all();
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.lock().is_some()
    }

    /// Token cancelled by [`shutdown`](Self::shutdown); a running pass
    /// checks it between files.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
        // Taken after cancelling so a waiter cannot miss the wakeup.
        *self.deadline.lock() = None;
        self.cv.notify_all();
    }

    /// Block until a deadline passes; `false` once cancelled.
    fn wait(&self) -> bool {
        let mut deadline = self.deadline.lock();
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            match *deadline {
                None => self.cv.wait(&mut deadline),
                Some(at) if Instant::now() >= at => {
                    *deadline = None;
                    return true;
                }
                Some(at) => {
                    self.cv.wait_until(&mut deadline, at);
                }
            }
        }
    }
}

/// The validation thread of one engine.
#[derive(Debug)]
pub(crate) struct ValidationWorker {
    timer: Arc<ValidationTimer>,
    handle: Option<JoinHandle<()>>,
}

impl ValidationWorker {
    /// Start the thread. `pass` runs one validation, giving up early once
    /// the token is cancelled, and returns `false` when the engine is gone.
    pub fn spawn(
        timer: Arc<ValidationTimer>,
        pass: impl Fn(&CancellationToken) -> bool + Send + 'static,
    ) -> Result<Self, NedError> {
        let thread_timer = timer.clone();
        let handle = thread::Builder::new()
            .name("ned-validation".into())
            .spawn(move || {
                while thread_timer.wait() {
                    if !pass(thread_timer.token()) {
                        break;
                    }
                }
                tracing::debug!("validation worker stopped");
            })
            .map_err(NedError::Worker)?;
        Ok(Self {
            timer,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for a running pass to finish.
    pub fn stop(&mut self) {
        self.timer.shutdown();
        if let Some(handle) = self.handle.take() {
            // A listener running on the worker itself may dispose the engine.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!("validation worker panicked");
            }
        }
    }
}

impl Drop for ValidationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
