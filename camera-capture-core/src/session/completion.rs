use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::models::error::CaptureError;

/// Pending result of an operation running on another context.
///
/// Returned by orchestrator and permission operations so the calling thread
/// never blocks unless it chooses to wait.
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<Result<T, CaptureError>>,
}

/// Producer half of a [`Completion`]. Dropping it unfulfilled reports
/// `CaptureError::SessionClosed` to the waiter.
#[derive(Debug)]
pub(crate) struct Completer<T> {
    tx: Sender<Result<T, CaptureError>>,
}

pub(crate) fn completion<T>() -> (Completer<T>, Completion<T>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (Completer { tx }, Completion { rx })
}

impl<T> Completer<T> {
    pub(crate) fn complete(self, value: T) {
        // The waiter may have given up; nothing to report then.
        let _ = self.tx.send(Ok(value));
    }

    pub(crate) fn fail(self, error: CaptureError) {
        let _ = self.tx.send(Err(error));
    }
}

impl<T> Completion<T> {
    /// A completion that already holds its value.
    pub fn ready(value: T) -> Self {
        let (completer, completion) = completion();
        completer.complete(value);
        completion
    }

    /// A completion that already failed.
    pub fn failed(error: CaptureError) -> Self {
        let (completer, completion) = completion();
        completer.fail(error);
        completion
    }

    /// Block until the result arrives.
    pub fn wait(self) -> Result<T, CaptureError> {
        self.rx.recv().unwrap_or(Err(CaptureError::SessionClosed))
    }

    /// Block for at most `timeout`. On timeout the completion stays usable.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, CaptureError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::Timeout(format!(
                "completion after {} ms",
                timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::SessionClosed),
        }
    }

    /// Take the result if it has arrived.
    pub fn try_take(&self) -> Option<Result<T, CaptureError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CaptureError::SessionClosed)),
        }
    }
}
