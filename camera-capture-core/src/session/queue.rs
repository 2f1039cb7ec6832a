use std::thread;

use crossbeam_channel::Sender;

use crate::models::error::CaptureError;
use crate::session::completion::{completion, Completion};

type Job<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// A dedicated thread that owns a context `C` and runs submitted jobs
/// against it one at a time, in submission order.
///
/// The context never leaves the thread, so every mutation of it is
/// serialized without further locking.
pub(crate) struct SerialQueue<C> {
    name: String,
    tx: Option<Sender<Job<C>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl<C: Send + 'static> SerialQueue<C> {
    pub(crate) fn spawn(name: &str, mut context: C) -> Result<Self, CaptureError> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job<C>>();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                for job in rx.iter() {
                    job(&mut context);
                }
                log::debug!("{} drained, exiting", thread_name);
            })
            .map_err(|e| {
                CaptureError::ConfigurationFailed(format!("failed to spawn {}: {}", name, e))
            })?;

        Ok(Self {
            name: name.to_string(),
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub(crate) fn submit(
        &self,
        job: impl FnOnce(&mut C) + Send + 'static,
    ) -> Result<(), CaptureError> {
        let tx = self.tx.as_ref().ok_or(CaptureError::SessionClosed)?;
        tx.send(Box::new(job)).map_err(|_| CaptureError::SessionClosed)
    }

    /// Submit a job and get its return value through a [`Completion`].
    pub(crate) fn submit_with_reply<T: Send + 'static>(
        &self,
        job: impl FnOnce(&mut C) -> T + Send + 'static,
    ) -> Completion<T> {
        let (completer, pending) = completion();
        match self.submit(move |context| completer.complete(job(context))) {
            Ok(()) => pending,
            Err(e) => Completion::failed(e),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.tx.is_some()
    }

    /// Stop accepting jobs, let queued ones finish, and join the thread.
    pub(crate) fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                log::warn!("{} shut down from its own thread, not joining", self.name);
                return;
            }
            if handle.join().is_err() {
                log::error!("{} panicked", self.name);
            }
        }
    }
}

impl<C> Drop for SerialQueue<C> {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
