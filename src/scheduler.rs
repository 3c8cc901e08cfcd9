use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::params::GlitchParams;

/// Debounced, last-writer-wins pipeline runs. Results superseded while the job
/// ran are dropped.
pub struct ParamScheduler {
    tx: Option<mpsc::Sender<(u64, GlitchParams)>>,
    generation: Arc<AtomicU64>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ParamScheduler {
    /// Start the worker. `job` runs on the worker thread; `deliver` receives
    /// `(generation, params, result)` for runs that are still the newest.
    pub fn spawn<R, F, D>(debounce: Duration, mut job: F, mut deliver: D) -> Self
    where
        F: FnMut(&GlitchParams) -> R + Send + 'static,
        D: FnMut(u64, GlitchParams, R) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<(u64, GlitchParams)>();
        let generation = Arc::new(AtomicU64::new(0));
        let latest_generation = Arc::clone(&generation);

        let worker = thread::spawn(move || loop {
            let (mut tag, mut params) = match rx.recv() {
                Ok(next) => next,
                Err(_) => return,
            };

            // Coalesce until the input goes quiet.
            loop {
                match rx.recv_timeout(debounce) {
                    Ok((g, p)) => {
                        tag = g;
                        params = p;
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }

            let result = job(&params);
            if latest_generation.load(Ordering::SeqCst) == tag {
                deliver(tag, params, result);
            } else {
                log::debug!("Discarding superseded run {}", tag);
            }
        });

        Self {
            tx: Some(tx),
            generation,
            worker: Some(worker),
        }
    }

    /// Queue new parameters. Returns the generation tag of this submission.
    pub fn submit(&self, params: GlitchParams) -> u64 {
        let tag = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(tx) = &self.tx {
            if tx.send((tag, params)).is_err() {
                log::warn!("Scheduler worker has exited; dropping submission {}", tag);
            }
        }
        tag
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Drop for ParamScheduler {
    fn drop(&mut self) {
        // closing the channel ends the worker loop; pending work is discarded
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
