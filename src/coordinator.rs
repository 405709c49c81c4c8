use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crate::{
    config::Timing,
    error::{Error, Result},
    events::Reporter,
    monitor::Monitor,
    worker::{self, Outcome},
};

pub type WorkerHandle = JoinHandle<Outcome>;

/// Owns the shared monitor and the worker threads contending for it.
pub struct Coordinator<R: ?Sized> {
    monitor: Arc<Monitor>,
    reporter: Arc<R>,
    timing: Timing,
}

impl<R> Coordinator<R>
where
    R: Reporter + ?Sized + 'static,
{
    pub fn new(reporter: Arc<R>, timing: Timing) -> Self {
        Self {
            monitor: Arc::new(Monitor::new()),
            reporter,
            timing,
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Starts `count` worker threads, each running `work` once it gets into the monitor.
    pub fn spawn<F>(&self, count: usize, work: F) -> Result<Vec<WorkerHandle>>
    where
        F: FnOnce(&Timing) -> Result<()> + Clone + Send + 'static,
    {
        let handles = start_all(count, |n| {
            let monitor = Arc::clone(&self.monitor);
            let reporter = Arc::clone(&self.reporter);
            let timing = self.timing;
            let work = work.clone();
            thread::Builder::new()
                .name(format!("monitor-worker-{}", n))
                .spawn(move || worker::run(&monitor, &*reporter, timing, work))
        })?;
        tracing::info!(count, "workers spawned");
        Ok(handles)
    }

    /// Spawns `count` workers that each hold the monitor for the hold interval, then joins them.
    pub fn run(&self, count: usize) -> Result<Vec<Outcome>> {
        let handles = self.spawn(count, worker::hold)?;
        join_all(handles)
    }
}

/// Calls `start` for workers `1..=count`. If one fails to start, the ones
/// already running are joined before the error is returned.
fn start_all<S>(count: usize, mut start: S) -> Result<Vec<WorkerHandle>>
where
    S: FnMut(usize) -> io::Result<WorkerHandle>,
{
    let mut handles = Vec::with_capacity(count);
    for n in 1..=count {
        match start(n) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                tracing::error!(%err, started = handles.len(), "worker failed to start");
                // outcome is irrelevant, the spawn error is what gets reported
                let _ = join_all(handles);
                return Err(Error::Spawn(err));
            }
        }
    }
    Ok(handles)
}

/// Blocks until every worker has terminated. Every handle is joined even
/// if an earlier one failed; the first failure is returned.
pub fn join_all(handles: Vec<WorkerHandle>) -> Result<Vec<Outcome>> {
    let mut outcomes = Vec::with_capacity(handles.len());
    let mut failed = None;
    for handle in handles {
        let name = handle.thread().name().unwrap_or("unnamed").to_string();
        match handle.join() {
            Ok(outcome) => {
                tracing::info!(
                    worker = outcome.worker,
                    acquired = outcome.acquired,
                    retries = outcome.retries,
                    failure = ?outcome.failure,
                    "worker finished"
                );
                outcomes.push(outcome);
            }
            Err(_) => {
                tracing::error!(thread = %name, "worker terminated abnormally");
                failed.get_or_insert(Error::Join(name));
            }
        }
    }
    match failed {
        Some(err) => Err(err),
        None => {
            tracing::info!(count = outcomes.len(), "all workers joined");
            Ok(outcomes)
        }
    }
}
