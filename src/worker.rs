//! Background pipeline worker for multi-threaded hosts.
//!
//! [`PipelineWorker`] confines a [`Pipeline`] (and therefore its cache and
//! regression window) to one dedicated thread, so no locking is needed around
//! either.
//!
//! ```text
//! ┌─────────────┐    bounded channel     ┌──────────────────┐
//! │  UI thread  │ ──ParameterState────▶  │ Pipeline thread  │
//! │             │                        │ (coalesce + run) │
//! │             │ ◀──PipelineUpdate────  │                  │
//! └─────────────┘   unbounded channel    └──────────────────┘
//! ```
//!
//! When several states are queued by the time the worker is free, only the
//! newest one is computed. Older requests are superseded, which is the only
//! form of cancellation the pipeline needs.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::config::EngineConfig;
use crate::pipeline::{Pipeline, PipelineError, PipelineStats, PipelineUpdate};
use crate::store::ParameterState;

/// Default number of queued states before [`PipelineWorker::submit`] blocks
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Message produced for each computed state
pub type WorkerUpdate = Result<PipelineUpdate, PipelineError>;

/// A [`Pipeline`] running on its own thread.
///
/// # Drop Safety
///
/// If [`finish`](Self::finish) is not called before the worker is dropped, the
/// destructor closes the request channel, waits for the thread and logs a
/// warning.
pub struct PipelineWorker {
    /// Request sender (None after finish() is called)
    sender: Option<Sender<ParameterState>>,
    updates: Receiver<WorkerUpdate>,
    /// Worker thread handle (None after finish() is called)
    handle: Option<JoinHandle<PipelineStats>>,
}

impl PipelineWorker {
    /// Spawn a worker with the default queue capacity
    pub fn spawn(config: EngineConfig) -> Result<Self, PipelineError> {
        Self::with_capacity(config, DEFAULT_QUEUE_CAPACITY)
    }

    /// Spawn a worker whose request queue holds `capacity` states.
    ///
    /// The thread is named `"flowspec-pipeline"`.
    pub fn with_capacity(config: EngineConfig, capacity: usize) -> Result<Self, PipelineError> {
        let (sender, receiver) = bounded::<ParameterState>(capacity.max(1));
        let (update_tx, updates) = unbounded::<WorkerUpdate>();

        let handle = thread::Builder::new()
            .name("flowspec-pipeline".to_string())
            .spawn(move || run_worker(Pipeline::new(config), receiver, update_tx))
            .map_err(|e| PipelineError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            sender: Some(sender),
            updates,
            handle: Some(handle),
        })
    }

    /// Queue a state for computation, blocking while the queue is full.
    pub fn submit(&self, state: ParameterState) -> Result<(), PipelineError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(PipelineError::WorkerDisconnected)?;
        sender
            .send(state)
            .map_err(|_| PipelineError::WorkerDisconnected)
    }

    /// Channel of computed updates, in computation order
    pub fn updates(&self) -> &Receiver<WorkerUpdate> {
        &self.updates
    }

    /// Newest update already available, discarding older ones
    pub fn latest(&self) -> Option<WorkerUpdate> {
        self.updates.try_iter().last()
    }

    /// Close the request queue, wait for pending work and return the counters.
    pub fn finish(mut self) -> Result<PipelineStats, PipelineError> {
        self.sender.take();

        let handle = self
            .handle
            .take()
            .ok_or(PipelineError::WorkerDisconnected)?;

        handle.join().map_err(|_| PipelineError::WorkerPanicked)
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            log::warn!("PipelineWorker dropped without calling finish()");
            let _ = handle.join();
        }
    }
}

fn run_worker(
    mut pipeline: Pipeline,
    requests: Receiver<ParameterState>,
    updates: Sender<WorkerUpdate>,
) -> PipelineStats {
    log::info!("Pipeline worker started");

    while let Ok(mut state) = requests.recv() {
        let mut superseded = 0usize;
        while let Ok(newer) = requests.try_recv() {
            state = newer;
            superseded += 1;
        }
        if superseded > 0 {
            log::debug!("Coalesced {} stale pipeline requests", superseded);
        }

        if updates.send(pipeline.run_and_record(&state)).is_err() {
            break;
        }
    }

    let stats = pipeline.stats();
    log::info!("Pipeline worker stopped: {}", stats);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(delta_t_norm: f64) -> ParameterState {
        ParameterState {
            delta_t_norm,
            ..Default::default()
        }
    }

    #[test]
    fn test_submit_and_receive() {
        let worker = PipelineWorker::spawn(EngineConfig::default()).unwrap();
        worker.submit(state(0.5)).unwrap();

        let update = worker.updates().recv().unwrap().unwrap();
        assert_eq!(update.state, state(0.5));
        assert!(update.result.t_start < update.result.t_end);

        let stats = worker.finish().unwrap();
        assert_eq!(stats.runs, 1);
    }

    #[test]
    fn test_newest_state_is_always_computed() {
        let worker = PipelineWorker::with_capacity(EngineConfig::default(), 8).unwrap();
        let updates = worker.updates().clone();
        let submitted = [0.2, 0.3, 0.4, 0.5, 0.6];
        for dt in submitted {
            worker.submit(state(dt)).unwrap();
        }

        let stats = worker.finish().unwrap();
        let received: Vec<PipelineUpdate> = updates.iter().map(|u| u.unwrap()).collect();

        assert!(!received.is_empty());
        assert!(received.len() <= submitted.len());
        assert_eq!(received.len(), stats.runs);
        assert_eq!(received.last().map(|u| u.state), Some(state(0.6)));
    }

    #[test]
    fn test_errors_are_reported_and_worker_continues() {
        let worker = PipelineWorker::spawn(EngineConfig::default()).unwrap();
        worker
            .submit(ParameterState {
                t_min: 1.0,
                t_max: 1.0,
                ..Default::default()
            })
            .unwrap();
        let first = worker.updates().recv().unwrap();
        assert!(matches!(first, Err(PipelineError::Profile(_))));

        worker.submit(state(0.5)).unwrap();
        assert!(worker.updates().recv().unwrap().is_ok());
        assert!(worker.finish().is_ok());
    }

    #[test]
    fn test_latest() {
        let worker = PipelineWorker::spawn(EngineConfig::default()).unwrap();
        assert!(worker.latest().is_none());

        worker.submit(state(0.5)).unwrap();
        let update = loop {
            if let Some(update) = worker.latest() {
                break update;
            }
            thread::yield_now();
        };
        assert_eq!(update.unwrap().state, state(0.5));
        assert_eq!(worker.finish().unwrap().runs, 1);
    }
}
