//! Bounded worker pool that executes runs concurrently.
//!
//! ```text
//! submit() ──► mpsc queue ──► dispatcher ──► semaphore ──► Orchestrator::execute
//!                 (bounded)                  (N permits)         │
//!                                                                ▼
//!                                              oneshot reply ◄── RunOutcome
//! ```
//!
//! A run is executed by exactly one worker. Runs never share a session, so
//! concurrent runs cannot see each other's history.

use std::sync::Arc;

use mise_store::RecipeRepository;
use mise_types::{Product, ProductId, RecipeRun, RunId, RunOutcome, RunStatus};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{PipelineError, Result};
use crate::orchestrator::Orchestrator;

/// One queued run.
#[derive(Debug)]
pub struct RunJob {
    pub run_id: RunId,
    pub product: Product,
    pub description: Option<String>,
    reply: Option<oneshot::Sender<RunOutcome>>,
}

impl RunJob {
    pub fn new(run_id: RunId, product: Product, description: Option<String>) -> Self {
        Self {
            run_id,
            product,
            description,
            reply: None,
        }
    }
}

/// Pool of workers pulling jobs from a bounded queue.
pub struct WorkerPool {
    sender: mpsc::Sender<RunJob>,
    dispatcher: JoinHandle<()>,
}

impl WorkerPool {
    /// Start the dispatcher. At most `concurrency` runs execute at once and
    /// at most `queue_capacity` wait; further submissions wait for room.
    pub fn start(orchestrator: Arc<Orchestrator>, concurrency: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let dispatcher = tokio::spawn(dispatch(orchestrator, receiver, permits));
        tracing::debug!(concurrency, queue_capacity, "worker pool started");
        Self { sender, dispatcher }
    }

    /// Queue a job, waiting while the queue is full.
    pub async fn enqueue(&self, job: RunJob) -> Result<()> {
        self.sender
            .send(job)
            .await
            .map_err(|_| PipelineError::QueueClosed)
    }

    /// Stop accepting jobs and wait for queued and running ones to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.dispatcher.await {
            tracing::error!(error = %e, "worker dispatcher panicked");
        }
    }
}

async fn dispatch(
    orchestrator: Arc<Orchestrator>,
    mut receiver: mpsc::Receiver<RunJob>,
    permits: Arc<Semaphore>,
) {
    let mut running = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            tracing::error!("worker semaphore closed");
            break;
        };
        let orchestrator = orchestrator.clone();

        running.spawn(async move {
            let _permit = permit;
            let RunJob {
                run_id,
                product,
                description,
                reply,
            } = job;

            let outcome = orchestrator
                .execute(run_id, &product, description.as_deref())
                .await;
            if let Some(reply) = reply {
                // The submitter may have stopped waiting
                let _ = reply.send(outcome);
            }
        });

        while let Some(finished) = running.try_join_next() {
            log_join(finished);
        }
    }

    while let Some(finished) = running.join_next().await {
        log_join(finished);
    }
    tracing::debug!("worker pool drained");
}

fn log_join(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "run worker panicked");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// A run handed to the pool, with a handle on its eventual outcome.
#[derive(Debug)]
pub struct Submission {
    pub run: RecipeRun,
    outcome: oneshot::Receiver<RunOutcome>,
}

impl Submission {
    /// Wait for the run to finish.
    pub async fn wait(self) -> RunOutcome {
        let run_id = self.run.id;
        self.outcome
            .await
            .unwrap_or_else(|_| RunOutcome::failed(run_id, "worker stopped before the run finished"))
    }
}

/// Entry point for callers: creates runs and feeds them to the pool.
pub struct Pipeline {
    repo: Arc<dyn RecipeRepository>,
    pool: WorkerPool,
}

impl Pipeline {
    pub fn new(orchestrator: Arc<Orchestrator>, concurrency: usize, queue_capacity: usize) -> Self {
        let repo = orchestrator.repository().clone();
        Self {
            repo,
            pool: WorkerPool::start(orchestrator, concurrency, queue_capacity),
        }
    }

    /// Create a `pending` run for `product_id` and queue it.
    pub async fn submit(
        &self,
        product_id: ProductId,
        description: Option<String>,
    ) -> Result<Submission> {
        let product = self.repo.get_product(product_id).map_err(|e| {
            if e.is_not_found() {
                PipelineError::ProductNotFound(product_id)
            } else {
                PipelineError::Store(e)
            }
        })?;
        let run = self.repo.create_run(product_id)?;
        tracing::info!(run_id = run.id, product_id, "run created");

        let (reply, outcome) = oneshot::channel();
        let job = RunJob {
            reply: Some(reply),
            ..RunJob::new(run.id, product, description)
        };
        if let Err(e) = self.pool.enqueue(job).await {
            // Never leave a run pending that no worker will pick up
            if let Err(status_err) = self.repo.set_status(run.id, RunStatus::Error) {
                tracing::warn!(run_id = run.id, error = %status_err, "could not mark run as failed");
            }
            return Err(e);
        }

        Ok(Submission { run, outcome })
    }

    /// Submit and wait for the outcome.
    pub async fn run(&self, product_id: ProductId, description: Option<String>) -> Result<RunOutcome> {
        Ok(self.submit(product_id, description).await?.wait().await)
    }

    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
