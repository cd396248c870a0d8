//! Bounded worker pool
//!
//! Work items go through a bounded channel consumed by a fixed number of
//! worker tasks; results come back on a separate channel tagged with the
//! item's position, so callers get them in input order regardless of
//! completion order.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// What happened to one work item
#[derive(Debug)]
pub enum Completion<R> {
    Done(R),
    /// The job panicked; holds the panic message
    Panicked(String),
    /// Cancellation arrived before the item was picked up
    NotStarted,
}

/// Fixed-width pool of async workers
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(workers: usize, cancel: CancellationToken) -> Self {
        Self {
            workers: workers.max(1),
            cancel,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `job` over every item with at most `workers` jobs in flight
    ///
    /// Each job runs in its own task, so a panic is reported as
    /// [`Completion::Panicked`] and the worker moves on. Once the token is
    /// cancelled, items not yet picked up complete as
    /// [`Completion::NotStarted`]; jobs already running are left to observe
    /// the token themselves.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, job: F) -> Vec<Completion<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let total = items.len();
        let width = self.workers.min(total.max(1));

        let (work_tx, work_rx) = mpsc::channel::<(usize, T)>(width);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, Completion<R>)>();
        let job = Arc::new(job);

        let mut handles = Vec::with_capacity(width);
        for worker in 0..width {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let job = Arc::clone(&job);
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let next = work_rx.lock().await.recv().await;
                    let Some((index, item)) = next else {
                        break;
                    };

                    let completion = if cancel.is_cancelled() {
                        Completion::NotStarted
                    } else {
                        match tokio::spawn((*job)(item)).await {
                            Ok(result) => Completion::Done(result),
                            Err(e) => {
                                let message = panic_message(e);
                                tracing::error!("Worker {} job panicked: {}", worker, message);
                                Completion::Panicked(message)
                            }
                        }
                    };

                    if result_tx.send((index, completion)).is_err() {
                        break;
                    }
                }
                tracing::debug!("Worker {} finished", worker);
            }));
        }
        drop(result_tx);

        for (index, item) in items.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancelled, {} item(s) not queued", total - index);
                break;
            }
            if work_tx.send((index, item)).await.is_err() {
                break;
            }
        }
        drop(work_tx);

        let mut results: Vec<Completion<R>> = (0..total).map(|_| Completion::NotStarted).collect();
        while let Some((index, completion)) = result_rx.recv().await {
            results[index] = completion;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        results
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }

    let payload: Box<dyn Any + Send> = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
