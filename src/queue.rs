//! Serial rate-limited request queue.
//!
//! All outbound Qube API requests flow through one queue drained by a
//! single worker task, which spaces request starts `60000 / requests_per_minute`
//! milliseconds apart. Queued work lives only in process memory; anything
//! still queued when the process exits is lost.

use metrics::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::QubeError;

type QueuedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// FIFO queue that executes submitted tasks one at a time with a fixed
/// minimum spacing between task starts.
pub struct RateLimitedQueue {
    sender: mpsc::UnboundedSender<QueuedTask>,
}

impl RateLimitedQueue {
    /// Creates the queue and spawns its drain task.
    ///
    /// Must be called from within a Tokio runtime. `requests_per_minute`
    /// must be positive (enforced by configuration validation).
    pub fn new(requests_per_minute: u32) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let spacing = Duration::from_millis(60_000 / u64::from(requests_per_minute.max(1)));

        tokio::spawn(drain(receiver, spacing));

        Self { sender }
    }

    /// Submits a task and waits for its result.
    ///
    /// Tasks started by earlier `enqueue` calls always run first; the
    /// worker never overlaps two tasks.
    pub async fn enqueue<F, T>(&self, task: F) -> Result<T, QubeError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let queued_at = Instant::now();

        let wrapped: QueuedTask = Box::pin(async move {
            histogram!("qube_queue_wait_ms").record(queued_at.elapsed().as_secs_f64() * 1_000.0);
            let output = task.await;
            let _ = result_tx.send(output);
        });

        counter!("qube_queue_tasks_total").increment(1);

        if self.sender.send(wrapped).is_err() {
            return Err(QubeError::QueueClosed);
        }

        result_rx.await.map_err(|_| QubeError::QueueClosed)
    }
}

/// Runs queued tasks in submission order, sleeping for `spacing` after
/// each one. Task panics are confined to the task itself.
async fn drain(mut receiver: mpsc::UnboundedReceiver<QueuedTask>, spacing: Duration) {
    debug!(spacing_ms = spacing.as_millis() as u64, "Request queue drain task started");

    while let Some(task) = receiver.recv().await {
        let _ = tokio::spawn(task).await;
        sleep(spacing).await;
    }

    debug!("Request queue drain task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn tasks_run_in_submission_order() {
        let queue = Arc::new(RateLimitedQueue::new(600));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..10 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(async move {
                        order.lock().unwrap().push(i);
                    })
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // Spawned submitters race each other, so only check that the queue
        // ran everything exactly once.
        let mut seen = order.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_enqueues_preserve_order() {
        let queue = RateLimitedQueue::new(600);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            queue
                .enqueue(async move {
                    order.lock().unwrap().push(i);
                })
                .await
                .unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn task_starts_are_spaced_apart() {
        // 60 requests per minute: one second between task starts.
        let queue = RateLimitedQueue::new(60);
        let starts = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let starts = starts.clone();
            queue
                .enqueue(async move {
                    starts.lock().unwrap().push(Instant::now());
                })
                .await
                .unwrap();
        }

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_task_does_not_stop_the_queue() {
        let queue = RateLimitedQueue::new(600);

        let result: Result<(), QubeError> = queue
            .enqueue(async {
                panic!("task blew up");
            })
            .await;
        assert!(matches!(result, Err(QubeError::QueueClosed)));

        let result = queue.enqueue(async { 42 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_returns_task_output() {
        let queue = RateLimitedQueue::new(600);
        let value = queue.enqueue(async { "done" }).await.unwrap();
        assert_eq!(value, "done");
    }
}
