use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Unbounded FIFO shared between producers and a polling consumer.
///
/// Backed by an unbounded mpsc channel whose receiver sits behind a mutex, so
/// the queue can be shared by every session a supervisor creates. Consumers
/// wait in bounded slices via [`WorkQueue::pop`] so they can check their own
/// stop conditions between waits.
#[derive(Debug)]
pub struct WorkQueue<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub fn push(&self, item: T) {
        // The receiver lives as long as the queue, so the channel is never closed
        let _ = self.sender.send(item);
    }

    /// Take the oldest item, waiting at most `timeout` for one to arrive
    pub async fn pop(&self, timeout: Duration) -> Option<T> {
        let next = async { self.receiver.lock().await.recv().await };
        tokio::time::timeout(timeout, next).await.ok().flatten()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test]
    async fn pop_preserves_order() {
        let queue = WorkQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);

        assert_eq!(queue.pop(Duration::ZERO).await, Some(1));
        assert_eq!(queue.pop(Duration::ZERO).await, Some(2));
        assert_eq!(queue.pop(Duration::ZERO).await, Some(3));
        assert_eq!(queue.pop(Duration::ZERO).await, None);
    }

    #[tokio::test]
    async fn pop_times_out_when_empty() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        let started = Instant::now();

        assert_eq!(queue.pop(Duration::from_millis(50)).await, None);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn pop_wakes_on_push() {
        let queue = Arc::new(WorkQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push("frame");

        assert_eq!(consumer.await.unwrap(), Some("frame"));
    }

    #[tokio::test]
    async fn abandoned_pop_loses_nothing() {
        let queue = WorkQueue::new();

        // A consumer cancelled mid-wait must leave later items in place
        let cancelled = tokio::select! {
            item = queue.pop(Duration::from_secs(5)) => item,
            _ = tokio::time::sleep(Duration::from_millis(20)) => None,
        };
        assert_eq!(cancelled, None);

        queue.push(7);
        assert_eq!(queue.pop(Duration::from_millis(50)).await, Some(7));
    }
}
