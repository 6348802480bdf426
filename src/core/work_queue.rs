// Work Queue
// FIFO of closures posted by background tasks and run on the UI thread

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// A unit of work executed against the UI-owned state
pub type Job<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

/// Cloneable handle background tasks use to reach the UI thread
pub struct WorkSender<T> {
    tx: UnboundedSender<Job<T>>,
}

impl<T> Clone for WorkSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> WorkSender<T> {
    /// Queue `job` to run on the next tick
    pub fn run_on_ui<F>(&self, job: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            debug!("work queue closed, dropping job");
        }
    }
}

/// Receiving end, owned by the UI thread
pub struct WorkQueue<T> {
    tx: UnboundedSender<Job<T>>,
    rx: UnboundedReceiver<Job<T>>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> WorkSender<T> {
        WorkSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every job queued so far, in submission order
    pub fn take_pending(&mut self) -> Vec<Job<T>> {
        let mut jobs = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(job) => jobs.push(job),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_run_in_submission_order() {
        let mut queue: WorkQueue<Vec<u32>> = WorkQueue::new();
        let sender = queue.sender();
        for i in 0..5 {
            sender.run_on_ui(move |log| log.push(i));
        }

        let mut log = Vec::new();
        let jobs = queue.take_pending();
        assert_eq!(jobs.len(), 5);
        for job in jobs {
            job(&mut log);
        }
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
        assert!(queue.take_pending().is_empty());
    }

    #[test]
    fn test_jobs_from_other_threads() {
        let mut queue: WorkQueue<Vec<u32>> = WorkQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sender = queue.sender();
                std::thread::spawn(move || sender.run_on_ui(move |log| log.push(i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut log = Vec::new();
        for job in queue.take_pending() {
            job(&mut log);
        }
        log.sort();
        assert_eq!(log, vec![0, 1, 2, 3]);
    }
}
