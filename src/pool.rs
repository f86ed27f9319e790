//! Fixed-size worker pool with a single FIFO task queue.
//!
//! This replaces the "parallel-for via compiler pragma" pattern with
//! explicit task submission: a parallel-for over a range becomes
//! "partition the range into chunks, submit one task per chunk, collect
//! futures, combine" (see [`WorkerPool::map_chunks`]). No work-stealing
//! is needed — every task in this system is coarse (one per vector
//! batch during k-means or bucket assignment), so a single shared FIFO
//! queue keeps workers saturated without the bookkeeping a work-stealing
//! deque would add.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of OS threads pulling from one FIFO queue.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

/// A handle to a task's eventual result.
///
/// `recv()` blocks the calling thread until the task completes; it may
/// be called in any order relative to other outstanding handles.
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task completes and returns its result.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread running the task panicked, since
    /// that indicates a logic bug in the submitted closure rather than
    /// a reportable runtime condition.
    pub fn recv(self) -> T {
        self.receiver
            .recv()
            .expect("worker thread dropped its result sender without sending (panicked?)")
    }
}

impl WorkerPool {
    /// Spawns `n` workers (floored at 1) sharing one task queue.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let n = n.max(1);
        let (sender, receiver) = unbounded::<Job>();

        let workers = (0..n)
            .map(|_| {
                let receiver = receiver.clone();
                std::thread::spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Submits `task` to the FIFO queue and returns a handle for its
    /// result. Tasks already queued run to completion; this never
    /// cancels or times out.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        let sender = self
            .sender
            .as_ref()
            .expect("submit called after pool shutdown");
        sender
            .send(Box::new(move || {
                let _ = result_tx.send(task());
            }))
            .expect("worker threads have already been joined");
        TaskHandle { receiver: result_rx }
    }

    /// Splits `0..len` into `self.workers.len()` contiguous chunks,
    /// submits one task per chunk, and combines the per-chunk results
    /// in chunk order. The canonical parallel-for used by k-means'
    /// assignment step and IVF's bucket-population pass.
    pub fn map_chunks<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(std::ops::Range<usize>) -> T + Send + Sync + 'static,
    {
        if len == 0 {
            return Vec::new();
        }
        let n_chunks = self.workers.len().max(1).min(len);
        let chunk_size = len.div_ceil(n_chunks);
        let f = std::sync::Arc::new(f);

        let handles: Vec<_> = (0..n_chunks)
            .map(|c| {
                let start = c * chunk_size;
                let end = (start + chunk_size).min(len);
                let f = std::sync::Arc::clone(&f);
                self.submit(move || f(start..end))
            })
            .collect();

        handles.into_iter().map(TaskHandle::recv).collect()
    }
}

impl Drop for WorkerPool {
    /// Shutdown is a barrier: refuses further submissions (by dropping
    /// the sender, which closes the channel), drains whatever was
    /// already queued, then joins every worker before returning.
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
