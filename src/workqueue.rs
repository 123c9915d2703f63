//! A fixed thread pool with push/wait barrier semantics, matching
//! `original_source/src/sanjuuni.hpp`'s `WorkQueue` class: submitters push
//! closures, `wait()` blocks until every pushed closure (since the last
//! `wait()`) has completed, then resets the counters. There is no
//! cancellation or priority; task ordering between workers is unspecified.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    cv: Condvar,
    expected: Mutex<u64>,
    finished: Mutex<u64>,
    wait_cv: Condvar,
    shutdown: Mutex<bool>,
}

pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    /// Spawns `n` worker threads. `n = 0` falls back to the host's
    /// reported parallelism, or 8 if that cannot be determined.
    pub fn new(n: usize) -> Self {
        let n = if n == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(8)
        } else {
            n
        };

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            expected: Mutex::new(0),
            finished: Mutex::new(0),
            wait_cv: Condvar::new(),
            shutdown: Mutex::new(false),
        });

        let workers = (0..n)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || Self::worker_loop(shared))
            })
            .collect();

        #[cfg(feature = "debug-logging")]
        log::debug!("work queue started with {n} worker threads");

        WorkQueue { shared, workers }
    }

    fn worker_loop(shared: Arc<Shared>) {
        loop {
            let job = {
                let mut queue = shared.queue.lock().unwrap();
                loop {
                    if let Some(job) = queue.pop_front() {
                        break Some(job);
                    }
                    if *shared.shutdown.lock().unwrap() {
                        return;
                    }
                    queue = shared.cv.wait(queue).unwrap();
                }
            };
            if let Some(job) = job {
                job();
                let mut finished = shared.finished.lock().unwrap();
                *finished += 1;
                shared.wait_cv.notify_all();
            }
        }
    }

    /// Submits a closure; increments the expected-finish counter.
    pub fn push<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.shared.expected.lock().unwrap() += 1;
        self.shared.queue.lock().unwrap().push_back(Box::new(job));
        self.shared.cv.notify_one();
    }

    /// Blocks until every task pushed since the last `wait()` has
    /// completed, then resets the counters to zero.
    pub fn wait(&self) {
        let expected = *self.shared.expected.lock().unwrap();
        let mut finished = self.shared.finished.lock().unwrap();
        while *finished < expected {
            finished = self.shared.wait_cv.wait(finished).unwrap();
        }
        *finished = 0;
        *self.shared.expected.lock().unwrap() = 0;
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        *self.shared.shutdown.lock().unwrap() = true;
        self.shared.cv.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn push_and_wait_runs_all_tasks() {
        let queue = WorkQueue::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            queue.push(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        queue.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn wait_can_be_reused_across_batches() {
        let queue = WorkQueue::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for batch in 0..3 {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                queue.push(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
            queue.wait();
            assert_eq!(counter.load(Ordering::SeqCst), (batch + 1) * 10);
        }
    }
}
