//! Chunked range execution on a dedicated thread pool.
//!
//! Database construction and verification iterate over enormous index
//! ranges with no shared mutable state beyond the atomic table cells, so the
//! only primitive needed is "split `[0, n)` into chunks and run them
//! concurrently". Workers join at the end of every call, which is the
//! barrier the round-based generation relies on.

use std::ops::Range;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Error;

/// Upper bound on the worker count.
pub const MAX_JOBS: usize = 256;

pub struct ParallelDriver {
    pool: ThreadPool,
    jobs: usize,
}

impl ParallelDriver {
    /// Build a driver with `jobs` workers, `1..=MAX_JOBS`.
    pub fn new(jobs: usize) -> Result<ParallelDriver, Error> {
        if jobs == 0 || jobs > MAX_JOBS {
            return Err(Error::usage(format!(
                "worker count {jobs} not in 1..={MAX_JOBS}"
            )));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| Error::Usage {
                reason: format!("cannot build worker pool: {e}"),
            })?;
        Ok(ParallelDriver { pool, jobs })
    }

    /// The default driver: one worker.
    pub fn single_threaded() -> ParallelDriver {
        ParallelDriver::new(1).expect("single-threaded pool")
    }

    #[inline]
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run `f` over `[0, n)` split into one chunk per worker, and wait for
    /// all of them. A panicking worker aborts the whole computation.
    pub fn run<F>(&self, n: usize, f: F)
    where
        F: Fn(Range<usize>) + Sync,
    {
        if n == 0 {
            return;
        }
        let chunk = n.div_ceil(self.jobs);
        self.pool.scope(|scope| {
            let f = &f;
            let mut start = 0;
            while start < n {
                let end = (start + chunk).min(n);
                scope.spawn(move |_| f(start..end));
                start = end;
            }
        });
    }
}
