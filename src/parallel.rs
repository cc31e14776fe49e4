use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_MIN_BATCH_SIZE: usize = 32;

fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    /// 0 means host parallelism.
    pub num_workers: usize,
    pub min_batch_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: host_parallelism(),
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
        }
    }
}

impl ParallelConfig {
    pub fn serial() -> Self {
        Self {
            num_workers: 1,
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
        }
    }

    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Self::default()
        }
    }

    pub fn with_min_batch_size(mut self, min_batch_size: usize) -> Self {
        self.min_batch_size = min_batch_size;
        self
    }

    pub fn normalized(self) -> Self {
        Self {
            num_workers: if self.num_workers == 0 {
                host_parallelism()
            } else {
                self.num_workers
            },
            min_batch_size: self.min_batch_size.max(1),
        }
    }
}

pub struct ParallelExecutor {
    config: ParallelConfig,
    pool: Option<ThreadPool>,
}

impl fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("config", &self.config)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(ParallelConfig::default())
    }
}

impl ParallelExecutor {
    pub fn new(config: ParallelConfig) -> Self {
        let config = config.normalized();
        let pool = if config.num_workers > 1 {
            match ThreadPoolBuilder::new()
                .num_threads(config.num_workers)
                .thread_name(|i| format!("sph-worker-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    log::warn!(
                        "failed to start {} workers, running serially: {err}",
                        config.num_workers
                    );
                    None
                }
            }
        } else {
            None
        };
        Self { config, pool }
    }

    pub fn config(&self) -> ParallelConfig {
        self.config
    }

    pub fn workers(&self) -> usize {
        self.config.num_workers
    }

    fn chunk_len(&self, len: usize) -> Option<(usize, &ThreadPool)> {
        let pool = self.pool.as_ref()?;
        if len < self.config.min_batch_size || self.config.num_workers <= 1 {
            return None;
        }
        Some((len.div_ceil(self.config.num_workers), pool))
    }

    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        let Some((chunk, pool)) = self.chunk_len(items.len()) else {
            for (i, item) in items.iter_mut().enumerate() {
                f(i, item);
            }
            return;
        };
        pool.install(|| {
            items
                .par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(c, slice)| {
                    let base = c * chunk;
                    for (k, item) in slice.iter_mut().enumerate() {
                        f(base + k, item);
                    }
                });
        });
    }

    pub fn fill<R, F>(&self, out: &mut [R], f: F)
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        self.for_each_mut(out, |i, slot| *slot = f(i));
    }

    pub fn map_range<R, F>(&self, range: Range<usize>, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        let start = range.start;
        let len = range.len();
        let Some((chunk, pool)) = self.chunk_len(len) else {
            return range.map(f).collect();
        };
        let chunks = len.div_ceil(chunk);
        let parts: Vec<Vec<R>> = pool.install(|| {
            (0..chunks)
                .into_par_iter()
                .map(|c| {
                    let lo = start + c * chunk;
                    let hi = (lo + chunk).min(start + len);
                    (lo..hi).map(&f).collect()
                })
                .collect()
        });
        parts.into_iter().flatten().collect()
    }

    pub fn for_each_worker<F>(&self, len: usize, f: F)
    where
        F: Fn(usize, Range<usize>) + Sync,
    {
        let Some((chunk, pool)) = self.chunk_len(len) else {
            f(0, 0..len);
            return;
        };
        let chunks = len.div_ceil(chunk);
        pool.install(|| {
            (0..chunks).into_par_iter().for_each(|c| {
                let lo = c * chunk;
                let hi = (lo + chunk).min(len);
                f(c, lo..hi);
            });
        });
    }
}

#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    pub fn fetch_add(&self, delta: f64) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn take(&self) -> f64 {
        f64::from_bits(self.0.swap(0.0f64.to_bits(), Ordering::AcqRel))
    }
}
