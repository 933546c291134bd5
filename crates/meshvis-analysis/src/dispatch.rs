//! Partitioned per-face execution.
//!
//! Faces are split into `workers` contiguous ranges. Each range writes only
//! its own slice of the output, so workers never contend; the single join at
//! the end of [`Dispatcher::run`] is the only synchronization point.

use std::num::NonZeroUsize;
use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// How partitions are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One OS thread per partition, from a pool sized to the worker count.
    #[default]
    Threaded,
    /// Partitions run one after another on the calling thread.
    Inline,
}

/// Runs a per-face function over every face, partitioned across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    workers: NonZeroUsize,
    strategy: Strategy,
}

impl Dispatcher {
    /// Create a dispatcher; fails if `workers` is zero.
    pub fn new(workers: usize, strategy: Strategy) -> Result<Self> {
        let workers = NonZeroUsize::new(workers)
            .ok_or_else(|| AnalysisError::InvalidSettings("workers must be positive".into()))?;
        Ok(Self { workers, strategy })
    }

    /// Faces per partition for `count` faces (at least 1).
    fn chunk_len(&self, count: usize) -> usize {
        count.div_ceil(self.workers.get()).max(1)
    }

    /// The contiguous face ranges `run` hands to each worker.
    ///
    /// There are at most `workers` ranges; fewer when there are fewer faces
    /// than workers.
    pub fn partitions(&self, count: usize) -> Vec<Range<usize>> {
        let chunk = self.chunk_len(count);
        (0..count)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(count))
            .collect()
    }

    /// Evaluate `per_face` for every index in `0..count` and collect the
    /// results in index order.
    ///
    /// The output does not depend on the worker count or the strategy as
    /// long as `per_face` only depends on its index.
    pub fn run<T, F>(&self, count: usize, per_face: F) -> Result<Vec<T>>
    where
        T: Default + Clone + Send,
        F: Fn(usize) -> T + Sync,
    {
        let mut out = vec![T::default(); count];
        let partitions = self.partitions(count);
        let chunk = self.chunk_len(count);

        let mut jobs: Vec<(Range<usize>, &mut [T])> = Vec::with_capacity(partitions.len());
        let mut rest = out.as_mut_slice();
        for range in partitions {
            let (slots, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
            jobs.push((range, slots));
            rest = tail;
        }
        let fill = |(range, slots): (Range<usize>, &mut [T])| {
            for (slot, face) in slots.iter_mut().zip(range) {
                *slot = per_face(face);
            }
        };

        match self.strategy {
            Strategy::Threaded if jobs.len() > 1 => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.workers.get())
                    .thread_name(|i| format!("meshvis-worker-{i}"))
                    .build()?;
                log::debug!(
                    "dispatching {count} faces over {} threads ({chunk} per partition)",
                    self.workers
                );
                pool.install(|| jobs.into_par_iter().for_each(fill));
            }
            _ => {
                log::debug!("dispatching {count} faces inline ({chunk} per partition)");
                jobs.into_iter().for_each(fill);
            }
        }

        Ok(out)
    }
}
