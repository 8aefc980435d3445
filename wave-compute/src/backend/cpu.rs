//! # CPU Backend
//!
//! Parallel evolution using Rayon.
//!
//! Batches are independent, so each one is handed to a worker as a
//! disjoint `3 * D` chunk of the state and scratch buffers. Within a
//! batch the step loop is sequential and double-buffered, which keeps
//! the step barrier without any locking.

use std::time::Instant;

use rayon::prelude::*;

use wave_core::config::{KernelConfig, MemoryConfig, WaveConfig};
use wave_core::error::{WaveError, WaveResult};
use wave_core::state::{StateBuffer, Stencil};
use wave_core::traits::{check_evolve_buffers, BackendStats, EvolutionBackend, EvolveParams, MemoryCoefficients};

use super::{check_memory_args, record_evolve};
use crate::kernel;
use crate::memory;

/// Anchor vectors shorter than this are updated on the calling thread
const PARALLEL_ANCHOR_CHUNK: usize = 4096;

/// CPU compute backend using Rayon
pub struct CpuBackend {
    /// Kernel coefficients
    kernel: KernelConfig,

    /// Updater coefficients
    memory: MemoryConfig,

    /// Dedicated pool when a thread count is configured
    pool: Option<rayon::ThreadPool>,

    /// Below this many batches, run on the calling thread
    parallel_min_batches: usize,

    /// Statistics
    stats: BackendStats,
}

impl CpuBackend {
    /// Create a new CPU backend
    pub fn new(config: &WaveConfig) -> WaveResult<Self> {
        config.validate()?;

        let pool = match config.compute.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("wave-worker-{i}"))
                    .build()
                    .map_err(|e| WaveError::compute(format!("thread pool: {e}")))?,
            ),
            None => None,
        };

        tracing::info!(
            "CPU backend ready ({} threads)",
            pool.as_ref()
                .map(|p| p.current_num_threads())
                .unwrap_or_else(rayon::current_num_threads)
        );

        Ok(Self {
            kernel: config.kernel.clone(),
            memory: config.memory.clone(),
            pool,
            parallel_min_batches: config.compute.parallel_min_batches,
            stats: BackendStats::default(),
        })
    }

    fn run<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl EvolutionBackend for CpuBackend {
    fn evolve(
        &mut self,
        state: &mut StateBuffer,
        scratch: &mut StateBuffer,
        stencil: &Stencil,
        anchors: &[f32],
        params: EvolveParams,
    ) -> WaveResult<()> {
        params.validate()?;
        let shape = check_evolve_buffers(state, scratch, anchors)?;
        if params.steps == 0 {
            return Ok(());
        }

        let start = Instant::now();
        let cfg = &self.kernel;
        let state = state.as_mut_slice();
        let scratch = scratch.as_mut_slice();

        if shape.batches < self.parallel_min_batches {
            kernel::evolve_sequential(state, scratch, shape.width, stencil, anchors, params, cfg);
        } else {
            self.run(|| kernel::evolve_parallel(state, scratch, shape.width, stencil, anchors, params, cfg));
        }

        record_evolve(&mut self.stats, shape, params, start);
        tracing::debug!(
            "evolved {}x{} lattice by {} steps in {}us",
            shape.batches,
            shape.width,
            params.steps,
            self.stats.compute_time_us
        );

        Ok(())
    }

    fn update_memory(
        &mut self,
        anchors: &mut [f32],
        adjustment: &[f32],
        coefficients: MemoryCoefficients,
    ) -> WaveResult<()> {
        check_memory_args(anchors, adjustment, &coefficients)?;

        let cfg = &self.memory;
        if anchors.len() < PARALLEL_ANCHOR_CHUNK {
            memory::update_anchors(anchors, adjustment, &coefficients, cfg);
        } else {
            self.run(|| {
                anchors
                    .par_chunks_mut(PARALLEL_ANCHOR_CHUNK)
                    .zip(adjustment.par_chunks(PARALLEL_ANCHOR_CHUNK))
                    .for_each(|(w, g)| memory::update_anchors(w, g, &coefficients, cfg));
            });
        }

        self.stats.memory_updates += 1;
        tracing::debug!(
            "updated {} anchors (lr={}, decay={}, panic={})",
            anchors.len(),
            coefficients.learning_rate,
            coefficients.decay,
            coefficients.panic
        );

        Ok(())
    }

    fn stats(&self) -> BackendStats {
        self.stats.clone()
    }

    fn name(&self) -> &'static str {
        "CPU (Rayon)"
    }
}
