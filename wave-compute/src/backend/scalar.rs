//! # Scalar Backend
//!
//! Single-threaded reference implementation. Slower than the CPU backend
//! on wide batches but trivially deterministic, which makes it the
//! baseline the parallel backend is checked against.

use std::time::Instant;

use wave_core::config::{KernelConfig, MemoryConfig, WaveConfig};
use wave_core::error::WaveResult;
use wave_core::state::{StateBuffer, Stencil};
use wave_core::traits::{check_evolve_buffers, BackendStats, EvolutionBackend, EvolveParams, MemoryCoefficients};

use super::{check_memory_args, record_evolve};
use crate::kernel;
use crate::memory;

pub struct ScalarBackend {
    kernel: KernelConfig,
    memory: MemoryConfig,
    stats: BackendStats,
}

impl ScalarBackend {
    pub fn new(config: &WaveConfig) -> WaveResult<Self> {
        config.validate()?;
        tracing::info!("Scalar reference backend ready");
        Ok(Self {
            kernel: config.kernel.clone(),
            memory: config.memory.clone(),
            stats: BackendStats::default(),
        })
    }
}

impl EvolutionBackend for ScalarBackend {
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
        kernel::evolve_sequential(
            state.as_mut_slice(),
            scratch.as_mut_slice(),
            shape.width,
            stencil,
            anchors,
            params,
            &self.kernel,
        );
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
        memory::update_anchors(anchors, adjustment, &coefficients, &self.memory);
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
        "Scalar"
    }
}
