//! # Compute Backends
//!
//! Implementations of the EvolutionBackend trait. Both run the same
//! per-batch kernel and produce bit-identical results.

mod cpu;
mod scalar;

pub use cpu::CpuBackend;
pub use scalar::ScalarBackend;

use std::time::Instant;

use wave_core::{BackendStats, EvolveParams, LatticeShape, MemoryCoefficients, WaveError, WaveResult};

/// Validate an anchor update before touching the anchors
pub(crate) fn check_memory_args(
    anchors: &[f32],
    adjustment: &[f32],
    coefficients: &MemoryCoefficients,
) -> WaveResult<()> {
    if anchors.is_empty() {
        return Err(WaveError::invalid("anchor vector must not be empty"));
    }
    if adjustment.len() != anchors.len() {
        return Err(WaveError::shape("adjustment", anchors.len(), adjustment.len()));
    }
    coefficients.validate()
}

/// Fold one finished evolve call into the stats
pub(crate) fn record_evolve(stats: &mut BackendStats, shape: LatticeShape, params: EvolveParams, start: Instant) {
    stats.evolve_calls += 1;
    stats.steps_run += params.steps as u64;
    stats.cells_updated += shape.cells() as u64 * params.steps as u64;
    stats.compute_time_us = start.elapsed().as_micros() as u64;
}
