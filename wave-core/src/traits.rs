//! # Traits - Abstractions over Compute Backends
//!
//! A backend advances lattice state and adapts anchors. The CPU backend
//! spreads batches across threads; the scalar backend is the sequential
//! reference. Both must produce identical numbers for identical inputs.

use serde::{Deserialize, Serialize};

use crate::error::{WaveError, WaveResult};
use crate::state::{LatticeShape, StateBuffer, Stencil};

/// Per-call evolution parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolveParams {
    /// Number of discrete steps to run (0 = no-op)
    pub steps: u32,

    /// Magnitude of the injected noise (>= 0)
    pub noise: f32,

    /// Mixed into the noise seed so successive calls draw fresh noise
    pub epoch: u64,
}

impl EvolveParams {
    pub fn new(steps: u32, noise: f32) -> Self {
        Self {
            steps,
            noise,
            epoch: 0,
        }
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn validate(&self) -> WaveResult<()> {
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(WaveError::invalid(format!(
                "noise must be finite and >= 0, got {}",
                self.noise
            )));
        }
        Ok(())
    }
}

/// Scalar coefficients for one anchor update
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCoefficients {
    /// Step size of the gradient-style correction (>= 0)
    pub learning_rate: f32,

    /// Steady-state regularization weight in [0, 1]
    pub decay: f32,

    /// Stress-driven decay weight in [0, 1]
    pub panic: f32,

    /// Confidence signal enabling reinforcement (0 = off)
    pub truth: f32,
}

impl MemoryCoefficients {
    pub fn new(learning_rate: f32, decay: f32, panic: f32) -> Self {
        Self {
            learning_rate,
            decay,
            panic,
            truth: 0.0,
        }
    }

    pub fn with_truth(mut self, truth: f32) -> Self {
        self.truth = truth;
        self
    }

    pub fn validate(&self) -> WaveResult<()> {
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(WaveError::invalid(format!(
                "learning_rate must be finite and >= 0, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [("decay", self.decay), ("panic", self.panic)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WaveError::invalid(format!(
                    "{name} coefficient must be in [0, 1], got {value}"
                )));
            }
        }
        if !self.truth.is_finite() {
            return Err(WaveError::invalid("truth signal must be finite"));
        }
        Ok(())
    }
}

/// Compute backend trait
///
/// Implementations hold no lattice state between calls; everything a call
/// needs arrives through its arguments.
pub trait EvolutionBackend: Send + Sync {
    /// Advance `state` by `params.steps` steps, using `scratch` as the
    /// double buffer. Shapes are validated before any value is written.
    fn evolve(
        &mut self,
        state: &mut StateBuffer,
        scratch: &mut StateBuffer,
        stencil: &Stencil,
        anchors: &[f32],
        params: EvolveParams,
    ) -> WaveResult<()>;

    /// Revise the anchors in place from an adjustment vector
    fn update_memory(
        &mut self,
        anchors: &mut [f32],
        adjustment: &[f32],
        coefficients: MemoryCoefficients,
    ) -> WaveResult<()>;

    /// Get statistics accumulated so far
    fn stats(&self) -> BackendStats;

    /// Name of this backend (for logging)
    fn name(&self) -> &'static str;
}

/// Statistics from a compute backend
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendStats {
    /// Evolve calls that ran at least one step
    pub evolve_calls: u64,

    /// Total steps run (per batch)
    pub steps_run: u64,

    /// Total (batch, position) updates
    pub cells_updated: u64,

    /// Anchor updates applied
    pub memory_updates: u64,

    /// Time spent in the last evolve call (microseconds)
    pub compute_time_us: u64,
}

/// Shared shape checks for backend implementations
pub fn check_evolve_buffers(
    state: &StateBuffer,
    scratch: &StateBuffer,
    anchors: &[f32],
) -> WaveResult<LatticeShape> {
    let shape = state.shape();
    if scratch.shape() != shape {
        return Err(WaveError::shape(
            "scratch",
            shape.state_len(),
            scratch.shape().state_len(),
        ));
    }
    if anchors.len() != shape.width {
        return Err(WaveError::shape("anchors", shape.width, anchors.len()));
    }
    Ok(shape)
}
