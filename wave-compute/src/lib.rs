//! # Wave Compute
//!
//! Evolution kernel, dynamic memory updater and compute backends for the
//! wave lattice.
//!
//! Two layers are provided:
//! - **Raw entry points** [`evolve`] and [`update_memory`] over caller-owned
//!   flat `f32` buffers. They allocate nothing and treat malformed sizes as
//!   programmer errors (panic).
//! - **Typed backends** implementing [`EvolutionBackend`]:
//!   - **CPU**: Uses Rayon to spread batches across threads
//!   - **Scalar**: Single-threaded reference
//!
//! [`Lattice`] bundles state, scratch, anchors and a backend into one
//! session for callers that do not want to manage buffers themselves.
//!
//! ## Backend Selection
//!
//! Set `WAVE_BACKEND` environment variable (read by `WaveConfig::from_env`):
//! - `cpu` - Rayon backend
//! - `scalar` - Sequential reference backend
//! - `auto` (default) - CPU backend

pub mod backend;
pub mod kernel;
pub mod memory;
pub mod session;

pub use backend::{CpuBackend, ScalarBackend};
pub use session::{Lattice, LatticeSnapshot};

use wave_core::config::{ComputeBackendType, KernelConfig, MemoryConfig, WaveConfig};
use wave_core::error::WaveResult;
use wave_core::traits::{EvolutionBackend, EvolveParams, MemoryCoefficients};
use wave_core::{Stencil, CHANNELS, STENCIL_TAPS};

/// Create the appropriate compute backend based on configuration
pub fn create_backend(config: &WaveConfig) -> WaveResult<Box<dyn EvolutionBackend>> {
    match config.compute.backend {
        ComputeBackendType::Auto | ComputeBackendType::Cpu => {
            tracing::info!("Using CPU backend (Rayon)");
            Ok(Box::new(CpuBackend::new(config)?))
        }
        ComputeBackendType::Scalar => {
            tracing::info!("Using scalar reference backend");
            Ok(Box::new(ScalarBackend::new(config)?))
        }
    }
}

/// Advance a batched lattice by `steps` steps in place
///
/// `state` and `scratch` hold `batches * 3 * width` values laid out
/// batch-major (`[batch][Activity|Memory|Fatigue][position]`), `stencil`
/// holds `(left, self, right)` and `anchors` holds `width` values. Scratch
/// content is undefined on return. Uses the default kernel coefficients
/// and noise seed, so equal inputs give equal outputs.
///
/// # Panics
///
/// Panics if a dimension is zero, a buffer has the wrong length, or
/// `noise` is negative or not finite.
#[allow(clippy::too_many_arguments)]
pub fn evolve(
    state: &mut [f32],
    scratch: &mut [f32],
    stencil: &[f32],
    anchors: &[f32],
    batches: usize,
    width: usize,
    steps: u32,
    noise: f32,
) {
    assert!(batches >= 1 && width >= 1, "lattice dimensions must be >= 1 (B={batches}, D={width})");
    let len = batches
        .checked_mul(CHANNELS)
        .and_then(|n| n.checked_mul(width))
        .unwrap_or_else(|| panic!("lattice size overflows usize (B={batches}, D={width})"));
    assert_eq!(state.len(), len, "state must hold B*3*D values");
    assert_eq!(scratch.len(), len, "scratch must hold B*3*D values");
    assert_eq!(stencil.len(), STENCIL_TAPS, "stencil must hold exactly 3 weights");
    assert_eq!(anchors.len(), width, "anchors must hold D values");
    assert!(noise.is_finite() && noise >= 0.0, "noise must be finite and >= 0, got {noise}");

    if steps == 0 {
        return;
    }

    let stencil = Stencil::from_slice(stencil).unwrap_or_else(|e| panic!("evolve: {e}"));
    kernel::evolve_parallel(
        state,
        scratch,
        width,
        &stencil,
        anchors,
        EvolveParams::new(steps, noise),
        &KernelConfig::default(),
    );
}

/// Revise `anchors` in place from `adjustment`
///
/// Both slices hold `width` values. `decay` and `panic` weigh the steady
/// and stress-driven pulls toward zero; with both at zero this is a plain
/// gradient step of size `learning_rate`.
///
/// # Panics
///
/// Panics on length mismatch, a zero width, a negative or non-finite
/// `learning_rate`, or `decay`/`panic` outside `[0, 1]`.
pub fn update_memory(
    anchors: &mut [f32],
    adjustment: &[f32],
    width: usize,
    learning_rate: f32,
    decay: f32,
    panic: f32,
) {
    assert!(width >= 1, "anchor width must be >= 1");
    assert_eq!(anchors.len(), width, "anchors must hold D values");
    assert_eq!(adjustment.len(), width, "adjustment must hold D values");

    let coefficients = MemoryCoefficients::new(learning_rate, decay, panic);
    if let Err(e) = coefficients.validate() {
        panic!("update_memory: {e}");
    }

    memory::update_anchors(anchors, adjustment, &coefficients, &MemoryConfig::default());
}
