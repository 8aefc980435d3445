//! # Dynamic Memory Updater
//!
//! Slowly adapts the shared anchor vector.
//!
//! Each anchor takes a clipped gradient-style step against its adjustment
//! and shrinks toward zero by a hybrid L1/L2 decay `strength * w * (0.5 + |w|)`.
//! The decay strength grows with the panic coefficient ("forget under
//! stress"); the decay coefficient adds a milder steady-state pull. With both
//! at zero the update is a plain clipped gradient step.
//!
//! The shrink factor is capped at 1, so decay alone never flips an anchor's
//! sign, and the result is clamped to `anchor_limit`.

use wave_core::{MemoryCoefficients, MemoryConfig};

/// Clip an adjustment value, NaN becomes 0
#[inline(always)]
fn clip_adjustment(g: f32, clip: f32) -> f32 {
    if g.is_nan() {
        0.0
    } else {
        g.max(-clip).min(clip)
    }
}

/// Decay strength for a coefficient pair
#[inline]
pub fn decay_strength(coefficients: &MemoryCoefficients, cfg: &MemoryConfig) -> f32 {
    cfg.base_decay * (coefficients.decay + cfg.panic_gain * coefficients.panic)
}

#[inline(always)]
fn update_anchor(
    w: f32,
    adjustment: f32,
    strength: f32,
    reinforcing: bool,
    coefficients: &MemoryCoefficients,
    cfg: &MemoryConfig,
) -> f32 {
    let g = clip_adjustment(adjustment, cfg.gradient_clip);
    let shrink = (strength * (0.5 + w.abs())).min(1.0);

    // Agreeing adjustments under a confident truth signal hold the anchor up
    let reinforcement = if reinforcing && g * w > 0.0 {
        cfg.reinforcement_gain * g.abs() * coefficients.truth * w.signum()
    } else {
        0.0
    };

    let next = w - coefficients.learning_rate * g - shrink * w + reinforcement;
    if next.is_nan() {
        0.0
    } else {
        next.max(-cfg.anchor_limit).min(cfg.anchor_limit)
    }
}

/// Update every anchor in place
///
/// `anchors` and `adjustment` must have the same length.
pub fn update_anchors(
    anchors: &mut [f32],
    adjustment: &[f32],
    coefficients: &MemoryCoefficients,
    cfg: &MemoryConfig,
) {
    debug_assert_eq!(anchors.len(), adjustment.len());

    let strength = decay_strength(coefficients, cfg);
    let reinforcing = coefficients.truth > cfg.reinforcement_threshold;

    for (w, &g) in anchors.iter_mut().zip(adjustment) {
        *w = update_anchor(*w, g, strength, reinforcing, coefficients, cfg);
    }
}
