//! # Evolution Kernel
//!
//! Advances every `(batch, position)` of the lattice by a number of steps.
//!
//! Per step and per position, reading only the previous step's values:
//!
//! 1. stencil coupling over `A[i-1], A[i], A[i+1]` on the periodic ring
//! 2. anchor pull `anchor_pull * (anchor[i] - A[i])`
//! 3. fatigue gating of the combined excitation (Memory feedback included)
//! 4. noise, fatigue-proportional inhibition, softsign-bounded integration
//! 5. Memory smoothing toward Activity
//! 6. Fatigue accumulation and recovery
//! 7. damping, so silence relaxes to rest
//! 8. clamp of Activity and Memory, every step
//!
//! Results go to the scratch block, which is the source of the next step.
//! A batch never reads another batch's block, so batches run on separate
//! threads with no synchronization inside a step.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use wave_core::{EvolveParams, KernelConfig, Stencil, CHANNELS};

/// Bounded drive: `x / (1 + |x|)`, saturating to ±1 for infinite input
#[inline(always)]
pub fn softsign(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else if x.is_infinite() {
        x.signum()
    } else {
        x / (1.0 + x.abs())
    }
}

/// Clamp to `[-limit, limit]`, NaN becomes 0
#[inline(always)]
pub fn clamp_amplitude(x: f32, limit: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.max(-limit).min(limit)
    }
}

/// Clamp to `[0, 1]`, NaN becomes 0
#[inline(always)]
pub fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.max(0.0).min(1.0)
    }
}

/// Fraction of excitation let through at fatigue `f`
///
/// Fully closed at or above `threshold`, `1 - f` below it.
#[inline(always)]
pub fn fatigue_gate(f: f32, threshold: f32) -> f32 {
    if f >= threshold {
        0.0
    } else {
        (1.0 - f).max(0.0).min(1.0)
    }
}

/// One cell's channels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub activity: f32,
    pub memory: f32,
    pub fatigue: f32,
}

/// Advance a single cell by one step
///
/// `coupling` is the stencil response over the previous step's Activity.
#[inline(always)]
pub fn advance_cell(cfg: &KernelConfig, cell: Cell, coupling: f32, anchor: f32, jitter: f32) -> Cell {
    let Cell {
        activity: a,
        memory: m,
        fatigue: f,
    } = cell;

    let pull = cfg.anchor_pull * (anchor - a);
    let excitation = (coupling + pull + cfg.memory_feedback * m) * fatigue_gate(f, cfg.gate_threshold);
    let inhibition = cfg.inhibition_gain * f * a;
    let drive = excitation - inhibition + jitter;

    Cell {
        activity: clamp_amplitude((a + softsign(drive) * cfg.dt) * cfg.damping, cfg.max_amplitude),
        memory: clamp_amplitude(m + (a - m) * cfg.memory_rate * cfg.dt, cfg.max_amplitude),
        fatigue: clamp_unit(f + (cfg.fatigue_gain * a.abs() - cfg.fatigue_recovery * f) * cfg.dt),
    }
}

/// Zero-mean uniform noise for one batch
struct NoiseSource {
    rng: SmallRng,
    level: f32,
}

impl NoiseSource {
    fn new(seed: u64, level: f32) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            level,
        }
    }

    #[inline(always)]
    fn sample(&mut self) -> f32 {
        self.rng.gen_range(-0.5f32..0.5) * self.level
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Noise seed of one batch for one call
///
/// Depends only on its inputs, so results do not depend on which thread
/// runs which batch.
pub fn batch_seed(base: u64, epoch: u64, batch: usize) -> u64 {
    splitmix64(base ^ splitmix64(epoch ^ splitmix64(batch as u64)))
}

/// Compute one step of one batch from `src` into `dst`
fn step_block(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    stencil: &Stencil,
    anchors: &[f32],
    noise: &mut Option<NoiseSource>,
    cfg: &KernelConfig,
) {
    let (act, rest) = src.split_at(width);
    let (mem, fat) = rest.split_at(width);
    let (next_act, rest) = dst.split_at_mut(width);
    let (next_mem, next_fat) = rest.split_at_mut(width);

    for i in 0..width {
        let left = act[if i == 0 { width - 1 } else { i - 1 }];
        let right = act[if i + 1 == width { 0 } else { i + 1 }];
        let jitter = match noise.as_mut() {
            Some(source) => source.sample(),
            None => 0.0,
        };

        let cell = Cell {
            activity: act[i],
            memory: mem[i],
            fatigue: fat[i],
        };
        let next = advance_cell(cfg, cell, stencil.apply(left, act[i], right), anchors[i], jitter);

        next_act[i] = next.activity;
        next_mem[i] = next.memory;
        next_fat[i] = next.fatigue;
    }
}

/// Run `steps` steps of one batch block (`3 * width` values)
///
/// `state` holds the result on return; `scratch` is left undefined.
#[allow(clippy::too_many_arguments)]
pub fn evolve_batch(
    state: &mut [f32],
    scratch: &mut [f32],
    width: usize,
    stencil: &Stencil,
    anchors: &[f32],
    steps: u32,
    noise: f32,
    seed: u64,
    cfg: &KernelConfig,
) {
    debug_assert_eq!(state.len(), CHANNELS * width);
    debug_assert_eq!(scratch.len(), state.len());
    debug_assert_eq!(anchors.len(), width);

    if steps == 0 {
        return;
    }

    let mut source = (noise > 0.0).then(|| NoiseSource::new(seed, noise));

    for step in 0..steps {
        if step % 2 == 0 {
            step_block(state, scratch, width, stencil, anchors, &mut source, cfg);
        } else {
            step_block(scratch, state, width, stencil, anchors, &mut source, cfg);
        }
    }

    // Odd step counts leave the newest snapshot in scratch
    if steps % 2 == 1 {
        state.copy_from_slice(scratch);
    }
}

/// Evolve every batch on the calling thread
pub fn evolve_sequential(
    state: &mut [f32],
    scratch: &mut [f32],
    width: usize,
    stencil: &Stencil,
    anchors: &[f32],
    params: EvolveParams,
    cfg: &KernelConfig,
) {
    if params.steps == 0 {
        return;
    }
    let stride = CHANNELS * width;
    for (b, (block, spare)) in state
        .chunks_mut(stride)
        .zip(scratch.chunks_mut(stride))
        .enumerate()
    {
        let seed = batch_seed(cfg.noise_seed, params.epoch, b);
        evolve_batch(block, spare, width, stencil, anchors, params.steps, params.noise, seed, cfg);
    }
}

/// Evolve batches in parallel on the current rayon pool
pub fn evolve_parallel(
    state: &mut [f32],
    scratch: &mut [f32],
    width: usize,
    stencil: &Stencil,
    anchors: &[f32],
    params: EvolveParams,
    cfg: &KernelConfig,
) {
    if params.steps == 0 {
        return;
    }
    let stride = CHANNELS * width;
    state
        .par_chunks_mut(stride)
        .zip(scratch.par_chunks_mut(stride))
        .enumerate()
        .for_each(|(b, (block, spare))| {
            let seed = batch_seed(cfg.noise_seed, params.epoch, b);
            evolve_batch(block, spare, width, stencil, anchors, params.steps, params.noise, seed, cfg);
        });
}
