//! Wave Lattice Stress Runner
//!
//! Drives the lattice through the scenarios it must survive and reports
//! PASS/FAIL for each one. Exits non-zero if any scenario fails.
//!
//! Usage: `wave-stress [width] [batches]`

use std::process;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::Level;

use wave_compute::{update_memory, Lattice};
use wave_core::{Channel, LatticeShape, MemoryCoefficients, Stencil, WaveConfig, WaveResult};

const DEFAULT_WIDTH: usize = 256;
const DEFAULT_BATCHES: usize = 32;

/// Outcome of one scenario
struct Verdict {
    name: &'static str,
    passed: bool,
    detail: String,
}

fn parse_arg(index: usize, default: usize) -> usize {
    match std::env::args().nth(index) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(v) if v > 0 => v,
            _ => {
                tracing::warn!("Ignoring invalid argument '{}', using {}", raw, default);
                default
            }
        },
        None => default,
    }
}

fn huge_anchors(width: usize, seed: u64) -> Vec<f32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..width).map(|_| rng.gen_range(-1.0f32..1.0) * 1000.0).collect()
}

/// Overload: saturated start, explosive stencil, anchors near 1000, heavy noise
fn overload(shape: LatticeShape, config: &WaveConfig) -> WaveResult<Verdict> {
    let mut lattice = Lattice::new(shape, config)?;
    lattice.set_stencil(Stencil::new(5.0, -10.0, 5.0));
    lattice.set_anchors(&huge_anchors(shape.width, 7))?;
    lattice.state_mut().fill(config.kernel.max_amplitude);

    let mut worst = 0.0f32;
    let mut finite = true;
    for noise in [1.0, 5.0] {
        for steps in [1, 99] {
            lattice.evolve(steps, noise)?;
            let summary = lattice.summary();
            worst = worst.max(summary.activity.max_abs).max(summary.memory.max_abs);
            finite &= summary.is_finite();
        }
    }

    Ok(Verdict {
        name: "overload clamp",
        passed: finite && worst <= config.kernel.max_amplitude + 1e-4,
        detail: format!("max |A|,|M| = {worst:.4}"),
    })
}

/// 10,000 steps in chunks under sustained large anchors
fn long_run(shape: LatticeShape, config: &WaveConfig) -> WaveResult<Verdict> {
    let mut lattice = Lattice::new(shape, config)?;
    lattice.set_anchors(&huge_anchors(shape.width, 11))?;

    let mut finite = true;
    for _ in 0..100 {
        lattice.evolve(100, 0.1)?;
        finite &= lattice.summary().is_finite();
    }

    Ok(Verdict {
        name: "long run",
        passed: finite,
        detail: format!("{} steps, epoch {}", lattice.stats().steps_run, lattice.epoch()),
    })
}

/// Silence relaxes to rest
fn zen_decay(shape: LatticeShape, config: &WaveConfig) -> WaveResult<Verdict> {
    let mut lattice = Lattice::new(shape, config)?;
    lattice.state_mut().fill_channel(Channel::Activity, 3.0);
    lattice.evolve(500, 0.0)?;

    let mean = lattice.summary().activity.mean_abs;
    Ok(Verdict {
        name: "zen decay",
        passed: mean < 1.0,
        detail: format!("mean |A| after 500 steps = {mean:.6}"),
    })
}

/// Excited batch 0 never leaks into its neighbors
fn isolation(shape: LatticeShape, config: &WaveConfig) -> WaveResult<Verdict> {
    let mut lattice = Lattice::new(shape, config)?;
    lattice.excite_batch(0, 2.0)?;
    lattice.evolve(20, 0.0)?;

    let leaked: f64 = (1..shape.batches).map(|b| lattice.state().batch_abs_sum(b)).sum();
    Ok(Verdict {
        name: "batch isolation",
        passed: leaked == 0.0,
        detail: format!("leaked mass = {leaked}"),
    })
}

/// Panic shrinks the anchors
fn panic_decay(shape: LatticeShape) -> Verdict {
    let mut anchors = vec![1.0f32; shape.width];
    let adjustment = vec![0.0f32; shape.width];
    let coefficients = MemoryCoefficients::new(0.01, 0.0, 1.0);
    update_memory(
        &mut anchors,
        &adjustment,
        shape.width,
        coefficients.learning_rate,
        coefficients.decay,
        coefficients.panic,
    );

    let mean = anchors.iter().sum::<f32>() / shape.width as f32;
    Verdict {
        name: "panic decay",
        passed: mean < 1.0,
        detail: format!("mean anchor 1.0 -> {mean:.4}"),
    }
}

fn run(shape: LatticeShape, config: &WaveConfig) -> WaveResult<Vec<Verdict>> {
    Ok(vec![
        overload(shape, config)?,
        long_run(shape, config)?,
        zen_decay(shape, config)?,
        isolation(shape, config)?,
        panic_decay(shape),
    ])
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = WaveConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        process::exit(2);
    }

    let width = parse_arg(1, DEFAULT_WIDTH);
    let batches = parse_arg(2, DEFAULT_BATCHES).max(2);
    let shape = match LatticeShape::new(batches, width) {
        Ok(shape) => shape,
        Err(e) => {
            tracing::error!("{}", e);
            process::exit(2);
        }
    };

    tracing::info!("Stress run on {} batches x {} positions", batches, width);

    let verdicts = match run(shape, &config) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Stress run aborted: {}", e);
            process::exit(2);
        }
    };

    let mut failed = 0;
    for v in &verdicts {
        let tag = if v.passed { "PASS" } else { "FAIL" };
        println!("[{tag}] {:<16} {}", v.name, v.detail);
        if !v.passed {
            failed += 1;
        }
    }

    if failed > 0 {
        println!("{failed}/{} scenarios failed", verdicts.len());
        process::exit(1);
    }
    println!("All {} scenarios passed", verdicts.len());
}
