//! End-to-end stability properties of the lattice, exercised through the
//! raw entry points and through a session.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wave_compute::{evolve, update_memory, Lattice};
use wave_core::{Channel, LatticeShape, MemoryCoefficients, StateBuffer, Stencil, WaveConfig, CHANNELS};

const OVERLOAD_STENCIL: [f32; 3] = [5.0, -10.0, 5.0];

fn random_anchors(width: usize, scale: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width).map(|_| rng.gen_range(-1.0f32..1.0) * scale).collect()
}

fn channel_max(state: &[f32], batches: usize, width: usize, channel: Channel) -> f32 {
    let shape = LatticeShape::new(batches, width).unwrap();
    let buffer = StateBuffer::from_vec(shape, state.to_vec()).unwrap();
    buffer.summary(channel).max_abs
}

#[test]
fn clamp_holds_under_extreme_drive() {
    let (batches, width) = (4, 64);
    let anchors = random_anchors(width, 1000.0, 1);
    let mut state = vec![0.0f32; batches * CHANNELS * width];
    let mut scratch = vec![0.0f32; state.len()];

    for noise in [0.0, 1.0, 5.0] {
        for steps in [1, 7, 50] {
            evolve(&mut state, &mut scratch, &OVERLOAD_STENCIL, &anchors, batches, width, steps, noise);
            assert!(state.iter().all(|v| v.is_finite()));
            assert!(channel_max(&state, batches, width, Channel::Activity) <= 5.0 + 1e-5);
            assert!(channel_max(&state, batches, width, Channel::Memory) <= 5.0 + 1e-5);
        }
    }
}

#[test]
fn clamp_holds_from_out_of_range_start() {
    let (batches, width) = (2, 16);
    let anchors = random_anchors(width, 1000.0, 2);
    let mut state = vec![1e30f32; batches * CHANNELS * width];
    let mut scratch = vec![0.0f32; state.len()];

    evolve(&mut state, &mut scratch, &OVERLOAD_STENCIL, &anchors, batches, width, 1, 5.0);
    assert!(state.iter().all(|v| v.is_finite() && v.abs() <= 5.0 + 1e-5));
}

#[test]
fn ten_thousand_steps_stay_finite() {
    let shape = LatticeShape::new(4, 64).unwrap();
    let mut lattice = Lattice::new(shape, &WaveConfig::default()).unwrap();
    lattice.set_stencil(Stencil::from(OVERLOAD_STENCIL));
    lattice.set_anchors(&random_anchors(64, 1000.0, 3)).unwrap();

    for _ in 0..100 {
        lattice.evolve(100, 0.1).unwrap();
        assert!(lattice.summary().is_finite());
    }
    assert_eq!(lattice.stats().steps_run, 10_000);
    assert_eq!(lattice.epoch(), 100);
}

#[test]
fn silence_decays_to_rest() {
    let (batches, width) = (3, 32);
    let shape = LatticeShape::new(batches, width).unwrap();
    let mut state = StateBuffer::zeros(shape);
    state.fill_channel(Channel::Activity, 3.0);
    let mut state = state.into_vec();
    let mut scratch = vec![0.0f32; state.len()];

    evolve(&mut state, &mut scratch, &[0.2, 0.6, 0.2], &vec![0.0; width], batches, width, 500, 0.0);

    let state = StateBuffer::from_vec(shape, state).unwrap();
    assert!(state.summary(Channel::Activity).mean_abs < 1.0);
    assert!(state.summary(Channel::Memory).mean_abs < 1.0);
}

#[test]
fn silence_decays_with_every_channel_excited() {
    let shape = LatticeShape::new(2, 24).unwrap();
    let mut lattice = Lattice::new(shape, &WaveConfig::default()).unwrap();
    lattice.state_mut().fill(3.0);
    lattice.evolve(500, 0.0).unwrap();
    assert!(lattice.summary().activity.mean_abs < 1.0);
}

#[test]
fn batches_never_leak() {
    let shape = LatticeShape::new(5, 32).unwrap();
    for config in [WaveConfig::default(), WaveConfig::scalar_reference()] {
        let mut lattice = Lattice::new(shape, &config).unwrap();
        lattice.set_stencil(Stencil::from(OVERLOAD_STENCIL));
        lattice.excite_batch(0, 2.0).unwrap();
        lattice.evolve(20, 0.0).unwrap();

        assert!(lattice.state().batch_abs_sum(0) > 0.0);
        for b in 1..shape.batches {
            assert_eq!(lattice.state().batch_abs_sum(b), 0.0, "batch {b} picked up activity");
        }
    }
}

#[test]
fn batch_results_do_not_depend_on_neighbors() {
    // Batch 1 evolves the same alone or next to a wildly excited batch 0
    let width = 16;
    let mut rng = StdRng::seed_from_u64(4);
    let block: Vec<f32> = (0..CHANNELS * width).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let anchors = random_anchors(width, 3.0, 5);

    let mut alone = block.clone();
    let mut scratch = vec![0.0f32; alone.len()];
    evolve(&mut alone, &mut scratch, &[0.3, 0.4, 0.3], &anchors, 1, width, 30, 0.0);

    let mut paired = vec![4.0f32; CHANNELS * width];
    paired.extend_from_slice(&block);
    let mut scratch = vec![0.0f32; paired.len()];
    evolve(&mut paired, &mut scratch, &[0.3, 0.4, 0.3], &anchors, 2, width, 30, 0.0);

    assert_eq!(&paired[CHANNELS * width..], &alone[..]);
}

#[test]
fn zero_noise_is_deterministic() {
    let (batches, width) = (3, 20);
    let anchors = random_anchors(width, 2.0, 6);
    let mut rng = StdRng::seed_from_u64(7);
    let start: Vec<f32> = (0..batches * CHANNELS * width).map(|_| rng.gen_range(-2.0f32..2.0)).collect();

    let run = || {
        let mut state = start.clone();
        let mut scratch = vec![0.0f32; state.len()];
        evolve(&mut state, &mut scratch, &[0.1, 0.8, 0.1], &anchors, batches, width, 40, 0.0);
        state
    };
    assert_eq!(run(), run());
}

#[test]
fn panic_shrinks_anchors() {
    let width = 64;
    let mut anchors = vec![1.0f32; width];
    update_memory(&mut anchors, &vec![0.0; width], width, 0.01, 0.0, 1.0);
    let mean = anchors.iter().sum::<f32>() / width as f32;
    assert!(mean < 1.0);
}

#[test]
fn zero_coefficients_give_plain_gradient_step() {
    let width = 32;
    let start = random_anchors(width, 2.0, 8);
    let adjustment = random_anchors(width, 0.9, 9);
    let mut anchors = start.clone();
    update_memory(&mut anchors, &adjustment, width, 0.05, 0.0, 0.0);

    for i in 0..width {
        let expected = start[i] - 0.05 * adjustment[i];
        assert!((anchors[i] - expected).abs() < 1e-6);
    }
}

#[test]
fn updater_stays_bounded_on_hostile_input() {
    let width = 8;
    let mut anchors = vec![1e30f32, -1e30, 0.0, 3.0, -3.0, 1.0, f32::MAX, -f32::MAX];
    let adjustment = vec![f32::MAX, -f32::MAX, 1e20, 0.0, 1.0, -1.0, f32::NAN, 0.5];
    for _ in 0..10 {
        update_memory(&mut anchors, &adjustment, width, 1e6, 1.0, 1.0);
        assert!(anchors.iter().all(|w| w.is_finite()));
    }
}

#[test]
fn zero_steps_leave_state_untouched() {
    let (batches, width) = (2, 10);
    let mut rng = StdRng::seed_from_u64(10);
    let mut state: Vec<f32> = (0..batches * CHANNELS * width).map(|_| rng.gen_range(-9.0f32..9.0)).collect();
    let before = state.clone();
    let mut scratch = vec![0.0f32; state.len()];

    evolve(&mut state, &mut scratch, &OVERLOAD_STENCIL, &random_anchors(width, 1000.0, 11), batches, width, 0, 5.0);
    assert_eq!(state, before);

    let shape = LatticeShape::new(batches, width).unwrap();
    let mut lattice = Lattice::new(shape, &WaveConfig::default()).unwrap();
    lattice.state_mut().as_mut_slice().copy_from_slice(&before);
    lattice.evolve(0, 5.0).unwrap();
    assert_eq!(lattice.state().as_slice(), &before[..]);
}

#[test]
fn anchor_learning_loop_stays_bounded() {
    // Alternate evolution and anchor updates the way a driver would
    let shape = LatticeShape::new(4, 32).unwrap();
    let mut lattice = Lattice::new(shape, &WaveConfig::default()).unwrap();
    lattice.set_anchors(&random_anchors(32, 4.0, 12)).unwrap();

    for round in 0..50 {
        lattice.evolve(10, 0.2).unwrap();
        let adjustment: Vec<f32> = (0..32)
            .map(|i| lattice.state().get(0, Channel::Activity, i) - lattice.anchors()[i])
            .collect();
        let panic = if round % 10 == 9 { 1.0 } else { 0.0 };
        lattice
            .update_anchors(&adjustment, MemoryCoefficients::new(0.05, 0.1, panic))
            .unwrap();
    }

    assert!(lattice.summary().is_finite());
    assert!(lattice.anchors().iter().all(|w| w.is_finite() && w.abs() <= 5.0));
}
