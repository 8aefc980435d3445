//! # Configuration - The Lattice's Physical Constants
//!
//! Every coefficient the kernel and the memory updater use lives here,
//! so experiments can tune the dynamics without touching the kernel.
//! The defaults are chosen so that the stability properties hold:
//! bounded amplitude, decay to rest in silence, no NaN under any finite input.

use serde::{Deserialize, Serialize};

use crate::error::{WaveError, WaveResult};
use crate::MAX_AMPLITUDE;

/// Master configuration for the wave lattice
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Evolution kernel coefficients
    pub kernel: KernelConfig,

    /// Dynamic memory updater coefficients
    pub memory: MemoryConfig,

    /// Compute backend preference
    pub compute: ComputeConfig,
}

/// Evolution kernel (per-step physics)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Integration step size
    pub dt: f32,

    /// Inertial damping applied to Activity every step (must be < 1)
    pub damping: f32,

    /// Strength of the pull from Activity toward the anchor
    pub anchor_pull: f32,

    /// How much the Memory trace feeds back into the excitation
    pub memory_feedback: f32,

    /// Exponential smoothing rate of Memory toward Activity
    pub memory_rate: f32,

    /// Fatigue-proportional inhibition of Activity
    pub inhibition_gain: f32,

    /// Fatigue accumulated per unit of |Activity|
    pub fatigue_gain: f32,

    /// Fatigue recovery rate in silence
    pub fatigue_recovery: f32,

    /// Fatigue level at which excitation is fully blocked
    pub gate_threshold: f32,

    /// Hard clamp bound for Activity and Memory
    pub max_amplitude: f32,

    /// Base seed for the per-batch noise generators
    pub noise_seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            dt: 0.05,
            damping: 0.98,
            anchor_pull: 0.1,
            memory_feedback: 0.6,
            memory_rate: 0.3,
            inhibition_gain: 2.5,
            fatigue_gain: 0.4,
            fatigue_recovery: 0.02,
            gate_threshold: 0.85,
            max_amplitude: MAX_AMPLITUDE,
            noise_seed: 0x5EED_0F_1A77,
        }
    }
}

/// Dynamic memory updater (anchor adaptation)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Decay strength at `decay_coeff = 1`
    pub base_decay: f32,

    /// Multiplier on `base_decay` contributed by `panic_coeff = 1`
    pub panic_gain: f32,

    /// Adjustment values are clipped to `[-gradient_clip, gradient_clip]`
    pub gradient_clip: f32,

    /// Anchors are clamped to `[-anchor_limit, anchor_limit]`
    pub anchor_limit: f32,

    /// Truth signal above which agreeing adjustments reinforce the anchor
    pub reinforcement_threshold: f32,

    /// Reinforcement step per unit of |adjustment| * truth
    pub reinforcement_gain: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_decay: 0.001,
            panic_gain: 50.0,
            gradient_clip: 1.0,
            anchor_limit: MAX_AMPLITUDE,
            reinforcement_threshold: 0.15,
            reinforcement_gain: 0.05,
        }
    }
}

/// Compute backend configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Preferred backend
    pub backend: ComputeBackendType,

    /// Worker threads for the CPU backend (None = rayon global pool)
    pub threads: Option<usize>,

    /// Below this many batches the CPU backend runs sequentially
    pub parallel_min_batches: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            backend: ComputeBackendType::Auto,
            threads: None,
            parallel_min_batches: 2,
        }
    }
}

/// Available compute backends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeBackendType {
    /// Automatically choose best backend
    Auto,
    /// CPU with Rayon parallelism across batches
    Cpu,
    /// Single-threaded reference loop
    Scalar,
}

impl WaveConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> WaveResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> WaveResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config for multi-core runs
    pub fn cpu_parallel(threads: Option<usize>) -> Self {
        let mut config = Self::default();
        config.compute.backend = ComputeBackendType::Cpu;
        config.compute.threads = threads;
        config
    }

    /// Config for the single-threaded reference backend
    pub fn scalar_reference() -> Self {
        let mut config = Self::default();
        config.compute.backend = ComputeBackendType::Scalar;
        config
    }

    /// Create config from environment variables
    ///
    /// Reads:
    /// - WAVE_BACKEND: "cpu", "scalar" or "auto" (default: auto)
    /// - WAVE_THREADS: worker thread count for the CPU backend
    /// - WAVE_NOISE_SEED: base seed for noise generators
    /// - WAVE_MAX_AMPLITUDE: clamp bound for Activity and Memory
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match std::env::var("WAVE_BACKEND")
            .map(|s| s.to_lowercase())
            .ok()
            .as_deref()
        {
            Some("cpu") => config.compute.backend = ComputeBackendType::Cpu,
            Some("scalar") => config.compute.backend = ComputeBackendType::Scalar,
            Some("auto") | None => {}
            Some(other) => tracing::warn!("Unknown WAVE_BACKEND '{}', using auto", other),
        }

        if let Some(threads) = env_parse::<usize>("WAVE_THREADS") {
            config.compute.threads = Some(threads.max(1));
        }
        if let Some(seed) = env_parse::<u64>("WAVE_NOISE_SEED") {
            config.kernel.noise_seed = seed;
        }
        if let Some(amplitude) = env_parse::<f32>("WAVE_MAX_AMPLITUDE") {
            config.kernel.max_amplitude = amplitude;
        }

        config
    }

    /// Reject parameter sets that would break the kernel's stability guarantees
    pub fn validate(&self) -> WaveResult<()> {
        let k = &self.kernel;
        let finite = [
            k.dt,
            k.damping,
            k.anchor_pull,
            k.memory_feedback,
            k.memory_rate,
            k.inhibition_gain,
            k.fatigue_gain,
            k.fatigue_recovery,
            k.gate_threshold,
            k.max_amplitude,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(WaveError::config("kernel coefficients must be finite"));
        }
        if k.dt <= 0.0 {
            return Err(WaveError::config(format!("dt must be positive, got {}", k.dt)));
        }
        if !(0.0..1.0).contains(&k.damping) {
            return Err(WaveError::config(format!(
                "damping must be in [0, 1), got {}",
                k.damping
            )));
        }
        if k.gate_threshold <= 0.0 || k.gate_threshold > 1.0 {
            return Err(WaveError::config(format!(
                "gate_threshold must be in (0, 1], got {}",
                k.gate_threshold
            )));
        }
        if k.max_amplitude <= 0.0 {
            return Err(WaveError::config("max_amplitude must be positive"));
        }
        if k.memory_rate * k.dt > 1.0 {
            return Err(WaveError::config("memory_rate * dt must not exceed 1"));
        }

        let m = &self.memory;
        if !(m.base_decay >= 0.0 && m.panic_gain >= 0.0 && m.reinforcement_gain >= 0.0) {
            return Err(WaveError::config("memory decay and gain terms must be non-negative"));
        }
        if !(m.gradient_clip > 0.0 && m.anchor_limit > 0.0) {
            return Err(WaveError::config("gradient_clip and anchor_limit must be positive"));
        }

        if self.compute.threads == Some(0) {
            return Err(WaveError::config("threads must be at least 1"));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}='{}'", key, raw);
            None
        }
    }
}
