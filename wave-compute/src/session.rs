//! # Lattice Session
//!
//! Owns everything one simulation needs: state, scratch, anchors, the
//! stencil and a backend. The epoch counter advances once per evolve call
//! so successive calls draw fresh but reproducible noise.
//!
//! Independent sessions share nothing, so several can run side by side.

use std::path::Path;

use serde::{Deserialize, Serialize};

use wave_core::config::WaveConfig;
use wave_core::error::{WaveError, WaveResult};
use wave_core::state::{Channel, ChannelSummary, LatticeShape, StateBuffer, Stencil};
use wave_core::traits::{BackendStats, EvolutionBackend, EvolveParams, MemoryCoefficients};

use crate::create_backend;

/// Serializable copy of a session's evolving data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatticeSnapshot {
    pub state: StateBuffer,
    pub anchors: Vec<f32>,
    pub stencil: Stencil,
    pub epoch: u64,
}

/// Per-channel view of a session
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeSummary {
    pub activity: ChannelSummary,
    pub memory: ChannelSummary,
    pub fatigue: ChannelSummary,
    pub epoch: u64,
}

impl LatticeSummary {
    pub fn is_finite(&self) -> bool {
        self.activity.is_finite() && self.memory.is_finite() && self.fatigue.is_finite()
    }
}

pub struct Lattice {
    state: StateBuffer,
    scratch: StateBuffer,
    anchors: Vec<f32>,
    stencil: Stencil,
    epoch: u64,
    backend: Box<dyn EvolutionBackend>,
}

impl Lattice {
    /// Zeroed lattice with zero anchors and the default stencil
    pub fn new(shape: LatticeShape, config: &WaveConfig) -> WaveResult<Self> {
        let backend = create_backend(config)?;
        Ok(Self::with_backend(shape, backend))
    }

    pub fn with_backend(shape: LatticeShape, backend: Box<dyn EvolutionBackend>) -> Self {
        tracing::info!(
            "New lattice: {} batches x {} positions on {}",
            shape.batches,
            shape.width,
            backend.name()
        );
        Self {
            state: StateBuffer::zeros(shape),
            scratch: StateBuffer::zeros(shape),
            anchors: vec![0.0; shape.width],
            stencil: Stencil::default(),
            epoch: 0,
            backend,
        }
    }

    #[inline]
    pub fn shape(&self) -> LatticeShape {
        self.state.shape()
    }

    pub fn state(&self) -> &StateBuffer {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateBuffer {
        &mut self.state
    }

    pub fn anchors(&self) -> &[f32] {
        &self.anchors
    }

    pub fn stencil(&self) -> Stencil {
        self.stencil
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn stats(&self) -> BackendStats {
        self.backend.stats()
    }

    /// Advance every batch by `steps` steps
    pub fn evolve(&mut self, steps: u32, noise: f32) -> WaveResult<()> {
        let params = EvolveParams::new(steps, noise).with_epoch(self.epoch);
        self.backend
            .evolve(&mut self.state, &mut self.scratch, &self.stencil, &self.anchors, params)?;
        if steps > 0 {
            self.epoch += 1;
        }
        Ok(())
    }

    /// Revise the shared anchors from an adjustment vector
    pub fn update_anchors(&mut self, adjustment: &[f32], coefficients: MemoryCoefficients) -> WaveResult<()> {
        self.backend.update_memory(&mut self.anchors, adjustment, coefficients)
    }

    pub fn set_anchors(&mut self, anchors: &[f32]) -> WaveResult<()> {
        if anchors.len() != self.shape().width {
            return Err(WaveError::shape("anchors", self.shape().width, anchors.len()));
        }
        if anchors.iter().any(|w| !w.is_finite()) {
            return Err(WaveError::invalid("anchors must be finite"));
        }
        self.anchors.copy_from_slice(anchors);
        Ok(())
    }

    pub fn set_stencil(&mut self, stencil: Stencil) {
        self.stencil = stencil;
    }

    /// Set every channel of one batch to `value`
    pub fn excite_batch(&mut self, batch: usize, value: f32) -> WaveResult<()> {
        let batches = self.shape().batches;
        if batch >= batches {
            return Err(WaveError::invalid(format!(
                "batch {batch} out of range (lattice has {batches})"
            )));
        }
        self.state.fill_batch(batch, value);
        Ok(())
    }

    /// Zero the state and restart the epoch counter; anchors are kept
    pub fn reset(&mut self) {
        self.state.fill(0.0);
        self.scratch.fill(0.0);
        self.epoch = 0;
    }

    pub fn summary(&self) -> LatticeSummary {
        LatticeSummary {
            activity: self.state.summary(Channel::Activity),
            memory: self.state.summary(Channel::Memory),
            fatigue: self.state.summary(Channel::Fatigue),
            epoch: self.epoch,
        }
    }

    pub fn snapshot(&self) -> LatticeSnapshot {
        LatticeSnapshot {
            state: self.state.clone(),
            anchors: self.anchors.clone(),
            stencil: self.stencil,
            epoch: self.epoch,
        }
    }

    /// Replace state, anchors, stencil and epoch from a snapshot
    ///
    /// The snapshot may carry a different shape; scratch is resized to match.
    pub fn restore(&mut self, snapshot: LatticeSnapshot) -> WaveResult<()> {
        let declared = snapshot.state.shape();
        let shape = LatticeShape::new(declared.batches, declared.width)?;
        let state = StateBuffer::from_vec(shape, snapshot.state.into_vec())?;
        if snapshot.anchors.len() != shape.width {
            return Err(WaveError::shape("anchors", shape.width, snapshot.anchors.len()));
        }

        self.state = state;
        self.scratch = StateBuffer::zeros(shape);
        self.anchors = snapshot.anchors;
        self.stencil = snapshot.stencil;
        self.epoch = snapshot.epoch;
        Ok(())
    }

    /// Write a JSON snapshot
    pub fn save(&self, path: impl AsRef<Path>) -> WaveResult<()> {
        let path = path.as_ref();
        let content = serde_json::to_string(&self.snapshot())?;
        std::fs::write(path, content)?;
        tracing::info!("Saved lattice snapshot (epoch {}) to {}", self.epoch, path.display());
        Ok(())
    }

    /// Rebuild a session from a JSON snapshot
    pub fn load(path: impl AsRef<Path>, config: &WaveConfig) -> WaveResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let snapshot: LatticeSnapshot = serde_json::from_str(&content)?;

        // Check the declared shape against the data before allocating for it
        let declared = snapshot.state.shape();
        let shape = LatticeShape::new(declared.batches, declared.width)?;
        if snapshot.state.as_slice().len() != shape.state_len() {
            return Err(WaveError::shape("state", shape.state_len(), snapshot.state.as_slice().len()));
        }

        let mut lattice = Self::new(shape, config)?;
        lattice.restore(snapshot)?;
        tracing::info!("Loaded lattice snapshot (epoch {}) from {}", lattice.epoch, path.display());
        Ok(lattice)
    }
}
