//! # Wave Core
//!
//! Core types and traits for the wave lattice: a batched, periodic,
//! one-dimensional lattice of coupled units with three channels per
//! position (Activity, Memory, Fatigue).
//!
//! This crate provides the fundamental building blocks:
//! - **StateBuffer**: batch-major three-channel storage
//! - **Stencil**: the `(left, self, right)` coupling weights
//! - **WaveConfig**: every kernel and updater coefficient
//! - **EvolutionBackend**: the interface compute backends implement
//!
//! ## Memory Layout
//!
//! State is one flat `f32` buffer of `B * 3 * D` values. Batch `b` owns
//! `[b*3*D, (b+1)*3*D)`; inside it Activity, Memory and Fatigue follow
//! each other as rows of length `D`.

pub mod config;
pub mod error;
pub mod state;
pub mod traits;

// Re-export main types at crate root
pub use config::{ComputeBackendType, ComputeConfig, KernelConfig, MemoryConfig, WaveConfig};
pub use error::{WaveError, WaveResult};
pub use state::{Channel, ChannelSummary, LatticeShape, StateBuffer, Stencil};
pub use traits::*;

/// Hard clamp bound for Activity and Memory
pub const MAX_AMPLITUDE: f32 = 5.0;

/// Channels stored per lattice position
pub const CHANNELS: usize = 3;

/// Weights in a coupling stencil
pub const STENCIL_TAPS: usize = 3;
