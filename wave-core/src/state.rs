//! # Lattice State Layout
//!
//! One flat `f32` buffer per lattice, batch-major:
//!
//! ```text
//! [ batch 0: A[0..D] M[0..D] F[0..D] | batch 1: A M F | ... ]
//! ```
//!
//! Each batch owns a contiguous `3 * D` block, so batches can be handed to
//! worker threads as disjoint chunks and each channel row is a contiguous
//! slice the compiler can vectorize over.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{WaveError, WaveResult};
use crate::{CHANNELS, STENCIL_TAPS};

/// Batch count and ring width of a lattice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeShape {
    /// Number of independent batches (B)
    pub batches: usize,
    /// Positions on the periodic ring (D)
    pub width: usize,
}

impl LatticeShape {
    /// Create a shape, rejecting empty dimensions and sizes that overflow
    pub fn new(batches: usize, width: usize) -> WaveResult<Self> {
        if batches == 0 || width == 0 {
            return Err(WaveError::invalid(format!(
                "lattice dimensions must be >= 1, got B={batches} D={width}"
            )));
        }
        if batches
            .checked_mul(CHANNELS)
            .and_then(|n| n.checked_mul(width))
            .is_none()
        {
            return Err(WaveError::invalid(format!(
                "lattice size overflows usize (B={batches}, D={width})"
            )));
        }
        Ok(Self { batches, width })
    }

    /// Values per batch (all three channels)
    #[inline]
    pub fn batch_stride(&self) -> usize {
        CHANNELS * self.width
    }

    /// Total values in a state buffer
    #[inline]
    pub fn state_len(&self) -> usize {
        self.batches * self.batch_stride()
    }

    /// Number of (batch, position) cells
    #[inline]
    pub fn cells(&self) -> usize {
        self.batches * self.width
    }

    /// Flat index of `(batch, channel, position)`
    #[inline]
    pub fn index(&self, batch: usize, channel: Channel, position: usize) -> usize {
        batch * self.batch_stride() + channel.offset(self.width) + position
    }
}

/// The three per-position channels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Fast excitation, the primary observable
    Activity,
    /// Slow trace of Activity
    Memory,
    /// Use-dependent accumulator that gates excitation
    Fatigue,
}

impl Channel {
    pub const ALL: [Channel; CHANNELS] = [Channel::Activity, Channel::Memory, Channel::Fatigue];

    /// Row number of this channel inside a batch block
    #[inline]
    pub fn row(self) -> usize {
        match self {
            Channel::Activity => 0,
            Channel::Memory => 1,
            Channel::Fatigue => 2,
        }
    }

    #[inline]
    pub fn offset(self, width: usize) -> usize {
        self.row() * width
    }
}

/// Aggregate view of one channel across every batch
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelSummary {
    /// Mean of |value| over finite entries
    pub mean_abs: f32,
    /// Largest |value| over finite entries
    pub max_abs: f32,
    /// Count of NaN or infinite entries
    pub non_finite: usize,
}

impl ChannelSummary {
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a f32>) -> Self {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut max_abs = 0.0f32;
        let mut non_finite = 0usize;

        for &v in values {
            if v.is_finite() {
                sum += v.abs() as f64;
                max_abs = max_abs.max(v.abs());
                count += 1;
            } else {
                non_finite += 1;
            }
        }

        Self {
            mean_abs: if count > 0 { (sum / count as f64) as f32 } else { 0.0 },
            max_abs,
            non_finite,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.non_finite == 0
    }
}

/// Owned lattice state (or scratch) buffer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateBuffer {
    shape: LatticeShape,
    data: Vec<f32>,
}

impl StateBuffer {
    /// Zero-initialised buffer
    pub fn zeros(shape: LatticeShape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.state_len()],
        }
    }

    /// Wrap an existing flat buffer laid out batch-major
    pub fn from_vec(shape: LatticeShape, data: Vec<f32>) -> WaveResult<Self> {
        if data.len() != shape.state_len() {
            return Err(WaveError::shape("state", shape.state_len(), data.len()));
        }
        Ok(Self { shape, data })
    }

    #[inline]
    pub fn shape(&self) -> LatticeShape {
        self.shape
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// All three channels of one batch
    pub fn batch(&self, batch: usize) -> &[f32] {
        let stride = self.shape.batch_stride();
        &self.data[batch * stride..(batch + 1) * stride]
    }

    pub fn batch_mut(&mut self, batch: usize) -> &mut [f32] {
        let stride = self.shape.batch_stride();
        &mut self.data[batch * stride..(batch + 1) * stride]
    }

    /// One channel row of one batch
    pub fn row(&self, batch: usize, channel: Channel) -> &[f32] {
        let start = self.shape.index(batch, channel, 0);
        &self.data[start..start + self.shape.width]
    }

    pub fn row_mut(&mut self, batch: usize, channel: Channel) -> &mut [f32] {
        let start = self.shape.index(batch, channel, 0);
        let width = self.shape.width;
        &mut self.data[start..start + width]
    }

    #[inline]
    pub fn get(&self, batch: usize, channel: Channel, position: usize) -> f32 {
        self.data[self.shape.index(batch, channel, position)]
    }

    #[inline]
    pub fn set(&mut self, batch: usize, channel: Channel, position: usize, value: f32) {
        let idx = self.shape.index(batch, channel, position);
        self.data[idx] = value;
    }

    /// Iterate one channel across every batch
    pub fn channel_values(&self, channel: Channel) -> impl Iterator<Item = &f32> + '_ {
        (0..self.shape.batches).flat_map(move |b| self.row(b, channel).iter())
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn fill_channel(&mut self, channel: Channel, value: f32) {
        for b in 0..self.shape.batches {
            self.row_mut(b, channel).fill(value);
        }
    }

    pub fn fill_batch(&mut self, batch: usize, value: f32) {
        self.batch_mut(batch).fill(value);
    }

    pub fn summary(&self, channel: Channel) -> ChannelSummary {
        ChannelSummary::from_values(self.channel_values(channel))
    }

    /// Sum of |value| over every channel of one batch
    pub fn batch_abs_sum(&self, batch: usize) -> f64 {
        self.batch(batch).iter().map(|v| v.abs() as f64).sum()
    }

    /// True when no entry is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Neighbor-coupling weights `(left, self, right)`
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Stencil {
    pub left: f32,
    pub center: f32,
    pub right: f32,
}

impl Stencil {
    pub const fn new(left: f32, center: f32, right: f32) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    /// Parse the three weights from a flat slice
    pub fn from_slice(weights: &[f32]) -> WaveResult<Self> {
        if weights.len() != STENCIL_TAPS {
            return Err(WaveError::shape("stencil", STENCIL_TAPS, weights.len()));
        }
        bytemuck::try_from_bytes::<Stencil>(bytemuck::cast_slice(weights))
            .copied()
            .map_err(|e| WaveError::invalid(format!("stencil layout: {e}")))
    }

    /// Weighted sum of the three neighbors
    #[inline(always)]
    pub fn apply(&self, left: f32, center: f32, right: f32) -> f32 {
        self.left * left + self.center * center + self.right * right
    }
}

impl Default for Stencil {
    /// Mild diffusion
    fn default() -> Self {
        Self::new(-0.1, 0.8, -0.1)
    }
}

impl From<[f32; STENCIL_TAPS]> for Stencil {
    fn from(weights: [f32; STENCIL_TAPS]) -> Self {
        bytemuck::cast(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stencil_size() {
        assert_eq!(std::mem::size_of::<Stencil>(), 12);
    }

    #[test]
    fn test_stencil_from_slice() {
        let stencil = Stencil::from_slice(&[5.0, -10.0, 5.0]).unwrap();
        assert_eq!(stencil, Stencil::new(5.0, -10.0, 5.0));
        assert_eq!(Stencil::from([1.0, 2.0, 3.0]).right, 3.0);

        assert!(matches!(
            Stencil::from_slice(&[1.0, 2.0]),
            Err(WaveError::Shape { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_batch_major_layout() {
        let shape = LatticeShape::new(2, 4).unwrap();
        assert_eq!(shape.batch_stride(), 12);
        assert_eq!(shape.state_len(), 24);
        assert_eq!(shape.index(0, Channel::Memory, 1), 5);
        assert_eq!(shape.index(1, Channel::Activity, 0), 12);
        assert_eq!(shape.index(1, Channel::Fatigue, 3), 23);
    }

    #[test]
    fn test_shape_rejects_empty() {
        assert!(LatticeShape::new(0, 8).is_err());
        assert!(LatticeShape::new(8, 0).is_err());
    }

    #[test]
    fn test_shape_rejects_overflowing_size() {
        assert!(matches!(
            LatticeShape::new(usize::MAX / 2, 4),
            Err(WaveError::InvalidParameter(_))
        ));
        assert!(LatticeShape::new(1, usize::MAX).is_err());
        assert!(LatticeShape::new(usize::MAX / 3, 1).is_ok());
    }

    #[test]
    fn test_rows_and_fill() {
        let shape = LatticeShape::new(3, 5).unwrap();
        let mut state = StateBuffer::zeros(shape);

        state.fill_batch(1, 2.0);
        state.set(2, Channel::Fatigue, 4, 0.5);

        assert_eq!(state.batch_abs_sum(0), 0.0);
        assert_eq!(state.batch_abs_sum(1), 30.0);
        assert_eq!(state.row(2, Channel::Fatigue)[4], 0.5);
        assert_eq!(state.get(1, Channel::Memory, 3), 2.0);

        state.fill_channel(Channel::Activity, -1.0);
        let summary = state.summary(Channel::Activity);
        assert_eq!(summary.mean_abs, 1.0);
        assert_eq!(summary.max_abs, 1.0);
        assert!(summary.is_finite());
    }

    #[test]
    fn test_summary_counts_non_finite() {
        let shape = LatticeShape::new(1, 3).unwrap();
        let mut state = StateBuffer::zeros(shape);
        state.set(0, Channel::Memory, 0, f32::NAN);
        state.set(0, Channel::Memory, 1, 4.0);

        let summary = state.summary(Channel::Memory);
        assert_eq!(summary.non_finite, 1);
        assert_eq!(summary.max_abs, 4.0);
        assert_eq!(summary.mean_abs, 2.0);
        assert!(!state.is_finite());
    }

    #[test]
    fn test_from_vec_checks_len() {
        let shape = LatticeShape::new(2, 2).unwrap();
        assert!(StateBuffer::from_vec(shape, vec![0.0; 12]).is_ok());
        assert!(matches!(
            StateBuffer::from_vec(shape, vec![0.0; 11]),
            Err(WaveError::Shape { what: "state", .. })
        ));
    }
}
