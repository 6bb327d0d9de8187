//! Channel-major coefficient tensor shared by every RNS kernel.
//!
//! A polynomial of degree `N` over an RNS base of size `k` is stored as `k`
//! consecutive channels of `N` residues: coefficient `j` of channel `i` sits at
//! `i * N + j`. A single-modulus polynomial is the `k = 1` case.

use std::ops::Range;

use super::{RnsError, RnsResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RnsPoly {
    coeffs: Vec<u64>,
    channel_count: usize,
    degree: usize,
}

impl RnsPoly {
    pub fn zero(channel_count: usize, degree: usize) -> Self {
        Self {
            coeffs: vec![0; channel_count * degree],
            channel_count,
            degree,
        }
    }

    /// Builds a tensor from one vector per channel; all must share a length.
    pub fn from_channels(channels: Vec<Vec<u64>>) -> RnsResult<Self> {
        let channel_count = channels.len();
        let degree = channels.first().map_or(0, Vec::len);
        let mut coeffs = Vec::with_capacity(channel_count * degree);
        for channel in channels {
            if channel.len() != degree {
                return Err(RnsError::ShapeMismatch {
                    expected: (channel_count, degree),
                    actual: (channel_count, channel.len()),
                });
            }
            coeffs.extend(channel);
        }
        Ok(Self {
            coeffs,
            channel_count,
            degree,
        })
    }

    pub fn from_flat(coeffs: Vec<u64>, channel_count: usize, degree: usize) -> RnsResult<Self> {
        if coeffs.len() != channel_count * degree {
            return Err(RnsError::LimbCountMismatch {
                expected: channel_count * degree,
                actual: coeffs.len(),
            });
        }
        Ok(Self {
            coeffs,
            channel_count,
            degree,
        })
    }

    /// `(channel_count, degree)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.channel_count, self.degree)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Fails with `ShapeMismatch` unless the tensor is `channel_count x degree`.
    pub fn check_shape(&self, channel_count: usize, degree: usize) -> RnsResult<()> {
        if self.shape() != (channel_count, degree) {
            return Err(RnsError::ShapeMismatch {
                expected: (channel_count, degree),
                actual: self.shape(),
            });
        }
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `index >= channel_count`.
    pub fn channel(&self, index: usize) -> &[u64] {
        &self.coeffs[index * self.degree..(index + 1) * self.degree]
    }

    /// # Panics
    ///
    /// Panics if `index >= channel_count`.
    pub fn channel_mut(&mut self, index: usize) -> &mut [u64] {
        &mut self.coeffs[index * self.degree..(index + 1) * self.degree]
    }

    /// The flat residues of a contiguous range of channels.
    pub fn channel_range(&self, channels: Range<usize>) -> &[u64] {
        &self.coeffs[channels.start * self.degree..channels.end * self.degree]
    }

    pub fn coeff(&self, channel: usize, index: usize) -> u64 {
        self.coeffs[channel * self.degree + index]
    }

    pub fn set_coeff(&mut self, channel: usize, index: usize, value: u64) {
        self.coeffs[channel * self.degree + index] = value;
    }

    pub fn channels(&self) -> impl Iterator<Item = &[u64]> {
        self.coeffs.chunks_exact(self.degree.max(1))
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [u64]> {
        self.coeffs.chunks_exact_mut(self.degree.max(1))
    }

    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.coeffs
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    pub fn into_channels(self) -> Vec<Vec<u64>> {
        self.channels().map(<[u64]>::to_vec).collect()
    }
}
