// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Per-group load tracking.
//!
//! Every cycle records one sample in `[0, 1]`: `1.0` when the cycle ran out of
//! time with work left, otherwise the fraction of the allotted time that was
//! consumed. The published load factor is the mean of the highest quarter of
//! the last [`SAMPLE_SIZE`] samples, which reacts quickly to sustained load but
//! ignores single spikes.

use std::sync::atomic::{AtomicU32, Ordering};

/// Number of cycles of history kept per group.
pub const SAMPLE_SIZE: usize = 16;

/// Number of highest samples averaged into the load factor.
pub const PERCENTILE: usize = SAMPLE_SIZE / 4;

#[derive(Debug, Clone)]
pub struct LoadSamples {
	samples: [f32; SAMPLE_SIZE],
	next: usize,
}

impl LoadSamples {
	pub fn new() -> Self {
		Self {
			samples: [0.0; SAMPLE_SIZE],
			next: 0,
		}
	}

	pub fn record(&mut self, sample: f32) {
		self.samples[self.next] = sample.clamp(0.0, 1.0);
		self.next = (self.next + 1) % SAMPLE_SIZE;
	}

	/// Highest sample in the window.
	pub fn worst(&self) -> f32 {
		self.samples.iter().copied().fold(0.0, f32::max)
	}

	/// Mean of the [`PERCENTILE`] highest samples in the window.
	pub fn smoothed(&self) -> f32 {
		let mut sorted = self.samples;
		sorted.sort_unstable_by(|a, b| b.total_cmp(a));
		sorted[..PERCENTILE].iter().sum::<f32>() / PERCENTILE as f32
	}
}

impl Default for LoadSamples {
	fn default() -> Self {
		Self::new()
	}
}

/// Lock-free published load factor of one group.
#[derive(Debug, Default)]
pub struct LoadFactor(AtomicU32);

impl LoadFactor {
	pub fn get(&self) -> f32 {
		f32::from_bits(self.0.load(Ordering::Acquire))
	}

	pub fn set(&self, value: f32) {
		self.0.store(value.to_bits(), Ordering::Release);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_window_is_idle() {
		let samples = LoadSamples::new();
		assert_eq!(samples.worst(), 0.0);
		assert_eq!(samples.smoothed(), 0.0);
	}

	#[test]
	fn test_single_spike_is_damped() {
		let mut samples = LoadSamples::new();
		for _ in 0..SAMPLE_SIZE - 1 {
			samples.record(0.1);
		}
		samples.record(1.0);

		assert_eq!(samples.worst(), 1.0);
		let smoothed = samples.smoothed();
		assert!((smoothed - 0.325).abs() < 1e-5, "smoothed {smoothed}");
	}

	#[test]
	fn test_sustained_load_is_reported() {
		let mut samples = LoadSamples::new();
		for _ in 0..PERCENTILE {
			samples.record(1.0);
		}
		assert_eq!(samples.smoothed(), 1.0);
	}

	#[test]
	fn test_window_rolls_over() {
		let mut samples = LoadSamples::new();
		for _ in 0..SAMPLE_SIZE {
			samples.record(1.0);
		}
		for _ in 0..SAMPLE_SIZE {
			samples.record(0.2);
		}
		assert!((samples.worst() - 0.2).abs() < 1e-6);
		assert!((samples.smoothed() - 0.2).abs() < 1e-6);
	}

	#[test]
	fn test_samples_are_clamped() {
		let mut samples = LoadSamples::new();
		samples.record(4.0);
		samples.record(-1.0);
		assert_eq!(samples.worst(), 1.0);
	}

	#[test]
	fn test_load_factor_roundtrip() {
		let factor = LoadFactor::default();
		assert_eq!(factor.get(), 0.0);
		factor.set(0.75);
		assert_eq!(factor.get(), 0.75);
	}
}
