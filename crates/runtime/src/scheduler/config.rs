// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

/// How the scheduler chooses a group for an actor added without an explicit
/// (or with a non-main) placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
	/// Every actor not placed on group 0 lands on group 1. Work stealing then
	/// spreads the load over the remaining worker groups.
	#[default]
	CollapseToWorker,

	/// Keep the round-robin choice over non-cooperative groups.
	RoundRobin,
}

/// Configuration for the scheduler's execution groups.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
	/// Length of one worker cycle.
	///
	/// Default: 10ms
	pub cycle_time: Duration,

	/// Fraction of each cycle reserved for sleeping. Clamped to `[0, 1]`.
	///
	/// Default: 0.3
	pub sleep_ratio: f32,

	/// Upper bound on how long an idle worker blocks on its wait handle.
	///
	/// Default: 100ms
	pub idle_wait: Duration,

	pub placement: Placement,

	/// Log a per-actor busy-time summary when the scheduler shuts down.
	///
	/// Default: false
	pub record_actor_timings: bool,

	/// Stack size of worker threads. `None` keeps the platform default.
	pub thread_stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			cycle_time: Duration::from_millis(10),
			sleep_ratio: 0.3,
			idle_wait: Duration::from_millis(100),
			placement: Placement::default(),
			record_actor_timings: false,
			thread_stack_size: None,
		}
	}
}

impl SchedulerConfig {
	/// Create a new config with default values.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cycle_time(mut self, cycle_time: Duration) -> Self {
		self.cycle_time = cycle_time;
		self
	}

	pub fn sleep_ratio(mut self, ratio: f32) -> Self {
		self.sleep_ratio = ratio.clamp(0.0, 1.0);
		self
	}

	pub fn idle_wait(mut self, idle_wait: Duration) -> Self {
		self.idle_wait = idle_wait;
		self
	}

	pub fn placement(mut self, placement: Placement) -> Self {
		self.placement = placement;
		self
	}

	pub fn record_actor_timings(mut self, enabled: bool) -> Self {
		self.record_actor_timings = enabled;
		self
	}

	pub fn thread_stack_size(mut self, bytes: usize) -> Self {
		self.thread_stack_size = Some(bytes);
		self
	}

	/// Portion of a cycle spent ticking.
	pub(crate) fn awake_time(&self) -> Duration {
		self.cycle_time.mul_f32(1.0 - self.sleep_ratio.clamp(0.0, 1.0))
	}
}
