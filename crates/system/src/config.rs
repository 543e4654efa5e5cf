// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

/// Configuration for the [`ActorSystem`](crate::ActorSystem).
#[derive(Debug, Clone)]
pub struct ActorSystemConfig {
	/// How long `stop` waits for async component tasks before aborting them.
	///
	/// Default: 5s
	pub stop_timeout: Duration,

	/// Worker threads of the runtime that drives async components.
	///
	/// Default: 1
	pub async_worker_threads: usize,
}

impl Default for ActorSystemConfig {
	fn default() -> Self {
		Self {
			stop_timeout: Duration::from_secs(5),
			async_worker_threads: 1,
		}
	}
}

impl ActorSystemConfig {
	/// Create a new config with default values.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stop_timeout(mut self, timeout: Duration) -> Self {
		self.stop_timeout = timeout;
		self
	}

	pub fn async_worker_threads(mut self, threads: usize) -> Self {
		self.async_worker_threads = threads.max(1);
		self
	}
}
