// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::io;

/// Errors returned by the [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
	#[error("execution group {index} is out of range (scheduler has {count} groups)")]
	GroupOutOfRange {
		index: usize,
		count: usize,
	},

	/// The group is being driven by another thread right now.
	#[error("execution group {0} is already being ticked")]
	GroupBusy(usize),

	#[error("failed to spawn worker thread for execution group {index}")]
	ThreadSpawn {
		index: usize,
		#[source]
		source: io::Error,
	},
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
