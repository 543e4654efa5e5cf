// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Dedicated worker threads for non-cooperative execution groups.
//!
//! Each worker alternates between an awake slice, during which it runs
//! cooperative cycles until the slice's deadline, and a sleep slice. A cycle
//! that overruns its awake slice is still followed by a full sleep slice. When a
//! cycle drains all work the worker parks on the group's wait handle, bounded
//! by the configured idle wait so the stop request is observed promptly.

use std::{
	sync::Arc,
	thread,
	time::{Duration, Instant},
};

use tracing::debug;

use crate::{
	actor::CancellationToken,
	error::{Result, SchedulerError},
	scheduler::{config::SchedulerConfig, group::ExecutionGroup},
};

/// Spawn the worker thread of group `index`.
pub(crate) fn spawn_worker(
	groups: Arc<[ExecutionGroup]>,
	index: usize,
	config: SchedulerConfig,
	token: CancellationToken,
) -> Result<()> {
	let group = &groups[index];
	group.mark_running();

	let thread_groups = groups.clone();
	let mut builder = thread::Builder::new().name(format!("tessera-group-{index}"));
	if let Some(bytes) = config.thread_stack_size {
		builder = builder.stack_size(bytes);
	}
	let spawned = builder.spawn(move || {
		debug!(group = index, "worker thread starting");
		run_worker_loop(&thread_groups, index, &config, &token);
		debug!(group = index, "worker thread stopped");
	});

	match spawned {
		Ok(handle) => {
			group.attach_thread(handle);
			Ok(())
		}
		Err(source) => {
			group.mark_stopped();
			Err(SchedulerError::ThreadSpawn {
				index,
				source,
			})
		}
	}
}

fn run_worker_loop(groups: &[ExecutionGroup], index: usize, config: &SchedulerConfig, token: &CancellationToken) {
	let group = &groups[index];
	let mut worker = group.lock_worker();
	let awake = config.awake_time();

	while !group.is_stopping() {
		let started = Instant::now();
		let deadline = started + awake;
		worker.cycle(groups, deadline, token);

		if group.is_stopping() {
			break;
		}

		let rest = rest_time(config, started, deadline, Instant::now());
		if !rest.is_zero() {
			thread::sleep(rest);
		}

		group.signal().wait_timeout(config.idle_wait);
	}
}

/// Time to sleep after a cycle that started at `started`. A cycle that ran
/// past its awake deadline still gets the full sleep slice.
fn rest_time(config: &SchedulerConfig, started: Instant, deadline: Instant, now: Instant) -> Duration {
	if now > deadline {
		config.cycle_time.saturating_sub(config.awake_time())
	} else {
		(started + config.cycle_time).saturating_duration_since(now)
	}
}
