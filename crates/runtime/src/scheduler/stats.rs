// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use tracing::info;

use crate::actor::ActorRef;

/// Point-in-time view of one execution group.
#[derive(Debug, Clone)]
pub struct GroupStats {
	pub index: usize,
	pub cooperative: bool,
	pub load_factor: f32,
	pub residents: Vec<ActorRef>,
}

/// Accumulated counters of one actor.
#[derive(Debug, Clone)]
pub struct ActorStats {
	pub actor: ActorRef,
	pub name: &'static str,
	pub group: usize,
	pub bound_to_main_thread: bool,
	pub executions: u64,
	pub busy: Duration,
	pub panics: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
	pub groups: Vec<GroupStats>,
	pub actors: Vec<ActorStats>,
}

impl SchedulerStats {
	pub fn actor(&self, actor: ActorRef) -> Option<&ActorStats> {
		self.actors.iter().find(|stats| stats.actor == actor)
	}

	pub fn group(&self, index: usize) -> Option<&GroupStats> {
		self.groups.get(index)
	}

	/// Actors ordered for reporting: main-thread actors first, then background
	/// actors, each by descending busy time.
	pub fn by_busy_time(&self) -> Vec<&ActorStats> {
		let mut sorted: Vec<_> = self.actors.iter().collect();
		sorted.sort_by(|a, b| b.bound_to_main_thread.cmp(&a.bound_to_main_thread).then_with(|| b.busy.cmp(&a.busy)));
		sorted
	}

	pub(crate) fn log_summary(&self) {
		let total: Duration = self.actors.iter().map(|stats| stats.busy).sum();
		info!(actors = self.actors.len(), busy_ms = total.as_millis() as u64, "actor timings");

		for stats in self.by_busy_time() {
			info!(
				actor = %stats.name,
				group = stats.group,
				main_thread = stats.bound_to_main_thread,
				executions = stats.executions,
				busy_ms = stats.busy.as_secs_f64() * 1000.0,
				panics = stats.panics,
				"actor timing"
			);
		}
	}
}
