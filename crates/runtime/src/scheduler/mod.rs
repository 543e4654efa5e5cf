// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Cooperative work-stealing scheduler.
//!
//! The scheduler owns `nb_logical_cores + 1` execution groups. Groups
//! `0..nb_logical_cores` host actors and are either backed by a dedicated
//! worker thread or marked cooperative and driven by the host through
//! [`Scheduler::tick`]. The last group is the control group: it never runs
//! actors and only serves as the sending side of add/remove requests and the
//! receiving side of their acknowledgements.
//!
//! Topology changes are serialized by the control lock. The actor snapshot
//! used by [`Scheduler::awake_actor`] is a lock-free skip list, so wake-ups
//! never block on topology changes.

mod actor;
mod config;
mod group;
mod load;
mod message;
mod stats;
mod thread;

use std::{sync::Arc, time::Instant};

use crossbeam_skiplist::SkipMap;
pub use config::{Placement, SchedulerConfig};
pub use load::SAMPLE_SIZE;
use parking_lot::Mutex;
pub use stats::{ActorStats, GroupStats, SchedulerStats};
use tracing::{debug, info, trace};

use crate::{
	actor::{ActorCell, ActorRef, CancellationToken},
	error::{Result, SchedulerError},
	scheduler::{actor::ScheduledActor, group::ExecutionGroup, message::ThreadMessage},
};

/// Index of the group driven by the host's main thread.
pub const MAIN_THREAD_GROUP: usize = 0;

/// Handle to the scheduler. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler(Arc<Inner>);

struct Inner {
	groups: Arc<[ExecutionGroup]>,
	control: Mutex<ControlState>,
	actors: SkipMap<ActorRef, Arc<ScheduledActor>>,
	config: SchedulerConfig,
}

struct ControlState {
	/// Round-robin position of the next default placement.
	next_candidate: usize,
}

impl Scheduler {
	/// Create a scheduler with one execution group per logical core.
	pub fn new(nb_logical_cores: usize) -> Self {
		Self::with_config(nb_logical_cores, SchedulerConfig::default())
	}

	pub fn with_config(nb_logical_cores: usize, config: SchedulerConfig) -> Self {
		let cores = nb_logical_cores.max(1);
		let count = cores + 1;
		let groups: Arc<[ExecutionGroup]> = (0..count).map(|index| ExecutionGroup::new(index, count)).collect();
		groups[cores].set_cooperative();

		debug!(groups = cores, "scheduler created");

		Self(Arc::new(Inner {
			groups,
			control: Mutex::new(ControlState {
				next_candidate: 0,
			}),
			actors: SkipMap::new(),
			config,
		}))
	}

	/// Create a scheduler sized to the machine's logical cores.
	pub fn with_available_parallelism(config: SchedulerConfig) -> Self {
		Self::with_config(num_cpus::get(), config)
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.0.config
	}

	/// Number of actor-hosting groups.
	pub fn group_count(&self) -> usize {
		self.0.groups.len() - 1
	}

	fn control_index(&self) -> usize {
		self.0.groups.len() - 1
	}

	fn check_index(&self, index: usize) -> Result<&ExecutionGroup> {
		let count = self.group_count();
		if index >= count {
			return Err(SchedulerError::GroupOutOfRange {
				index,
				count,
			});
		}
		Ok(&self.0.groups[index])
	}

	/// Mark a group as cooperative: it gets no worker thread and is driven by
	/// the host through [`tick`](Self::tick). Call before [`start`](Self::start).
	pub fn set_periodic_ticking_thread(&self, index: usize) -> Result<()> {
		self.check_index(index)?.set_cooperative();
		debug!(group = index, "group marked cooperative");
		Ok(())
	}

	pub fn is_cooperative(&self, index: usize) -> Result<bool> {
		Ok(self.check_index(index)?.is_cooperative())
	}

	/// Spawn the worker threads of every non-cooperative group.
	pub fn start(&self, token: &CancellationToken) -> Result<()> {
		for index in 0..self.group_count() {
			let group = &self.0.groups[index];
			if group.is_cooperative() || group.is_running() {
				continue;
			}
			if let Err(err) = thread::spawn_worker(self.0.groups.clone(), index, self.0.config.clone(), token.clone()) {
				self.stop();
				return Err(err);
			}
		}
		info!(groups = self.group_count(), "scheduler started");
		Ok(())
	}

	/// Stop and join every worker thread. Cooperative groups are unaffected.
	pub fn stop(&self) {
		for group in self.0.groups.iter() {
			group.stop_thread();
		}
		self.flush();
		info!("scheduler stopped");
	}

	/// Run one cooperative cycle of group `index` on the calling thread.
	pub fn tick(&self, deadline: Instant, token: &CancellationToken, index: usize) -> Result<()> {
		self.check_index(index)?.tick(&self.0.groups, deadline, token)
	}

	/// Mark the actor ready and wake its group. Lock-free; callable from any
	/// thread. Unknown actors are ignored.
	pub fn awake_actor(&self, actor: ActorRef) {
		if let Some(entry) = self.0.actors.get(&actor) {
			let scheduled = entry.value();
			scheduled.mark_ready();
			self.0.groups[scheduled.owner()].signal().set();
		}
	}

	/// Place an actor on a group and return the group's index.
	///
	/// Without an explicit group the actor goes round-robin over the
	/// non-cooperative groups, then through the configured [`Placement`].
	/// Adding an actor that is already tracked is a no-op.
	pub fn add(&self, cell: Arc<ActorCell>, group: Option<usize>) -> Result<usize> {
		let mut control = self.0.control.lock();
		if let Some(index) = group {
			self.check_index(index)?;
		}
		self.drain_control();

		let actor_ref = cell.actor_ref();
		if let Some(existing) = self.0.actors.get(&actor_ref) {
			trace!(actor = %actor_ref, "actor already scheduled");
			return Ok(existing.value().owner());
		}

		let index = self.resolve_group(&mut control, group);
		let scheduled = Arc::new(ScheduledActor::new(cell, index));
		self.0.actors.insert(actor_ref, scheduled.clone());

		let target = &self.0.groups[index];
		target.post(self.control_index(), ThreadMessage::AddActor(scheduled));
		target.settle(&self.0.groups);

		debug!(actor = %actor_ref, group = index, "actor scheduled");
		Ok(index)
	}

	fn resolve_group(&self, control: &mut ControlState, requested: Option<usize>) -> usize {
		let count = self.group_count();
		let index = requested.unwrap_or_else(|| {
			let next = (0..count)
				.map(|_| {
					let candidate = control.next_candidate % count;
					control.next_candidate = control.next_candidate.wrapping_add(1);
					candidate
				})
				.find(|&candidate| !self.0.groups[candidate].is_cooperative());
			next.unwrap_or(MAIN_THREAD_GROUP)
		});

		match self.0.config.placement {
			Placement::CollapseToWorker if index != MAIN_THREAD_GROUP && count >= 2 => 1,
			_ => index,
		}
	}

	/// Ask the actor's owner to release it. The actor stops being tracked once
	/// the owner acknowledges. Unknown actors are ignored.
	pub fn remove(&self, actor: ActorRef) {
		let _control = self.0.control.lock();

		let Some(scheduled) = self.0.actors.get(&actor).map(|entry| entry.value().clone()) else {
			return;
		};
		if !scheduled.begin_removal() {
			return;
		}

		let owner = scheduled.owner();
		let target = &self.0.groups[owner];
		target.post(
			self.control_index(),
			ThreadMessage::RemoveActor {
				reply_to: self.control_index(),
				actor: scheduled,
			},
		);
		target.settle(&self.0.groups);
		self.drain_control();

		debug!(actor = %actor, group = owner, "actor removal requested");
	}

	/// Apply pending removal acknowledgements now.
	pub fn flush(&self) {
		let _control = self.0.control.lock();
		self.drain_control();
	}

	/// Must be called with the control lock held.
	fn drain_control(&self) {
		let control = &self.0.groups[self.control_index()];
		for from in 0..self.0.groups.len() {
			while let Some(message) = control.try_receive(from) {
				match message {
					ThreadMessage::RemoveActorResponse(actor) => {
						if let Some(entry) = self.0.actors.get(&actor.actor_ref()) {
							if Arc::ptr_eq(entry.value(), &actor) {
								entry.remove();
								debug!(actor = %actor.name(), group = from, "actor released");
							}
						}
					}
					other => trace!(group = from, message = ?other, "control group ignoring message"),
				}
			}
		}
	}

	/// Whether the actor is tracked (including while its removal is pending).
	pub fn contains(&self, actor: ActorRef) -> bool {
		self.0.actors.contains_key(&actor)
	}

	/// Number of tracked actors.
	pub fn len(&self) -> usize {
		self.0.actors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.actors.is_empty()
	}

	/// Group currently owning the actor.
	pub fn group_of(&self, actor: ActorRef) -> Option<usize> {
		self.0.actors.get(&actor).map(|entry| entry.value().owner())
	}

	/// Actors resident in group `index`, as of its last drain.
	pub fn resident_actors(&self, index: usize) -> Result<Vec<ActorRef>> {
		Ok(self.check_index(index)?.resident_actors())
	}

	/// Smoothed load of group `index` in `[0, 1]`.
	pub fn load_factor(&self, index: usize) -> Result<f32> {
		Ok(self.check_index(index)?.load_factor())
	}

	pub fn stats(&self) -> SchedulerStats {
		let groups = self.0.groups[..self.group_count()]
			.iter()
			.map(|group| GroupStats {
				index: group.index(),
				cooperative: group.is_cooperative(),
				load_factor: group.load_factor(),
				residents: group.resident_actors(),
			})
			.collect();

		let actors = self
			.0
			.actors
			.iter()
			.map(|entry| {
				let scheduled = entry.value();
				ActorStats {
					actor: *entry.key(),
					name: scheduled.name(),
					group: scheduled.owner(),
					bound_to_main_thread: scheduled.cell().is_bound_to_main_thread(),
					executions: scheduled.total_executions(),
					busy: scheduled.busy(),
					panics: scheduled.panics(),
				}
			})
			.collect();

		SchedulerStats {
			groups,
			actors,
		}
	}

	/// Stop the worker threads and, when enabled, log the timing summary.
	pub fn shutdown(&self) {
		self.stop();
		if self.0.config.record_actor_timings {
			self.stats().log_summary();
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		for group in self.groups.iter() {
			group.stop_thread();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicUsize, Ordering},
		},
		time::Duration,
	};

	use super::*;
	use crate::actor::{Actor, ActorKind, Lifecycle, TickResult};

	struct Marker;

	impl ActorKind for Marker {}

	fn marker(label: &'static str, ticks: Arc<AtomicUsize>) -> Arc<ActorCell> {
		ActorCell::new(
			Actor::new(
				Marker,
				Lifecycle::new(move |_: &mut Marker, _, _| {
					ticks.fetch_add(1, Ordering::SeqCst);
					TickResult::Completed
				}),
			)
			.labelled(label),
		)
	}

	fn deadline() -> Instant {
		Instant::now() + Duration::from_millis(20)
	}

	#[test]
	fn test_groups_are_sized_from_cores() {
		let scheduler = Scheduler::new(4);
		assert_eq!(scheduler.group_count(), 4);

		let scheduler = Scheduler::new(0);
		assert_eq!(scheduler.group_count(), 1);
	}

	#[test]
	fn test_control_group_is_not_addressable() {
		let scheduler = Scheduler::new(2);
		let token = CancellationToken::new();
		assert!(matches!(
			scheduler.tick(deadline(), &token, 2),
			Err(SchedulerError::GroupOutOfRange {
				index: 2,
				count: 2
			})
		));
		assert!(scheduler.add(marker("a", Arc::default()), Some(5)).is_err());
		assert!(scheduler.is_empty());
	}

	#[test]
	fn test_collapse_placement() {
		let scheduler = Scheduler::new(4);
		scheduler.set_periodic_ticking_thread(0).unwrap();

		let placed: Vec<_> = ["a", "b", "c"].iter().map(|&label| scheduler.add(marker(label, Arc::default()), None).unwrap()).collect();
		assert_eq!(placed, vec![1, 1, 1]);
		assert_eq!(scheduler.add(marker("d", Arc::default()), Some(3)).unwrap(), 1);
		assert_eq!(scheduler.add(marker("e", Arc::default()), Some(0)).unwrap(), 0);
	}

	#[test]
	fn test_round_robin_placement_skips_cooperative_groups() {
		let scheduler = Scheduler::with_config(3, SchedulerConfig::new().placement(Placement::RoundRobin));
		scheduler.set_periodic_ticking_thread(0).unwrap();

		let placed: Vec<_> =
			["a", "b", "c", "d"].iter().map(|&label| scheduler.add(marker(label, Arc::default()), None).unwrap()).collect();
		assert_eq!(placed, vec![1, 2, 1, 2]);
		assert_eq!(scheduler.add(marker("e", Arc::default()), Some(2)).unwrap(), 2);
	}

	#[test]
	fn test_round_robin_starts_at_first_group() {
		let scheduler = Scheduler::with_config(2, SchedulerConfig::new().placement(Placement::RoundRobin));

		let placed: Vec<_> =
			["a", "b", "c"].iter().map(|&label| scheduler.add(marker(label, Arc::default()), None).unwrap()).collect();
		assert_eq!(placed, vec![0, 1, 0]);
	}

	#[test]
	fn test_round_robin_falls_back_to_main_group() {
		let scheduler = Scheduler::with_config(1, SchedulerConfig::new().placement(Placement::RoundRobin));
		scheduler.set_periodic_ticking_thread(0).unwrap();
		assert_eq!(scheduler.add(marker("a", Arc::default()), None).unwrap(), MAIN_THREAD_GROUP);
	}

	#[test]
	fn test_add_is_idempotent() {
		let scheduler = Scheduler::new(2);
		let cell = marker("a", Arc::default());
		let first = scheduler.add(cell.clone(), None).unwrap();
		let second = scheduler.add(cell.clone(), Some(0)).unwrap();

		assert_eq!(first, second);
		assert_eq!(scheduler.len(), 1);
		assert_eq!(scheduler.resident_actors(first).unwrap(), vec![cell.actor_ref()]);
	}

	#[test]
	fn test_remove_while_stopped_is_immediate() {
		let scheduler = Scheduler::new(2);
		let cell = marker("a", Arc::default());
		let index = scheduler.add(cell.clone(), None).unwrap();
		assert!(scheduler.contains(cell.actor_ref()));

		scheduler.remove(cell.actor_ref());
		assert!(!scheduler.contains(cell.actor_ref()));
		assert!(scheduler.resident_actors(index).unwrap().is_empty());

		// removing twice is harmless
		scheduler.remove(cell.actor_ref());
		assert!(scheduler.is_empty());
	}

	#[test]
	fn test_awake_reschedules_completed_actor() {
		let scheduler = Scheduler::new(1);
		scheduler.set_periodic_ticking_thread(0).unwrap();
		let ticks = Arc::new(AtomicUsize::new(0));
		let cell = marker("a", ticks.clone());
		scheduler.add(cell.clone(), None).unwrap();

		let token = CancellationToken::new();
		scheduler.tick(deadline(), &token, 0).unwrap();
		scheduler.tick(deadline(), &token, 0).unwrap();
		assert_eq!(ticks.load(Ordering::SeqCst), 1);

		scheduler.awake_actor(cell.actor_ref());
		scheduler.tick(deadline(), &token, 0).unwrap();
		assert_eq!(ticks.load(Ordering::SeqCst), 2);

		// unknown actors are ignored
		scheduler.awake_actor(ActorRef::of::<u64>());
	}

	#[test]
	fn test_running_worker_group_cannot_be_ticked() {
		let scheduler = Scheduler::new(2);
		scheduler.set_periodic_ticking_thread(0).unwrap();
		let token = CancellationToken::new();
		scheduler.start(&token).unwrap();

		assert!(matches!(scheduler.tick(deadline(), &token, 1), Err(SchedulerError::GroupBusy(1))));
		scheduler.tick(deadline(), &token, 0).unwrap();

		scheduler.stop();
		scheduler.tick(deadline(), &token, 1).unwrap();
	}

	#[test]
	fn test_stats_report_executions() {
		let scheduler = Scheduler::with_config(1, SchedulerConfig::new().record_actor_timings(true));
		scheduler.set_periodic_ticking_thread(0).unwrap();
		let cell = marker("a", Arc::default());
		scheduler.add(cell.clone(), None).unwrap();

		let token = CancellationToken::new();
		scheduler.tick(deadline(), &token, 0).unwrap();

		let stats = scheduler.stats();
		assert_eq!(stats.groups.len(), 1);
		assert!(stats.groups[0].cooperative);
		assert_eq!(stats.groups[0].residents, vec![cell.actor_ref()]);
		let actor = stats.actor(cell.actor_ref()).unwrap();
		assert_eq!(actor.executions, 1);
		assert_eq!(actor.group, 0);

		scheduler.shutdown();
	}
}
