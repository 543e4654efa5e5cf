// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scheduler-side bookkeeping for one actor.

use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
	},
	time::{Duration, Instant},
};

use tracing::error;

use crate::actor::{ActorCell, ActorRef, CancellationToken, TickResult};

pub(crate) struct ScheduledActor {
	cell: Arc<ActorCell>,
	owner: AtomicUsize,
	ready: AtomicBool,
	removing: AtomicBool,
	/// Executions since the actor arrived in its current group.
	executions: AtomicU64,
	/// Cycles observed since the actor arrived in its current group.
	cycles: AtomicU64,
	total_executions: AtomicU64,
	busy_nanos: AtomicU64,
	panics: AtomicU64,
}

impl ScheduledActor {
	pub(crate) fn new(cell: Arc<ActorCell>, owner: usize) -> Self {
		Self {
			cell,
			owner: AtomicUsize::new(owner),
			ready: AtomicBool::new(true),
			removing: AtomicBool::new(false),
			executions: AtomicU64::new(0),
			cycles: AtomicU64::new(0),
			total_executions: AtomicU64::new(0),
			busy_nanos: AtomicU64::new(0),
			panics: AtomicU64::new(0),
		}
	}

	pub(crate) fn cell(&self) -> &Arc<ActorCell> {
		&self.cell
	}

	pub(crate) fn actor_ref(&self) -> ActorRef {
		self.cell.actor_ref()
	}

	pub(crate) fn name(&self) -> &'static str {
		self.cell.name()
	}

	pub(crate) fn owner(&self) -> usize {
		self.owner.load(Ordering::Acquire)
	}

	pub(crate) fn set_owner(&self, index: usize) {
		self.owner.store(index, Ordering::Release);
	}

	pub(crate) fn mark_ready(&self) {
		self.ready.store(true, Ordering::Release);
	}

	/// Clears the ready flag, returning whether it was set.
	pub(crate) fn take_ready(&self) -> bool {
		self.ready.swap(false, Ordering::AcqRel)
	}

	/// Flags the actor for removal, returning `false` if it already was.
	pub(crate) fn begin_removal(&self) -> bool {
		!self.removing.swap(true, Ordering::AcqRel)
	}

	pub(crate) fn is_removing(&self) -> bool {
		self.removing.load(Ordering::Acquire)
	}

	pub(crate) fn reset_counters(&self) {
		self.executions.store(0, Ordering::Relaxed);
		self.cycles.store(0, Ordering::Relaxed);
	}

	pub(crate) fn executions(&self) -> u64 {
		self.executions.load(Ordering::Relaxed)
	}

	pub(crate) fn cycles(&self) -> u64 {
		self.cycles.load(Ordering::Relaxed)
	}

	pub(crate) fn count_cycle(&self) {
		self.cycles.fetch_add(1, Ordering::Relaxed);
	}

	/// Executions per observed cycle since arriving in the current group.
	pub(crate) fn activity(&self) -> f64 {
		let cycles = self.cycles();
		if cycles == 0 {
			return 0.0;
		}
		self.executions() as f64 / cycles as f64
	}

	pub(crate) fn total_executions(&self) -> u64 {
		self.total_executions.load(Ordering::Relaxed)
	}

	pub(crate) fn busy(&self) -> Duration {
		Duration::from_nanos(self.busy_nanos.load(Ordering::Relaxed))
	}

	pub(crate) fn panics(&self) -> u64 {
		self.panics.load(Ordering::Relaxed)
	}

	/// Runs one tick of the actor. A panicking tick is logged and reported as
	/// completed, leaving the actor asleep until it is awakened again.
	///
	/// Returns `None` without ticking when the actor's state is held elsewhere.
	pub(crate) fn run_tick(&self, deadline: Instant, token: &CancellationToken) -> Option<TickResult> {
		let mut actor = self.cell.try_lock()?;
		self.executions.fetch_add(1, Ordering::Relaxed);
		self.total_executions.fetch_add(1, Ordering::Relaxed);

		let started = Instant::now();
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| actor.tick(deadline, token)));
		drop(actor);
		let busy = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
		self.busy_nanos.fetch_add(busy, Ordering::Relaxed);

		match outcome {
			Ok(result) => Some(result),
			Err(payload) => {
				self.panics.fetch_add(1, Ordering::Relaxed);
				error!(actor = %self.name(), panic = %panic_message(payload.as_ref()), "actor tick panicked");
				Some(TickResult::Completed)
			}
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.as_str()
	} else {
		"unknown panic payload"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::actor::{Actor, ActorKind, Lifecycle};

	struct Faulty;

	impl ActorKind for Faulty {}

	#[test]
	fn test_panicking_tick_is_contained() {
		let cell = ActorCell::new(Actor::new(Faulty, Lifecycle::new(|_: &mut Faulty, _, _| panic!("boom"))));
		let actor = ScheduledActor::new(cell, 1);

		let result = actor.run_tick(Instant::now(), &CancellationToken::new());

		assert_eq!(result, Some(TickResult::Completed));
		assert_eq!(actor.panics(), 1);
		assert_eq!(actor.total_executions(), 1);
		// the lock is released after a panicking tick
		assert!(actor.cell().state::<Faulty>().is_some());
	}

	#[test]
	fn test_activity() {
		let cell = ActorCell::new(Actor::new(Faulty, Lifecycle::new(|_: &mut Faulty, _, _| TickResult::Completed)));
		let actor = ScheduledActor::new(cell, 1);
		assert_eq!(actor.activity(), 0.0);

		for _ in 0..4 {
			actor.count_cycle();
		}
		actor.run_tick(Instant::now(), &CancellationToken::new());
		assert_eq!(actor.activity(), 0.25);

		actor.reset_counters();
		assert_eq!(actor.executions(), 0);
		assert_eq!(actor.cycles(), 0);
		assert_eq!(actor.total_executions(), 1);
	}

	#[test]
	fn test_held_state_skips_the_tick() {
		let cell = ActorCell::new(Actor::new(Faulty, Lifecycle::new(|_: &mut Faulty, _, _| TickResult::Completed)));
		let actor = ScheduledActor::new(cell, 1);

		let guard = actor.cell().state::<Faulty>();
		assert!(guard.is_some());
		assert_eq!(actor.run_tick(Instant::now(), &CancellationToken::new()), None);
		assert_eq!(actor.total_executions(), 0);

		drop(guard);
		assert_eq!(actor.run_tick(Instant::now(), &CancellationToken::new()), Some(TickResult::Completed));
		assert_eq!(actor.total_executions(), 1);
	}

	#[test]
	fn test_removal_flag_is_set_once() {
		let cell = ActorCell::new(Actor::new(Faulty, Lifecycle::new(|_: &mut Faulty, _, _| TickResult::Completed)));
		let actor = ScheduledActor::new(cell, 1);
		assert!(actor.begin_removal());
		assert!(!actor.begin_removal());
		assert!(actor.is_removing());
	}
}
