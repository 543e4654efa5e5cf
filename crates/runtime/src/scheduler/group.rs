// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Execution groups.
//!
//! A group owns a set of resident actors and ticks them cooperatively, one
//! cycle at a time. Groups never share residents: actors move between groups
//! only through [`ThreadMessage`]s, either on behalf of the control plane
//! (add/remove) or through work stealing between worker groups.
//!
//! A cycle runs in three steps:
//! 1. maybe ask an overloaded group to donate an actor
//! 2. drain the inbound queues
//! 3. tick ready residents round-robin until the deadline forces a yield

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread::JoinHandle,
	time::Instant,
};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, trace};

use crate::{
	actor::{ActorRef, CancellationToken, TickResult},
	error::{Result, SchedulerError},
	scheduler::{
		actor::ScheduledActor,
		load::{LoadFactor, LoadSamples, SAMPLE_SIZE},
		message::ThreadMessage,
	},
	sync::{Signal, SwsrQueue},
};

/// Cycles to wait between two steal requests.
const STEAL_REQUEST_INTERVAL: u64 = 3;

/// A group whose worst recent sample exceeds this does not try to steal.
const LOCAL_LOAD_CEILING: f32 = 0.80;

/// A group is a steal target once its smoothed load exceeds this.
const REMOTE_LOAD_THRESHOLD: f32 = 0.90;

/// Cycles a group must wait after donating before it donates again.
const DONATION_COOLDOWN: u64 = SAMPLE_SIZE as u64;

/// Cycles of history an actor needs before it may be donated.
const DONATION_MIN_HISTORY: u64 = 2 * SAMPLE_SIZE as u64;

pub(crate) struct ExecutionGroup {
	index: usize,
	cooperative: AtomicBool,
	/// One queue per sending group, indexed by the sender.
	inbound: Box<[SwsrQueue<ThreadMessage>]>,
	signal: Signal,
	load: LoadFactor,
	resident_count: AtomicUsize,
	residents: Mutex<Vec<ActorRef>>,
	running: AtomicBool,
	stopping: AtomicBool,
	worker: Mutex<GroupWorker>,
	thread: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionGroup {
	pub(crate) fn new(index: usize, senders: usize) -> Self {
		Self {
			index,
			cooperative: AtomicBool::new(false),
			inbound: (0..senders).map(|_| SwsrQueue::new()).collect(),
			signal: Signal::default(),
			load: LoadFactor::default(),
			resident_count: AtomicUsize::new(0),
			residents: Mutex::new(Vec::new()),
			running: AtomicBool::new(false),
			stopping: AtomicBool::new(false),
			worker: Mutex::new(GroupWorker::new(index)),
			thread: Mutex::new(None),
		}
	}

	pub(crate) fn index(&self) -> usize {
		self.index
	}

	pub(crate) fn is_cooperative(&self) -> bool {
		self.cooperative.load(Ordering::Acquire)
	}

	pub(crate) fn set_cooperative(&self) {
		self.cooperative.store(true, Ordering::Release);
	}

	pub(crate) fn load_factor(&self) -> f32 {
		self.load.get()
	}

	pub(crate) fn resident_count(&self) -> usize {
		self.resident_count.load(Ordering::Acquire)
	}

	pub(crate) fn resident_actors(&self) -> Vec<ActorRef> {
		self.residents.lock().clone()
	}

	pub(crate) fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	pub(crate) fn is_stopping(&self) -> bool {
		self.stopping.load(Ordering::Acquire)
	}

	pub(crate) fn signal(&self) -> &Signal {
		&self.signal
	}

	/// Enqueues `message` on the lane reserved for group `from` and wakes the
	/// group.
	pub(crate) fn post(&self, from: usize, message: ThreadMessage) {
		trace!(group = self.index, from, message = ?message, "post");
		self.inbound[from].try_enqueue(message);
		self.signal.set();
	}

	/// Pops one message from the lane reserved for group `from`.
	pub(crate) fn try_receive(&self, from: usize) -> Option<ThreadMessage> {
		self.inbound[from].try_dequeue()
	}

	/// Runs one cooperative cycle on the calling thread.
	pub(crate) fn tick(&self, groups: &[ExecutionGroup], deadline: Instant, token: &CancellationToken) -> Result<()> {
		if self.is_running() {
			return Err(SchedulerError::GroupBusy(self.index));
		}
		self.worker.lock().cycle(groups, deadline, token);
		Ok(())
	}

	/// Applies pending control messages if nobody is driving the group right
	/// now. Never executes actors.
	pub(crate) fn settle(&self, groups: &[ExecutionGroup]) {
		if let Some(mut worker) = self.worker.try_lock() {
			worker.drain(groups);
		}
	}

	/// Exclusive access to the worker for a dedicated thread.
	pub(crate) fn lock_worker(&self) -> MutexGuard<'_, GroupWorker> {
		self.worker.lock()
	}

	pub(crate) fn attach_thread(&self, handle: JoinHandle<()>) {
		*self.thread.lock() = Some(handle);
	}

	pub(crate) fn mark_running(&self) {
		self.stopping.store(false, Ordering::Release);
		self.running.store(true, Ordering::Release);
	}

	/// Requests the worker thread to stop and waits for it.
	pub(crate) fn stop_thread(&self) {
		let Some(handle) = self.thread.lock().take() else {
			return;
		};
		self.stopping.store(true, Ordering::Release);
		self.signal.set();
		if handle.join().is_err() {
			error!(group = self.index, "worker thread panicked");
		}
		self.mark_stopped();
	}

	pub(crate) fn mark_stopped(&self) {
		self.running.store(false, Ordering::Release);
		self.stopping.store(false, Ordering::Release);
	}

	fn publish(&self, residents: &[Arc<ScheduledActor>]) {
		self.resident_count.store(residents.len(), Ordering::Release);
		*self.residents.lock() = residents.iter().map(|actor| actor.actor_ref()).collect();
	}
}

/// Outcome of one execution pass.
#[derive(Debug, Default)]
struct Pass {
	/// An actor yielded, so work is left.
	yielded: bool,
	/// An actor was skipped because its state was held elsewhere.
	deferred: bool,
}

/// State only the current driver of a group touches.
pub(crate) struct GroupWorker {
	index: usize,
	residents: Vec<Arc<ScheduledActor>>,
	cursor: usize,
	cycles_since_donation: u64,
	cycles_since_steal_request: u64,
	steal_pending: bool,
	samples: LoadSamples,
}

impl GroupWorker {
	fn new(index: usize) -> Self {
		Self {
			index,
			residents: Vec::new(),
			cursor: 0,
			cycles_since_donation: 0,
			cycles_since_steal_request: 0,
			steal_pending: false,
			samples: LoadSamples::new(),
		}
	}

	pub(crate) fn cycle(&mut self, groups: &[ExecutionGroup], deadline: Instant, token: &CancellationToken) {
		let started = Instant::now();
		let allotted = deadline.saturating_duration_since(started);
		let group = &groups[self.index];

		if !group.is_cooperative() {
			self.request_steal(groups);
		}
		self.drain(groups);
		let pass = self.execute(deadline, token);
		let drained = !pass.yielded;

		self.cycles_since_donation += 1;
		self.cycles_since_steal_request += 1;

		let sample = if !drained {
			1.0
		} else if self.residents.is_empty() {
			0.0
		} else if allotted.is_zero() {
			1.0
		} else {
			(started.elapsed().as_secs_f32() / allotted.as_secs_f32()).min(1.0)
		};
		self.samples.record(sample);
		group.load.set(self.samples.smoothed());

		if pass.yielded || pass.deferred {
			group.signal.set();
		}
	}

	fn request_steal(&mut self, groups: &[ExecutionGroup]) {
		if self.steal_pending
			|| self.cycles_since_steal_request < STEAL_REQUEST_INTERVAL
			|| self.samples.worst() > LOCAL_LOAD_CEILING
		{
			return;
		}

		let count = groups.len();
		let offset = rand::random::<u32>() as usize % count;
		for step in 0..count {
			let target = &groups[(offset + step) % count];
			if target.index == self.index || target.is_cooperative() {
				continue;
			}
			if target.load_factor() > REMOTE_LOAD_THRESHOLD && target.resident_count() > 1 {
				debug!(group = self.index, target = target.index, load = target.load_factor(), "requesting actor");
				target.post(
					self.index,
					ThreadMessage::StealActor {
						reply_to: self.index,
					},
				);
				self.steal_pending = true;
				self.cycles_since_steal_request = 0;
				return;
			}
		}
	}

	/// Processes the messages present on every inbound lane when the pass
	/// started.
	pub(crate) fn drain(&mut self, groups: &[ExecutionGroup]) {
		let group = &groups[self.index];
		let mut changed = false;

		for from in 0..group.inbound.len() {
			let pending = group.inbound[from].len();
			for _ in 0..pending {
				let Some(message) = group.try_receive(from) else {
					break;
				};
				changed |= self.handle(groups, message);
			}
		}

		if changed {
			group.publish(&self.residents);
		}
	}

	/// Returns whether the resident list changed.
	fn handle(&mut self, groups: &[ExecutionGroup], message: ThreadMessage) -> bool {
		match message {
			ThreadMessage::AddActor(actor) => {
				if self.position(&actor).is_some() {
					return false;
				}
				debug!(group = self.index, actor = %actor.name(), "actor added");
				actor.reset_counters();
				self.residents.push(actor);
				true
			}
			ThreadMessage::RemoveActor {
				reply_to,
				actor,
			} => {
				if let Some(position) = self.position(&actor) {
					self.evict(position);
					debug!(group = self.index, actor = %actor.name(), "actor removed");
					groups[reply_to].post(self.index, ThreadMessage::RemoveActorResponse(actor));
					return true;
				}

				let owner = actor.owner();
				if owner == self.index {
					// still in flight towards this group, retry next pass
					groups[self.index].post(
						self.index,
						ThreadMessage::RemoveActor {
							reply_to,
							actor,
						},
					);
				} else {
					trace!(group = self.index, owner, actor = %actor.name(), "forwarding removal");
					groups[owner].post(
						self.index,
						ThreadMessage::RemoveActor {
							reply_to,
							actor,
						},
					);
				}
				false
			}
			ThreadMessage::StealActor {
				reply_to,
			} => {
				let donated = self.select_donation().map(|position| {
					let actor = self.evict(position);
					actor.set_owner(reply_to);
					self.cycles_since_donation = 0;
					debug!(group = self.index, target = reply_to, actor = %actor.name(), "donating actor");
					actor
				});
				let changed = donated.is_some();
				groups[reply_to].post(self.index, ThreadMessage::StealActorResponse(donated));
				changed
			}
			ThreadMessage::StealActorResponse(donated) => {
				self.steal_pending = false;
				let Some(actor) = donated else {
					return false;
				};
				debug!(group = self.index, actor = %actor.name(), "adopted actor");
				actor.set_owner(self.index);
				actor.reset_counters();
				actor.mark_ready();
				self.residents.push(actor);
				true
			}
			ThreadMessage::RemoveActorResponse(actor) => {
				trace!(group = self.index, actor = %actor.name(), "ignoring removal acknowledgement");
				false
			}
		}
	}

	/// The least active resident with enough history, if this group may donate.
	fn select_donation(&self) -> Option<usize> {
		if self.cycles_since_donation < DONATION_COOLDOWN || self.residents.len() < 2 {
			return None;
		}
		self.residents
			.iter()
			.enumerate()
			.filter(|(_, actor)| actor.cycles() >= DONATION_MIN_HISTORY && !actor.is_removing())
			.min_by(|(_, a), (_, b)| a.activity().total_cmp(&b.activity()))
			.map(|(position, _)| position)
	}

	/// Ticks ready residents round-robin, stopping at the first yield. An actor
	/// whose state is held elsewhere stays ready and is skipped.
	fn execute(&mut self, deadline: Instant, token: &CancellationToken) -> Pass {
		let mut pass = Pass::default();
		let count = self.residents.len();
		if count == 0 {
			self.cursor = 0;
			return pass;
		}

		let start = self.cursor % count;
		let mut next = (start + 1) % count;

		for visit in 0..count {
			let position = (start + visit) % count;
			let actor = &self.residents[position];
			if !actor.take_ready() {
				continue;
			}
			match actor.run_tick(deadline, token) {
				Some(TickResult::Completed) => {}
				Some(TickResult::Yield) => {
					actor.mark_ready();
					pass.yielded = true;
					// a yield on the first visit was a full turn, later ones only partial
					next = if visit == 0 {
						(position + 1) % count
					} else {
						position
					};
					break;
				}
				None => {
					trace!(group = self.index, actor = %actor.name(), "actor busy, deferred");
					actor.mark_ready();
					pass.deferred = true;
				}
			}
		}

		self.cursor = next;
		for actor in &self.residents {
			actor.count_cycle();
		}
		pass
	}

	fn position(&self, actor: &Arc<ScheduledActor>) -> Option<usize> {
		self.residents.iter().position(|resident| Arc::ptr_eq(resident, actor))
	}

	fn evict(&mut self, position: usize) -> Arc<ScheduledActor> {
		let actor = self.residents.remove(position);
		if position < self.cursor {
			self.cursor -= 1;
		}
		actor
	}

	#[cfg(test)]
	pub(crate) fn residents(&self) -> &[Arc<ScheduledActor>] {
		&self.residents
	}
}
