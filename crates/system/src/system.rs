// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The actor system.
//!
//! The system owns the actor graph and its lifecycle. The graph can only
//! change while the system is stopped; while it runs the scheduler ticks the
//! actors and a small async runtime drives their async components.

use std::{
	panic::{self, AssertUnwindSafe},
	sync::Arc,
};

use indexmap::IndexMap;
use parking_lot::MappedMutexGuard;
use tessera_runtime::{
	Actor, ActorCell, ActorHandle, ActorKind, ActorRef, CancellationToken, MAIN_THREAD_GROUP, Scheduler,
	actor::Tickable,
};
use tokio::{runtime::Runtime, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
	components::Components,
	config::ActorSystemConfig,
	dependencies::Dependencies,
	driver,
	error::{ActorSystemError, ComponentError, Result},
};

struct ActorEntry {
	cell: Arc<ActorCell>,
	components: Components,
	task: Option<JoinHandle<std::result::Result<(), ComponentError>>>,
}

pub struct ActorSystem {
	scheduler: Scheduler,
	config: ActorSystemConfig,
	runtime: Runtime,
	running: bool,
	token: CancellationToken,
	actors: IndexMap<ActorRef, ActorEntry>,
	dependencies: Dependencies,
}

impl ActorSystem {
	pub fn new(scheduler: Scheduler) -> Result<Self> {
		Self::with_config(scheduler, ActorSystemConfig::default())
	}

	pub fn with_config(scheduler: Scheduler, config: ActorSystemConfig) -> Result<Self> {
		let runtime = tokio::runtime::Builder::new_multi_thread()
			.worker_threads(config.async_worker_threads.max(1))
			.thread_name("tessera-async")
			.enable_time()
			.build()
			.map_err(ActorSystemError::Runtime)?;

		Ok(Self {
			scheduler,
			config,
			runtime,
			running: false,
			token: CancellationToken::new(),
			actors: IndexMap::new(),
			dependencies: Dependencies::new(),
		})
	}

	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	/// Token of the current (or last) run.
	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn len(&self) -> usize {
		self.actors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.actors.is_empty()
	}

	pub fn contains(&self, actor: ActorRef) -> bool {
		self.actors.contains_key(&actor)
	}

	/// Register an actor and its components.
	///
	/// Runs the actor's initialize hook and places it: actors bound to the main
	/// thread on group 0, every other actor through the scheduler's placement.
	pub fn add<S: ActorKind>(&mut self, actor: Actor<S>, components: Components) -> Result<ActorHandle> {
		if self.running {
			return Err(ActorSystemError::Running);
		}

		let handle = actor.handle();
		let actor_ref = handle.actor_ref();
		if self.actors.contains_key(&actor_ref) {
			return Err(ActorSystemError::DuplicateActor(actor_ref));
		}

		let cell = ActorCell::new(actor);
		run_hook(&cell, "initialize", |actor| actor.initialize());

		let placement = cell.is_bound_to_main_thread().then_some(MAIN_THREAD_GROUP);
		let group = self.scheduler.add(cell.clone(), placement)?;

		debug!(actor = %actor_ref, group, components = components.len(), "actor added");
		self.actors.insert(
			actor_ref,
			ActorEntry {
				cell,
				components,
				task: None,
			},
		);
		Ok(handle)
	}

	/// Unregister an actor, running its shutdown hook.
	pub fn remove(&mut self, actor: ActorRef) -> Result<()> {
		if self.running {
			return Err(ActorSystemError::Running);
		}

		let Some(entry) = self.actors.shift_remove(&actor) else {
			return Err(ActorSystemError::UnknownActor(actor));
		};

		self.scheduler.remove(actor);
		run_hook(&entry.cell, "shutdown", |actor| actor.shutdown());

		debug!(actor = %actor, "actor removed");
		Ok(())
	}

	/// Start the system. Calling it on a running system does nothing.
	///
	/// Runs every start hook, starts the scheduler's worker threads and spawns
	/// one background task per actor with async components. If the scheduler
	/// cannot start, the stop hooks run before the error is returned.
	pub fn start(&mut self) -> Result<()> {
		if self.running {
			return Ok(());
		}

		self.token = CancellationToken::new();
		for entry in self.actors.values() {
			run_hook(&entry.cell, "start", |actor| actor.start());
		}

		if let Err(err) = self.scheduler.start(&self.token) {
			error!(error = %err, "scheduler failed to start");
			self.token.cancel();
			for entry in self.actors.values() {
				run_hook(&entry.cell, "stop", |actor| actor.stop());
			}
			return Err(err.into());
		}
		self.running = true;

		for (actor_ref, entry) in self.actors.iter_mut() {
			let components = entry.components.async_components();
			if components.is_empty() {
				continue;
			}
			entry.task = Some(self.runtime.spawn(driver::drive(
				*actor_ref,
				components,
				self.scheduler.clone(),
				self.token.clone(),
			)));
		}

		info!(actors = self.actors.len(), "actor system started");
		Ok(())
	}

	/// Stop the system. Calling it on a stopped system does nothing.
	///
	/// Cancels the run's token, stops the scheduler, runs every stop hook and
	/// waits up to the configured timeout for the async component tasks.
	/// Failures are logged, never returned.
	///
	/// Must not be called from within an async runtime.
	pub fn stop(&mut self) {
		if !self.running {
			return;
		}

		self.token.cancel();
		self.scheduler.stop();

		for entry in self.actors.values() {
			run_hook(&entry.cell, "stop", |actor| actor.stop());
		}

		let tasks: Vec<_> =
			self.actors.iter_mut().filter_map(|(actor_ref, entry)| Some((*actor_ref, entry.task.take()?))).collect();
		let deadline = tokio::time::Instant::now() + self.config.stop_timeout;

		self.runtime.block_on(async {
			for (actor_ref, mut task) in tasks {
				match tokio::time::timeout_at(deadline, &mut task).await {
					Ok(Ok(Ok(()))) => {}
					Ok(Ok(Err(err))) if err.is_cancelled() => {}
					Ok(Ok(Err(err))) => {
						error!(actor = %actor_ref, error = %err, "async components failed");
					}
					Ok(Err(err)) if err.is_cancelled() => {}
					Ok(Err(err)) => {
						error!(actor = %actor_ref, error = %err, "async component task panicked");
					}
					Err(_) => {
						warn!(actor = %actor_ref, "async components did not stop in time");
						task.abort();
					}
				}
			}
		});

		self.running = false;
		info!("actor system stopped");
	}

	/// Stop the system, remove every actor, shut the scheduler down and dispose
	/// the dependencies.
	pub fn shutdown(&mut self) {
		self.stop();

		let actors: Vec<_> = self.actors.keys().copied().collect();
		for actor in actors {
			if let Err(err) = self.remove(actor) {
				error!(actor = %actor, error = %err, "failed to remove actor");
			}
		}

		self.scheduler.shutdown();
		std::mem::take(&mut self.dependencies).dispose();
		info!("actor system shut down");
	}

	/// The state of the first actor whose state is an `S`.
	pub fn find_actor_state<S: 'static>(&self) -> Option<MappedMutexGuard<'_, S>> {
		self.actors.values().find(|entry| entry.cell.holds::<S>()).and_then(|entry| entry.cell.state::<S>())
	}

	pub fn find_actor_handle<S: 'static>(&self) -> Option<ActorHandle> {
		self.actors.values().find(|entry| entry.cell.holds::<S>()).map(|entry| entry.cell.handle())
	}

	/// Components registered with `actor`.
	pub fn components(&self, actor: ActorRef) -> Option<&Components> {
		self.actors.get(&actor).map(|entry| &entry.components)
	}

	/// Replace the shared dependencies, disposing the previous ones.
	pub fn set_dependencies(&mut self, dependencies: Dependencies) {
		std::mem::replace(&mut self.dependencies, dependencies).dispose();
	}

	pub fn dependency<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.dependencies.get::<T>()
	}
}

impl Drop for ActorSystem {
	fn drop(&mut self) {
		self.stop();
	}
}

fn run_hook(cell: &ActorCell, hook: &'static str, f: impl FnOnce(&mut dyn Tickable)) {
	let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
		let mut actor = cell.lock();
		f(actor.as_mut());
	}));
	if outcome.is_err() {
		error!(actor = %cell.name(), hook, "lifecycle hook panicked");
	}
}
