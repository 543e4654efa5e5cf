// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Drives a small actor graph the way a game host would: the main thread
//! ticks group 0 once per frame while a worker thread runs the simulation.

use std::{
	thread,
	time::{Duration, Instant},
};

use futures_util::future::BoxFuture;
use tessera_runtime::{
	Actor, ActorKind, ActorRef, Behavior, CancellationToken, MAIN_THREAD_GROUP, Scheduler, SchedulerConfig,
	TickResult,
};
use tessera_system::{
	ActorSystem, ActorSystemError, AsyncComponent, ComponentError, Components, WaitResult,
	net::{self, NetInbox, NetSender},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_TIME: Duration = Duration::from_millis(16);
const FRAMES: u64 = 120;

/// Main-thread actor: publishes one input sample per frame.
struct Input {
	frame: u64,
	simulation: NetSender<u64>,
}

impl ActorKind for Input {
	const BOUND_TO_MAIN_THREAD: bool = true;
}

impl Behavior for Input {
	fn tick(&mut self, _deadline: Instant, _token: &CancellationToken) -> TickResult {
		self.frame += 1;
		if self.simulation.send(self.frame).is_err() {
			warn!(frame = self.frame, "simulation inbox closed");
		}
		TickResult::Completed
	}
}

/// Background actor: folds input samples into its state.
struct Simulation {
	inbox: NetInbox<u64>,
	processed: u64,
	checksum: u64,
}

impl ActorKind for Simulation {
	const DISPLAY_NAME: &'static str = "simulation";
}

impl Behavior for Simulation {
	fn tick(&mut self, deadline: Instant, _token: &CancellationToken) -> TickResult {
		let Simulation {
			inbox,
			processed,
			checksum,
		} = self;
		inbox.drain_until(deadline, |sample| {
			*processed += 1;
			*checksum = checksum.wrapping_mul(31).wrapping_add(sample);
		})
	}

	fn shutdown(&mut self) {
		info!(processed = self.processed, checksum = self.checksum, "simulation finished");
	}
}

/// Wakes the simulation periodically even when no input arrives.
struct Heartbeat {
	period: Duration,
}

impl AsyncComponent for Heartbeat {
	fn wait<'a>(&'a self, token: &'a CancellationToken) -> BoxFuture<'a, Result<WaitResult, ComponentError>> {
		Box::pin(async move {
			tokio::select! {
				_ = token.cancelled() => Err(ComponentError::Cancelled),
				_ = tokio::time::sleep(self.period) => Ok(WaitResult::Continuing),
			}
		})
	}
}

fn main() -> Result<(), ActorSystemError> {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.try_init();

	let scheduler = Scheduler::with_available_parallelism(SchedulerConfig::new().record_actor_timings(true));
	scheduler.set_periodic_ticking_thread(MAIN_THREAD_GROUP)?;

	let mut system = ActorSystem::new(scheduler)?;
	let (to_simulation, inbox) = net::channel(system.scheduler(), ActorRef::of::<Simulation>());

	system.add(
		Actor::from(Simulation {
			inbox,
			processed: 0,
			checksum: 0,
		}),
		Components::new().with_async(Heartbeat {
			period: Duration::from_millis(250),
		}),
	)?;
	system.add(
		Actor::from(Input {
			frame: 0,
			simulation: to_simulation,
		}),
		Components::new(),
	)?;

	system.start()?;
	let token = system.token().clone();

	for _ in 0..FRAMES {
		let frame_start = Instant::now();
		system.scheduler().awake_actor(ActorRef::of::<Input>());
		system.scheduler().tick(frame_start + FRAME_TIME, &token, MAIN_THREAD_GROUP)?;

		let elapsed = frame_start.elapsed();
		if elapsed < FRAME_TIME {
			thread::sleep(FRAME_TIME - elapsed);
		}
	}

	system.stop();

	if let Some(simulation) = system.find_actor_state::<Simulation>() {
		info!(processed = simulation.processed, pending = simulation.inbox.len(), "after stop");
	}
	for group in system.scheduler().stats().groups {
		info!(group = group.index, cooperative = group.cooperative, load = group.load_factor, residents = group.residents.len(), "group");
	}

	system.shutdown();
	Ok(())
}
