// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use tessera_runtime::{
	Actor, ActorKind, ActorRef, Behavior, CancellationToken, Lifecycle, MAIN_THREAD_GROUP, Scheduler,
	SchedulerConfig, SchedulerError, TickResult,
};
use tessera_system::{ActorSystem, ActorSystemError, Components, Dependencies, Disposable};

type Journal = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

struct Renderer {
	journal: Journal,
	frames: u32,
}

impl ActorKind for Renderer {
	const BOUND_TO_MAIN_THREAD: bool = true;
}

impl Behavior for Renderer {
	fn initialize(&mut self) {
		self.journal.lock().unwrap().push("renderer:initialize".into());
	}

	fn start(&mut self) {
		self.journal.lock().unwrap().push("renderer:start".into());
	}

	fn tick(&mut self, _deadline: Instant, _token: &CancellationToken) -> TickResult {
		self.frames += 1;
		TickResult::Completed
	}

	fn stop(&mut self) {
		self.journal.lock().unwrap().push("renderer:stop".into());
	}

	fn shutdown(&mut self) {
		self.journal.lock().unwrap().push("renderer:shutdown".into());
	}
}

struct Physics {
	steps: u32,
}

impl ActorKind for Physics {}

fn physics() -> Actor<Physics> {
	Actor::new(
		Physics {
			steps: 0,
		},
		Lifecycle::new(|physics: &mut Physics, _, _| {
			physics.steps += 1;
			TickResult::Completed
		}),
	)
}

fn system(cores: usize) -> ActorSystem {
	init_tracing();
	let scheduler = Scheduler::new(cores);
	scheduler.set_periodic_ticking_thread(MAIN_THREAD_GROUP).unwrap();
	ActorSystem::new(scheduler).unwrap()
}

fn renderer(journal: &Journal) -> Actor<Renderer> {
	Renderer {
		journal: journal.clone(),
		frames: 0,
	}
	.into()
}

#[test]
fn test_topology_is_frozen_while_running() {
	let mut system = system(2);
	system.add(physics(), Components::new()).unwrap();
	system.start().unwrap();

	let journal = Journal::default();
	assert!(matches!(system.add(renderer(&journal), Components::new()), Err(ActorSystemError::Running)));
	assert!(matches!(system.remove(ActorRef::of::<Physics>()), Err(ActorSystemError::Running)));
	assert_eq!(system.len(), 1);
	assert!(system.contains(ActorRef::of::<Physics>()));
	assert!(journal.lock().unwrap().is_empty());

	system.stop();
	system.add(renderer(&journal), Components::new()).unwrap();
	assert_eq!(system.len(), 2);
}

#[test]
fn test_duplicate_and_unknown_actors() {
	let mut system = system(2);
	system.add(physics(), Components::new()).unwrap();

	assert!(matches!(
		system.add(physics(), Components::new()),
		Err(ActorSystemError::DuplicateActor(actor)) if actor == ActorRef::of::<Physics>()
	));
	system.add(physics().labelled("secondary"), Components::new()).unwrap();
	assert_eq!(system.len(), 2);

	let journal = Journal::default();
	assert!(matches!(
		system.remove(ActorRef::of::<Renderer>()),
		Err(ActorSystemError::UnknownActor(_))
	));
	assert!(journal.lock().unwrap().is_empty());
}

#[test]
fn test_lifecycle_hooks_in_order() {
	let journal = Journal::default();
	let mut system = system(2);
	system.add(renderer(&journal), Components::new()).unwrap();
	assert_eq!(system.scheduler().group_of(ActorRef::of::<Renderer>()), Some(MAIN_THREAD_GROUP));

	system.start().unwrap();
	system.start().unwrap();
	system.stop();
	system.stop();
	system.remove(ActorRef::of::<Renderer>()).unwrap();

	assert_eq!(
		*journal.lock().unwrap(),
		vec!["renderer:initialize", "renderer:start", "renderer:stop", "renderer:shutdown"]
	);
}

#[test]
fn test_main_thread_actor_ticks_on_host() {
	let journal = Journal::default();
	let mut system = system(2);
	system.add(renderer(&journal), Components::new()).unwrap();
	system.add(physics(), Components::new()).unwrap();
	system.start().unwrap();

	let token = system.token().clone();
	for _ in 0..5 {
		system.scheduler().tick(Instant::now() + Duration::from_millis(16), &token, MAIN_THREAD_GROUP).unwrap();
		system.scheduler().awake_actor(ActorRef::of::<Renderer>());
	}
	system.stop();

	assert_eq!(system.find_actor_state::<Renderer>().map(|r| r.frames), Some(5));
	assert_eq!(system.scheduler().group_of(ActorRef::of::<Physics>()), Some(1));
}

#[test]
fn test_remove_after_stop_cleans_every_registry() {
	let journal = Journal::default();
	let mut system = system(2);
	system.add(renderer(&journal), Components::new()).unwrap();
	system.add(physics(), Components::new()).unwrap();

	system.start().unwrap();
	system.stop();
	system.remove(ActorRef::of::<Renderer>()).unwrap();

	let shutdowns = journal.lock().unwrap().iter().filter(|entry| *entry == "renderer:shutdown").count();
	assert_eq!(shutdowns, 1);
	assert!(!system.contains(ActorRef::of::<Renderer>()));
	assert!(!system.scheduler().contains(ActorRef::of::<Renderer>()));
	for index in 0..system.scheduler().group_count() {
		assert!(!system.scheduler().resident_actors(index).unwrap().contains(&ActorRef::of::<Renderer>()));
	}
	assert!(system.find_actor_state::<Renderer>().is_none());
	assert!(system.find_actor_handle::<Physics>().is_some());
}

#[test]
fn test_panicking_shutdown_hook_is_contained() {
	struct Fragile;

	impl ActorKind for Fragile {}

	let mut system = system(1);
	system
		.add(
			Actor::new(
				Fragile,
				Lifecycle::new(|_: &mut Fragile, _, _| TickResult::Completed)
					.on_shutdown(|_| panic!("shutdown failed")),
			),
			Components::new(),
		)
		.unwrap();

	system.remove(ActorRef::of::<Fragile>()).unwrap();
	assert!(system.is_empty());
}

struct Pool(Journal);

impl Disposable for Pool {
	fn dispose(&self) {
		self.0.lock().unwrap().push("pool:dispose".into());
	}
}

struct Settings {
	gravity: f32,
}

#[test]
fn test_dependencies_are_disposed() {
	let journal = Journal::default();
	let mut system = system(1);

	let mut first = Dependencies::new();
	first.insert_disposable(Pool(journal.clone()));
	system.set_dependencies(first);

	let mut second = Dependencies::new();
	second.insert(Settings {
		gravity: 9.81,
	});
	second.insert_disposable(Pool(journal.clone()));
	system.set_dependencies(second);
	assert_eq!(journal.lock().unwrap().len(), 1);
	assert_eq!(system.dependency::<Settings>().map(|s| s.gravity), Some(9.81));

	system.shutdown();
	assert_eq!(journal.lock().unwrap().len(), 2);
}

#[test]
fn test_shutdown_removes_everything() {
	let journal = Journal::default();
	let mut system = system(2);
	system.add(renderer(&journal), Components::new()).unwrap();
	system.add(physics(), Components::new()).unwrap();
	system.start().unwrap();

	system.shutdown();

	assert!(!system.is_running());
	assert!(system.is_empty());
	assert!(system.scheduler().is_empty());
	assert_eq!(journal.lock().unwrap().last().map(String::as_str), Some("renderer:shutdown"));
}

struct Spinner;

impl ActorKind for Spinner {}

#[test]
fn test_inspecting_state_does_not_stall_the_group() {
	let mut system = system(2);
	let spins = Arc::new(AtomicUsize::new(0));
	let spinner = {
		let spins = spins.clone();
		Actor::new(
			Spinner,
			Lifecycle::new(move |_: &mut Spinner, _, _| {
				spins.fetch_add(1, Ordering::Relaxed);
				TickResult::Yield
			}),
		)
	};
	system.add(physics(), Components::new()).unwrap();
	system.add(spinner, Components::new()).unwrap();
	assert_eq!(system.scheduler().group_of(ActorRef::of::<Spinner>()), Some(1));
	assert_eq!(system.scheduler().group_of(ActorRef::of::<Physics>()), Some(1));
	system.start().unwrap();

	{
		let guard = system.find_actor_state::<Physics>();
		assert!(guard.is_some());
		system.scheduler().awake_actor(ActorRef::of::<Physics>());

		let before = spins.load(Ordering::Relaxed);
		let mut attempts = 0;
		while spins.load(Ordering::Relaxed) < before + 3 && attempts < 200 {
			thread::sleep(Duration::from_millis(10));
			attempts += 1;
		}
		assert!(spins.load(Ordering::Relaxed) >= before + 3, "spinner starved while physics was inspected");
	}

	let mut attempts = 0;
	while system.find_actor_state::<Physics>().map(|p| p.steps).unwrap_or(0) == 0 && attempts < 200 {
		thread::sleep(Duration::from_millis(10));
		attempts += 1;
	}
	assert!(system.find_actor_state::<Physics>().map(|p| p.steps).unwrap_or(0) >= 1);
	system.stop();
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_failed_start_runs_stop_hooks() {
	init_tracing();
	// no platform can map a worker stack this large
	let scheduler = Scheduler::with_config(2, SchedulerConfig::new().thread_stack_size(1 << 60));
	scheduler.set_periodic_ticking_thread(MAIN_THREAD_GROUP).unwrap();
	let mut system = ActorSystem::new(scheduler).unwrap();

	let journal = Journal::default();
	system.add(renderer(&journal), Components::new()).unwrap();

	let result = system.start();
	assert!(matches!(
		result,
		Err(ActorSystemError::Scheduler(SchedulerError::ThreadSpawn {
			index: 1,
			..
		}))
	));
	assert!(!system.is_running());
	assert!(system.token().is_cancelled());
	assert_eq!(*journal.lock().unwrap(), vec!["renderer:initialize", "renderer:start", "renderer:stop"]);

	// the graph can still be changed and torn down
	system.remove(ActorRef::of::<Renderer>()).unwrap();
	assert_eq!(journal.lock().unwrap().last().map(String::as_str), Some("renderer:shutdown"));
}
