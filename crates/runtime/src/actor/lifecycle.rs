// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actors built from a state value and a set of lifecycle callbacks.

use std::{any::Any, fmt, time::Instant};

use crate::actor::{
	context::CancellationToken,
	id::{ActorHandle, ActorRef},
	traits::{ActorKind, Behavior, TickResult, Tickable},
};

type Hook<S> = Box<dyn FnMut(&mut S) + Send>;
type TickFn<S> = Box<dyn FnMut(&mut S, Instant, &CancellationToken) -> TickResult + Send>;

/// Lifecycle callbacks of an actor whose state is `S`.
///
/// Only the tick function is mandatory, every other hook defaults to a no-op.
pub struct Lifecycle<S> {
	initialize: Option<Hook<S>>,
	start: Option<Hook<S>>,
	stop: Option<Hook<S>>,
	shutdown: Option<Hook<S>>,
	tick: TickFn<S>,
}

impl<S: 'static> Lifecycle<S> {
	pub fn new<F>(tick: F) -> Self
	where
		F: FnMut(&mut S, Instant, &CancellationToken) -> TickResult + Send + 'static,
	{
		Self {
			initialize: None,
			start: None,
			stop: None,
			shutdown: None,
			tick: Box::new(tick),
		}
	}

	pub fn on_initialize(mut self, hook: impl FnMut(&mut S) + Send + 'static) -> Self {
		self.initialize = Some(Box::new(hook));
		self
	}

	pub fn on_start(mut self, hook: impl FnMut(&mut S) + Send + 'static) -> Self {
		self.start = Some(Box::new(hook));
		self
	}

	pub fn on_stop(mut self, hook: impl FnMut(&mut S) + Send + 'static) -> Self {
		self.stop = Some(Box::new(hook));
		self
	}

	pub fn on_shutdown(mut self, hook: impl FnMut(&mut S) + Send + 'static) -> Self {
		self.shutdown = Some(Box::new(hook));
		self
	}
}

impl<S: Behavior> Lifecycle<S> {
	/// Callbacks forwarding to the state's own [`Behavior`] implementation.
	pub fn from_behavior() -> Self {
		Self::new(|state: &mut S, deadline, token| state.tick(deadline, token))
			.on_initialize(S::initialize)
			.on_start(S::start)
			.on_stop(S::stop)
			.on_shutdown(S::shutdown)
	}
}

/// An actor: an owned state plus the callbacks that drive it.
pub struct Actor<S> {
	handle: ActorHandle,
	state: S,
	lifecycle: Lifecycle<S>,
}

impl<S: ActorKind> Actor<S> {
	pub fn new(state: S, lifecycle: Lifecycle<S>) -> Self {
		Self {
			handle: ActorHandle::next(ActorRef::of::<S>()),
			state,
			lifecycle,
		}
	}

	/// Qualify the actor's ref with a label so it can share a state type with
	/// another actor of the same graph.
	pub fn labelled(mut self, label: &'static str) -> Self {
		self.handle = ActorHandle::next(ActorRef::named::<S>(label));
		self
	}

	pub fn handle(&self) -> ActorHandle {
		self.handle
	}

	pub fn actor_ref(&self) -> ActorRef {
		self.handle.actor_ref()
	}

	pub fn state(&self) -> &S {
		&self.state
	}

	pub fn state_mut(&mut self) -> &mut S {
		&mut self.state
	}
}

impl<S: Behavior> From<S> for Actor<S> {
	fn from(state: S) -> Self {
		Actor::new(state, Lifecycle::from_behavior())
	}
}

impl<S: ActorKind> Tickable for Actor<S> {
	fn initialize(&mut self) {
		if let Some(hook) = self.lifecycle.initialize.as_mut() {
			hook(&mut self.state);
		}
	}

	fn start(&mut self) {
		if let Some(hook) = self.lifecycle.start.as_mut() {
			hook(&mut self.state);
		}
	}

	fn tick(&mut self, deadline: Instant, token: &CancellationToken) -> TickResult {
		(self.lifecycle.tick)(&mut self.state, deadline, token)
	}

	fn stop(&mut self) {
		if let Some(hook) = self.lifecycle.stop.as_mut() {
			hook(&mut self.state);
		}
	}

	fn shutdown(&mut self) {
		if let Some(hook) = self.lifecycle.shutdown.as_mut() {
			hook(&mut self.state);
		}
	}

	fn state(&self) -> &dyn Any {
		&self.state
	}

	fn state_mut(&mut self) -> &mut dyn Any {
		&mut self.state
	}
}

impl<S> fmt::Debug for Actor<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Actor").field("handle", &self.handle).finish_non_exhaustive()
	}
}
