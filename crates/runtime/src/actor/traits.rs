// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Core actor traits and associated types.
//!
//! This module defines the abstractions the scheduler works with:
//! - [`ActorKind`]: Declarative per-state-type attributes
//! - [`Behavior`]: Lifecycle hooks implemented directly on the state type
//! - [`Tickable`]: The type-erased view the scheduler ticks
//! - [`TickResult`]: What a tick reports back to its execution group

use std::{any::Any, time::Instant};

use crate::actor::context::CancellationToken;

/// What the actor reports after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
	/// All pending work was drained. The actor sleeps until it is awakened.
	Completed,

	/// The deadline was reached with work left over. The actor stays ready and
	/// the rest of the execution group's cycle is given up.
	Yield,
}

impl TickResult {
	pub fn is_completed(self) -> bool {
		matches!(self, TickResult::Completed)
	}
}

/// Declarative attributes of an actor state type.
///
/// ```ignore
/// struct Renderer { /* ... */ }
///
/// impl ActorKind for Renderer {
///     const BOUND_TO_MAIN_THREAD: bool = true;
/// }
/// ```
pub trait ActorKind: Send + 'static {
	/// Actors of this type always run on execution group 0, the group the
	/// host's main thread drives.
	const BOUND_TO_MAIN_THREAD: bool = false;

	/// Name used in logs and stats. Empty means the state type's name.
	const DISPLAY_NAME: &'static str = "";
}

/// Lifecycle implemented directly on an actor's state.
///
/// # Lifecycle
///
/// 1. `initialize()` - Called when the actor is added to the system
/// 2. `start()` - Called each time the system starts
/// 3. `tick()` - Called by the owning execution group while the actor is ready
/// 4. `stop()` - Called each time the system stops
/// 5. `shutdown()` - Called when the actor is removed
pub trait Behavior: ActorKind + Sized {
	fn initialize(&mut self) {}

	fn start(&mut self) {}

	/// Process pending work until it is drained or `deadline` passes.
	fn tick(&mut self, deadline: Instant, token: &CancellationToken) -> TickResult;

	fn stop(&mut self) {}

	fn shutdown(&mut self) {}
}

/// Type-erased actor as seen by the scheduler and the actor system.
pub trait Tickable: Send {
	fn initialize(&mut self);

	fn start(&mut self);

	fn tick(&mut self, deadline: Instant, token: &CancellationToken) -> TickResult;

	fn stop(&mut self);

	fn shutdown(&mut self);

	fn state(&self) -> &dyn Any;

	fn state_mut(&mut self) -> &mut dyn Any;
}
