// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared, type-erased home of one actor.

use std::{any::TypeId, fmt, sync::Arc};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::actor::{
	id::{ActorHandle, ActorRef},
	lifecycle::Actor,
	traits::{ActorKind, Tickable},
};

/// An actor with its state type erased.
///
/// The scheduler and the actor system share the cell. Only the execution group
/// that currently owns the actor ticks it; the lifecycle hooks are run by the
/// actor system while the scheduler is stopped, so the lock is uncontended in
/// steady state.
pub struct ActorCell {
	handle: ActorHandle,
	name: &'static str,
	bound_to_main_thread: bool,
	state_type: TypeId,
	inner: Mutex<Box<dyn Tickable>>,
}

impl ActorCell {
	pub fn new<S: ActorKind>(actor: Actor<S>) -> Arc<Self> {
		let handle = actor.handle();
		let name = if S::DISPLAY_NAME.is_empty() {
			handle.actor_ref().name()
		} else {
			S::DISPLAY_NAME
		};

		Arc::new(Self {
			handle,
			name,
			bound_to_main_thread: S::BOUND_TO_MAIN_THREAD,
			state_type: TypeId::of::<S>(),
			inner: Mutex::new(Box::new(actor)),
		})
	}

	pub fn handle(&self) -> ActorHandle {
		self.handle
	}

	pub fn actor_ref(&self) -> ActorRef {
		self.handle.actor_ref()
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn is_bound_to_main_thread(&self) -> bool {
		self.bound_to_main_thread
	}

	/// Whether the actor's state is an `S`.
	pub fn holds<S: 'static>(&self) -> bool {
		self.state_type == TypeId::of::<S>()
	}

	/// Exclusive access to the erased actor.
	pub fn lock(&self) -> MutexGuard<'_, Box<dyn Tickable>> {
		self.inner.lock()
	}

	/// Like [`lock`](Self::lock), but returns `None` instead of blocking while
	/// someone else holds the actor.
	pub fn try_lock(&self) -> Option<MutexGuard<'_, Box<dyn Tickable>>> {
		self.inner.try_lock()
	}

	/// Exclusive access to the actor's state, if it is an `S`.
	pub fn state<S: 'static>(&self) -> Option<MappedMutexGuard<'_, S>> {
		if !self.holds::<S>() {
			return None;
		}
		MutexGuard::try_map(self.inner.lock(), |actor| actor.state_mut().downcast_mut::<S>()).ok()
	}
}

impl fmt::Debug for ActorCell {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorCell")
			.field("handle", &self.handle)
			.field("name", &self.name)
			.field("bound_to_main_thread", &self.bound_to_main_thread)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::time::Instant;

	use super::*;
	use crate::actor::{context::CancellationToken, lifecycle::Lifecycle, traits::TickResult};

	struct Renderer {
		frames: u64,
	}

	impl ActorKind for Renderer {
		const BOUND_TO_MAIN_THREAD: bool = true;
		const DISPLAY_NAME: &'static str = "renderer";
	}

	struct Audio;

	impl ActorKind for Audio {}

	fn renderer() -> Actor<Renderer> {
		Actor::new(
			Renderer {
				frames: 0,
			},
			Lifecycle::new(|r: &mut Renderer, _, _| {
				r.frames += 1;
				TickResult::Completed
			}),
		)
	}

	#[test]
	fn test_attributes_come_from_kind() {
		let cell = ActorCell::new(renderer());
		assert!(cell.is_bound_to_main_thread());
		assert_eq!(cell.name(), "renderer");

		let audio = ActorCell::new(Actor::new(Audio, Lifecycle::new(|_: &mut Audio, _, _| TickResult::Completed)));
		assert!(!audio.is_bound_to_main_thread());
		assert_eq!(audio.name(), "Audio");
	}

	#[test]
	fn test_state_downcast() {
		let cell = ActorCell::new(renderer());
		cell.lock().tick(Instant::now(), &CancellationToken::new());

		assert_eq!(cell.state::<Renderer>().map(|r| r.frames), Some(1));
		assert!(cell.state::<Audio>().is_none());
	}
}
