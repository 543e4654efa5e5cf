// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actor identity.
//!
//! - [`ActorRef`] names an actor by its state type (plus an optional label) and
//!   is what the wiring layer and the scheduler key on.
//! - [`ActorHandle`] addresses one concrete actor instance.

use std::{
	any::{TypeId, type_name},
	cmp::Ordering,
	fmt,
	hash::{Hash, Hasher},
	sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

/// Type-level identity of an actor.
#[derive(Clone, Copy)]
pub struct ActorRef {
	type_id: TypeId,
	type_name: &'static str,
	label: &'static str,
}

impl ActorRef {
	/// The ref of the unique actor whose state is `S`.
	pub fn of<S: 'static>() -> Self {
		Self::named::<S>("")
	}

	/// The ref of an actor whose state is `S`, qualified by `label` so that two
	/// actors sharing a state type can coexist.
	pub fn named<S: 'static>(label: &'static str) -> Self {
		Self {
			type_id: TypeId::of::<S>(),
			type_name: type_name::<S>(),
			label,
		}
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Short name used in logs: the last path segment of the state type.
	pub fn name(&self) -> &'static str {
		let base = self.type_name.split('<').next().unwrap_or(self.type_name);
		base.rsplit("::").next().unwrap_or(base)
	}

	pub fn is<S: 'static>(&self) -> bool {
		self.type_id == TypeId::of::<S>()
	}
}

impl PartialEq for ActorRef {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id && self.label == other.label
	}
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.type_id.hash(state);
		self.label.hash(state);
	}
}

impl PartialOrd for ActorRef {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ActorRef {
	fn cmp(&self, other: &Self) -> Ordering {
		self.type_id.cmp(&other.type_id).then_with(|| self.label.cmp(other.label))
	}
}

impl fmt::Display for ActorRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.label.is_empty() {
			write!(f, "{}", self.name())
		} else {
			write!(f, "{}#{}", self.name(), self.label)
		}
	}
}

impl fmt::Debug for ActorRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ActorRef({self})")
	}
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Instance-level address of an actor. Unique for the life of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorHandle {
	id: u64,
	actor_ref: ActorRef,
}

impl ActorHandle {
	pub(crate) fn next(actor_ref: ActorRef) -> Self {
		Self {
			id: NEXT_HANDLE.fetch_add(1, AtomicOrdering::Relaxed),
			actor_ref,
		}
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn actor_ref(&self) -> ActorRef {
		self.actor_ref
	}
}

impl fmt::Debug for ActorHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ActorHandle({}, {})", self.id, self.actor_ref)
	}
}
