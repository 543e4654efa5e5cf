// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Components owned together with an actor.
//!
//! Components are stored by type. A component registered through
//! [`Components::insert_async`] additionally gets driven by the actor system
//! while it runs: each completed wait wakes the owning actor.

use std::{
	any::{Any, TypeId},
	fmt,
	sync::Arc,
};

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use tessera_runtime::CancellationToken;

use crate::error::ComponentError;

/// What an async component reports after a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
	/// Wait again.
	Continuing,

	/// The component has nothing more to wait for.
	Completed,
}

/// A component with something to wait for outside the tick loop (I/O, timers,
/// another subsystem).
pub trait AsyncComponent: Send + Sync + 'static {
	/// Wait until the owning actor has work to do.
	///
	/// Implementations should return [`ComponentError::Cancelled`] promptly
	/// once `token` is cancelled.
	fn wait<'a>(&'a self, token: &'a CancellationToken) -> BoxFuture<'a, Result<WaitResult, ComponentError>>;
}

#[derive(Default)]
pub struct Components {
	values: IndexMap<TypeId, Arc<dyn Any + Send + Sync>>,
	async_components: Vec<Arc<dyn AsyncComponent>>,
}

impl Components {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `value`, replacing any component of the same type.
	pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
		self.values.insert(TypeId::of::<T>(), Arc::new(value));
		self
	}

	/// Stores `value` and registers it for async driving.
	pub fn insert_async<T: AsyncComponent>(&mut self, value: T) -> &mut Self {
		let value = Arc::new(value);
		self.values.insert(TypeId::of::<T>(), value.clone());
		self.async_components.push(value);
		self
	}

	pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
		self.insert(value);
		self
	}

	pub fn with_async<T: AsyncComponent>(mut self, value: T) -> Self {
		self.insert_async(value);
		self
	}

	pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.values.get(&TypeId::of::<T>()).cloned().and_then(|value| value.downcast::<T>().ok())
	}

	pub fn contains<T: 'static>(&self) -> bool {
		self.values.contains_key(&TypeId::of::<T>())
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub(crate) fn async_components(&self) -> Vec<Arc<dyn AsyncComponent>> {
		self.async_components.clone()
	}
}

impl fmt::Debug for Components {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Components")
			.field("len", &self.values.len())
			.field("async", &self.async_components.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Transform {
		x: f32,
	}

	struct Ticker;

	impl AsyncComponent for Ticker {
		fn wait<'a>(&'a self, _token: &'a CancellationToken) -> BoxFuture<'a, Result<WaitResult, ComponentError>> {
			Box::pin(async { Ok::<_, ComponentError>(WaitResult::Completed) })
		}
	}

	#[test]
	fn test_lookup_by_type() {
		let components = Components::new().with(Transform {
			x: 1.5,
		});
		assert_eq!(components.get::<Transform>().map(|t| t.x), Some(1.5));
		assert!(components.get::<Ticker>().is_none());
		assert_eq!(components.len(), 1);
	}

	#[test]
	fn test_async_components_are_also_lookups() {
		let components = Components::new().with_async(Ticker).with(Transform {
			x: 0.0,
		});
		assert!(components.contains::<Ticker>());
		assert_eq!(components.async_components().len(), 1);
		assert_eq!(components.len(), 2);
	}
}
