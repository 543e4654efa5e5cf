// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Services shared by every actor of a system.

use std::{
	any::{Any, TypeId},
	fmt,
	sync::Arc,
};

use indexmap::IndexMap;

/// A dependency that must release resources when the system drops it.
pub trait Disposable: Send + Sync + 'static {
	fn dispose(&self);
}

#[derive(Default)]
pub struct Dependencies {
	values: IndexMap<TypeId, Arc<dyn Any + Send + Sync>>,
	disposables: Vec<Arc<dyn Disposable>>,
}

impl Dependencies {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
		self.values.insert(TypeId::of::<T>(), Arc::new(value));
		self
	}

	/// Stores `value`, which is disposed when the dependencies are replaced or
	/// the system shuts down.
	pub fn insert_disposable<T: Disposable>(&mut self, value: T) -> &mut Self {
		let value = Arc::new(value);
		self.values.insert(TypeId::of::<T>(), value.clone());
		self.disposables.push(value);
		self
	}

	pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.values.get(&TypeId::of::<T>()).cloned().and_then(|value| value.downcast::<T>().ok())
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Disposes every disposable dependency, most recently inserted first.
	pub fn dispose(self) {
		for disposable in self.disposables.iter().rev() {
			disposable.dispose();
		}
	}
}

impl fmt::Debug for Dependencies {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dependencies")
			.field("len", &self.values.len())
			.field("disposable", &self.disposables.len())
			.finish()
	}
}
