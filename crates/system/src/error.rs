// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::io;

use tessera_runtime::{ActorRef, SchedulerError};

/// Errors returned by the [`ActorSystem`](crate::ActorSystem).
///
/// A call that fails leaves the system's registries untouched.
#[derive(Debug, thiserror::Error)]
pub enum ActorSystemError {
	/// Actors can only be added or removed while the system is stopped.
	#[error("the actor graph cannot change while the system is running")]
	Running,

	#[error("actor {0} is already registered")]
	DuplicateActor(ActorRef),

	#[error("actor {0} is not registered")]
	UnknownActor(ActorRef),

	#[error("failed to build the async component runtime")]
	Runtime(#[source] io::Error),

	#[error(transparent)]
	Scheduler(#[from] SchedulerError),
}

/// Outcome of an async component that did not simply complete.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
	#[error("wait cancelled")]
	Cancelled,

	#[error("component failed: {0}")]
	Failed(String),
}

impl ComponentError {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, ComponentError::Cancelled)
	}
}

/// Why an rpc call produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
	/// The serving actor answered with a failure.
	#[error("rpc failed: {0}")]
	Failed(String),

	/// The request was dropped without an answer.
	#[error("rpc request dropped without a response")]
	Dropped,

	/// The serving actor no longer accepts requests.
	#[error("rpc endpoint disconnected")]
	Disconnected,
}

pub type Result<T> = std::result::Result<T, ActorSystemError>;
