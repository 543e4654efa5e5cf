// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actor model primitives.
//!
//! An actor is an owned state value driven by lifecycle callbacks and a tick
//! function. Actors never share state; the scheduler moves them between
//! execution groups and guarantees that exactly one group touches an actor at
//! any instant.

pub mod cell;
pub mod context;
pub mod id;
pub mod lifecycle;
pub mod traits;

pub use cell::ActorCell;
pub use context::CancellationToken;
pub use id::{ActorHandle, ActorRef};
pub use lifecycle::{Actor, Lifecycle};
pub use traits::{ActorKind, Behavior, TickResult, Tickable};
