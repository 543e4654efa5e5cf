// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Tessera runtime.
//!
//! Actors are owned state values with a tick function. The [`Scheduler`]
//! multiplexes them over a fixed set of execution groups: worker groups run on
//! dedicated threads, cooperative groups are driven by the host (typically the
//! main thread ticks group 0 once per frame). Overloaded worker groups shed
//! actors to idle ones through work stealing.
//!
//! [`Scheduler`]: scheduler::Scheduler

pub mod actor;
pub mod error;
pub mod scheduler;
pub mod sync;

pub use actor::{Actor, ActorCell, ActorHandle, ActorKind, ActorRef, Behavior, CancellationToken, Lifecycle, TickResult};
pub use error::SchedulerError;
pub use scheduler::{MAIN_THREAD_GROUP, Placement, Scheduler, SchedulerConfig, SchedulerStats};
