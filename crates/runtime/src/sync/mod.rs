// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Synchronization primitives used by the scheduler.

pub mod queue;
pub mod signal;

pub use queue::SwsrQueue;
pub use signal::Signal;
