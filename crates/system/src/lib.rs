// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Tessera actor system.
//!
//! Hosts actors on a [`Scheduler`](tessera_runtime::Scheduler), owns their
//! components, drives their async components and manages the start/stop
//! lifecycle of the whole graph.

pub mod components;
pub mod config;
pub mod dependencies;
mod driver;
pub mod error;
pub mod net;
pub mod rpc;
pub mod system;
pub mod timer;

pub use components::{AsyncComponent, Components, WaitResult};
pub use config::ActorSystemConfig;
pub use dependencies::{Dependencies, Disposable};
pub use error::{ActorSystemError, ComponentError, RpcError};
pub use system::ActorSystem;
pub use timer::{TimerId, Timers};
