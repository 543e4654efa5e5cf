// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Fire-and-forget messages.
//!
//! A [`NetSender`] can be cloned and used from any thread. Every send wakes
//! the receiving actor, which drains its [`NetInbox`] from its tick.

use std::{fmt, time::Instant};

pub use crossbeam_channel::SendError;
use crossbeam_channel::{Receiver, Sender, unbounded};
use tessera_runtime::{ActorRef, Scheduler, TickResult};

/// Create an unbounded message channel towards `target`.
pub fn channel<M: Send + 'static>(scheduler: &Scheduler, target: ActorRef) -> (NetSender<M>, NetInbox<M>) {
	let (tx, rx) = unbounded();
	(
		NetSender {
			tx,
			scheduler: scheduler.clone(),
			target,
		},
		NetInbox {
			rx,
		},
	)
}

pub struct NetSender<M> {
	tx: Sender<M>,
	scheduler: Scheduler,
	target: ActorRef,
}

impl<M> NetSender<M> {
	/// Enqueue `message` and wake the receiving actor.
	pub fn send(&self, message: M) -> Result<(), SendError<M>> {
		self.tx.send(message)?;
		self.scheduler.awake_actor(self.target);
		Ok(())
	}

	pub fn target(&self) -> ActorRef {
		self.target
	}
}

impl<M> Clone for NetSender<M> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			scheduler: self.scheduler.clone(),
			target: self.target,
		}
	}
}

impl<M> fmt::Debug for NetSender<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NetSender").field("target", &self.target).finish()
	}
}

pub struct NetInbox<M> {
	rx: Receiver<M>,
}

impl<M> NetInbox<M> {
	pub fn try_recv(&self) -> Option<M> {
		self.rx.try_recv().ok()
	}

	pub fn len(&self) -> usize {
		self.rx.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}

	/// Hand queued messages to `handler` until the inbox is empty or `deadline`
	/// passes. At least one message is processed per call.
	pub fn drain_until(&self, deadline: Instant, mut handler: impl FnMut(M)) -> TickResult {
		while let Ok(message) = self.rx.try_recv() {
			handler(message);
			if Instant::now() >= deadline && !self.rx.is_empty() {
				return TickResult::Yield;
			}
		}
		TickResult::Completed
	}
}

impl<M> fmt::Debug for NetInbox<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NetInbox").field("len", &self.rx.len()).finish()
	}
}
