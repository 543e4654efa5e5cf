// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Single-writer/single-reader FIFO used between execution groups.
//!
//! Every execution group owns one queue per possible sender, so each queue
//! only ever sees one producer thread and one consumer thread. The channel
//! underneath is unbounded; enqueueing never blocks and only fails once the
//! queue itself is gone.

use crossbeam_channel::{Receiver, Sender, unbounded};

pub struct SwsrQueue<T> {
	tx: Sender<T>,
	rx: Receiver<T>,
}

impl<T> SwsrQueue<T> {
	pub fn new() -> Self {
		let (tx, rx) = unbounded();
		Self {
			tx,
			rx,
		}
	}

	/// Appends an item. Never blocks.
	#[inline]
	pub fn try_enqueue(&self, item: T) -> bool {
		self.tx.send(item).is_ok()
	}

	/// Pops the oldest item, if any.
	#[inline]
	pub fn try_dequeue(&self) -> Option<T> {
		self.rx.try_recv().ok()
	}

	/// Number of items currently queued.
	#[inline]
	pub fn len(&self) -> usize {
		self.rx.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}
}

impl<T> Default for SwsrQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}
