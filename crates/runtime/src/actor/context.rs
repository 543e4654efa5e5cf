// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Process-wide cancellation.
//!
//! A single token is created per run of the actor system and handed to every
//! tick and every async component. Synchronous code polls [`is_cancelled`],
//! async code awaits [`cancelled`].
//!
//! [`is_cancelled`]: CancellationToken::is_cancelled
//! [`cancelled`]: CancellationToken::cancelled

use std::{
	fmt,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use tokio::sync::Notify;

struct Inner {
	cancelled: AtomicBool,
	notify: Notify,
}

/// A cancellation token for signaling shutdown.
#[derive(Clone)]
pub struct CancellationToken {
	inner: Arc<Inner>,
}

impl CancellationToken {
	/// Create a new cancellation token.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				cancelled: AtomicBool::new(false),
				notify: Notify::new(),
			}),
		}
	}

	/// Signal cancellation and wake every pending [`cancelled`](Self::cancelled) future.
	pub fn cancel(&self) {
		self.inner.cancelled.store(true, Ordering::SeqCst);
		self.inner.notify.notify_waiters();
	}

	/// Check if cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::SeqCst)
	}

	/// Resolves once the token is cancelled.
	pub async fn cancelled(&self) {
		loop {
			let notified = self.inner.notify.notified();
			if self.is_cancelled() {
				return;
			}
			notified.await;
		}
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for CancellationToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CancellationToken").field("cancelled", &self.is_cancelled()).finish()
	}
}
