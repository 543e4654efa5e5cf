// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Auto-reset wake signal.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// An auto-reset event used to wake an execution group.
///
/// `set` latches the signal until exactly one waiter consumes it. Setting an
/// already set signal is a no-op, so many producers collapse into one wake-up.
#[derive(Debug)]
pub struct Signal {
	state: Mutex<bool>,
	condvar: Condvar,
}

impl Signal {
	/// Creates a new signal, optionally already set.
	#[inline]
	pub fn new(initially_set: bool) -> Self {
		Self {
			state: Mutex::new(initially_set),
			condvar: Condvar::new(),
		}
	}

	/// Latches the signal and wakes one waiter.
	#[inline]
	pub fn set(&self) {
		let mut state = self.state.lock();
		*state = true;
		self.condvar.notify_one();
	}

	/// Returns whether the signal is currently latched, without consuming it.
	#[inline]
	pub fn is_set(&self) -> bool {
		*self.state.lock()
	}

	/// Blocks until the signal is set or the timeout expires.
	///
	/// Returns `true` if the signal was consumed, `false` on timeout.
	pub fn wait_timeout(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut state = self.state.lock();
		while !*state {
			if self.condvar.wait_until(&mut state, deadline).timed_out() {
				break;
			}
		}
		std::mem::replace(&mut *state, false)
	}
}

impl Default for Signal {
	#[inline]
	fn default() -> Self {
		Self::new(false)
	}
}
