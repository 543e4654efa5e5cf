// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Delayed work for actors.
//!
//! [`Timers`] is a cheap handle shared between an actor's state, which
//! schedules timers and drains the due ones from its tick, and the actor's
//! components, where it is registered as an async component. Each time a
//! timer falls due the owning actor is woken once.

use std::{
	collections::BTreeMap,
	fmt,
	sync::Arc,
	time::{Duration, Instant},
};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tessera_runtime::CancellationToken;
use tokio::sync::Notify;
use tracing::trace;

use crate::{
	components::{AsyncComponent, WaitResult},
	error::ComponentError,
};

/// Identifies a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub struct Timers<T> {
	inner: Arc<Inner<T>>,
}

struct Inner<T> {
	state: Mutex<State<T>>,
	changed: Notify,
}

struct State<T> {
	next_id: u64,
	timers: BTreeMap<(Instant, TimerId), T>,
	/// Latest deadline the owning actor was already woken for.
	signalled: Option<Instant>,
}

impl<T> Timers<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(State {
					next_id: 0,
					timers: BTreeMap::new(),
					signalled: None,
				}),
				changed: Notify::new(),
			}),
		}
	}

	/// Fire `payload` once `delay` has elapsed.
	pub fn schedule(&self, delay: Duration, payload: T) -> TimerId {
		self.schedule_at(Instant::now() + delay, payload)
	}

	pub fn schedule_at(&self, at: Instant, payload: T) -> TimerId {
		let id = {
			let mut state = self.inner.state.lock();
			let id = TimerId(state.next_id);
			state.next_id += 1;
			state.timers.insert((at, id), payload);
			// a deadline at or before the last wake-up needs a wake-up of its own
			if state.signalled.is_some_and(|signalled| at <= signalled) {
				state.signalled = None;
			}
			id
		};
		self.inner.changed.notify_waiters();
		id
	}

	/// Cancel a pending timer, returning its payload.
	pub fn cancel(&self, id: TimerId) -> Option<T> {
		let mut state = self.inner.state.lock();
		let key = state.timers.keys().find(|(_, candidate)| *candidate == id).copied()?;
		state.timers.remove(&key)
	}

	pub fn len(&self) -> usize {
		self.inner.state.lock().timers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.state.lock().timers.is_empty()
	}

	/// Deadline of the earliest pending timer.
	pub fn next_deadline(&self) -> Option<Instant> {
		self.inner.state.lock().timers.keys().next().map(|(at, _)| *at)
	}

	/// Hand every timer due at `now` to `handler`, earliest first. Returns how
	/// many fired.
	pub fn drain_due(&self, now: Instant, mut handler: impl FnMut(T)) -> usize {
		let due = {
			let mut state = self.inner.state.lock();
			let pending = state.timers.split_off(&(now, TimerId(u64::MAX)));
			std::mem::replace(&mut state.timers, pending)
		};
		let fired = due.len();
		for payload in due.into_values() {
			handler(payload);
		}
		fired
	}

	/// Earliest deadline the actor has not been woken for yet.
	fn unsignalled_deadline(&self) -> Option<Instant> {
		let state = self.inner.state.lock();
		state.timers.keys().map(|(at, _)| *at).find(|at| state.signalled.is_none_or(|signalled| *at > signalled))
	}

	fn mark_signalled(&self, now: Instant) {
		let mut state = self.inner.state.lock();
		state.signalled = Some(state.signalled.map_or(now, |signalled| signalled.max(now)));
	}
}

impl<T> Default for Timers<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Clone for Timers<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Timers<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Timers").field("pending", &self.len()).finish()
	}
}

impl<T: Send + 'static> AsyncComponent for Timers<T> {
	fn wait<'a>(&'a self, token: &'a CancellationToken) -> BoxFuture<'a, Result<WaitResult, ComponentError>> {
		Box::pin(async move {
			loop {
				let changed = self.inner.changed.notified();
				let now = Instant::now();
				match self.unsignalled_deadline() {
					Some(at) if at <= now => {
						self.mark_signalled(now);
						trace!(pending = self.len(), "timer due");
						return Ok(WaitResult::Continuing);
					}
					Some(at) => {
						tokio::select! {
							_ = token.cancelled() => return Err(ComponentError::Cancelled),
							_ = tokio::time::sleep_until(tokio::time::Instant::from_std(at)) => {}
							_ = changed => {}
						}
					}
					None => {
						tokio::select! {
							_ = token.cancelled() => return Err(ComponentError::Cancelled),
							_ = changed => {}
						}
					}
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn runtime() -> tokio::runtime::Runtime {
		tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap()
	}

	#[test]
	fn test_drain_due_in_deadline_order() {
		let timers = Timers::new();
		let now = Instant::now();
		timers.schedule_at(now + Duration::from_millis(30), "late");
		timers.schedule_at(now + Duration::from_millis(10), "early");
		timers.schedule_at(now + Duration::from_secs(60), "pending");

		let mut fired = Vec::new();
		assert_eq!(timers.drain_due(now + Duration::from_millis(40), |payload| fired.push(payload)), 2);
		assert_eq!(fired, vec!["early", "late"]);
		assert_eq!(timers.len(), 1);
		assert_eq!(timers.next_deadline(), Some(now + Duration::from_secs(60)));
	}

	#[test]
	fn test_cancel() {
		let timers = Timers::new();
		let id = timers.schedule(Duration::ZERO, 1);
		timers.schedule(Duration::ZERO, 2);

		assert_eq!(timers.cancel(id), Some(1));
		assert_eq!(timers.cancel(id), None);

		let mut fired = Vec::new();
		timers.drain_due(Instant::now(), |payload| fired.push(payload));
		assert_eq!(fired, vec![2]);
	}

	#[test]
	fn test_wait_fires_once_per_deadline() {
		let timers = Timers::new();
		let token = CancellationToken::new();
		timers.schedule(Duration::from_millis(10), ());

		runtime().block_on(async {
			let fired = tokio::time::timeout(Duration::from_secs(5), timers.wait(&token)).await;
			assert!(matches!(fired, Ok(Ok(WaitResult::Continuing))));

			// the actor has not drained yet, but it was already woken for this timer
			let again = tokio::time::timeout(Duration::from_millis(50), timers.wait(&token)).await;
			assert!(again.is_err());
		});
		assert_eq!(timers.len(), 1);
	}

	#[test]
	fn test_schedule_interrupts_idle_wait() {
		let timers = Timers::new();
		let token = CancellationToken::new();

		runtime().block_on(async {
			let scheduler = timers.clone();
			let schedule = async move {
				tokio::time::sleep(Duration::from_millis(10)).await;
				scheduler.schedule(Duration::from_millis(5), 7);
			};
			let (fired, ()) = tokio::join!(tokio::time::timeout(Duration::from_secs(5), timers.wait(&token)), schedule);
			assert!(matches!(fired, Ok(Ok(WaitResult::Continuing))));
		});
	}

	#[test]
	fn test_wait_observes_cancellation() {
		let timers = Timers::<()>::new();
		let token = CancellationToken::new();
		token.cancel();

		let result = runtime().block_on(timers.wait(&token));
		assert!(matches!(result, Err(ComponentError::Cancelled)));
	}
}
