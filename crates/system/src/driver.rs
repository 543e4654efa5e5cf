// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Background task driving the async components of one actor.

use std::sync::Arc;

use futures_util::{StreamExt, stream::FuturesUnordered};
use tessera_runtime::{ActorRef, CancellationToken, Scheduler};
use tracing::{debug, trace};

use crate::{
	components::{AsyncComponent, WaitResult},
	error::ComponentError,
};

/// Waits on every component concurrently until cancellation, waking `actor`
/// whenever one of them returns. Components returning
/// [`WaitResult::Continuing`] are waited on again; the task ends once all of
/// them completed, on the first error, or on cancellation.
pub(crate) async fn drive(
	actor: ActorRef,
	components: Vec<Arc<dyn AsyncComponent>>,
	scheduler: Scheduler,
	token: CancellationToken,
) -> Result<(), ComponentError> {
	scheduler.awake_actor(actor);

	let mut waits = FuturesUnordered::new();
	for (index, component) in components.iter().enumerate() {
		waits.push(wait_on(index, component.as_ref(), &token));
	}

	loop {
		tokio::select! {
			_ = token.cancelled() => {
				trace!(actor = %actor, "async components cancelled");
				return Err(ComponentError::Cancelled);
			}
			next = waits.next() => {
				let Some((index, result)) = next else {
					debug!(actor = %actor, "all async components completed");
					return Ok(());
				};
				let outcome = result?;
				scheduler.awake_actor(actor);
				if outcome == WaitResult::Continuing {
					waits.push(wait_on(index, components[index].as_ref(), &token));
				}
			}
		}
	}
}

fn wait_on<'a>(
	index: usize,
	component: &'a dyn AsyncComponent,
	token: &'a CancellationToken,
) -> impl Future<Output = (usize, Result<WaitResult, ComponentError>)> + 'a {
	async move { (index, component.wait(token).await) }
}
