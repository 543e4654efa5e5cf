// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Request/response calls between actors.
//!
//! The serving actor owns an [`RpcServer`] and hands out [`RpcSender`]s. A
//! caller turns a sender into its own [`RpcClient`], which remembers a context
//! value per call and hands it back together with the outcome. Requests wake
//! the server, responses wake the caller.
//!
//! Every request is answered exactly once: a [`Responder`] that is dropped
//! unanswered replies with [`RpcError::Dropped`].

use std::{
	collections::HashMap,
	fmt,
	panic::{self, AssertUnwindSafe},
	time::Instant,
};

use crossbeam_channel::{Receiver, SendError, Sender, unbounded};
use tessera_runtime::{ActorRef, Scheduler, TickResult};
use tracing::{error, trace};

use crate::error::RpcError;

/// Create an rpc endpoint served by `server`.
pub fn endpoint<Req, Resp>(scheduler: &Scheduler, server: ActorRef) -> (RpcSender<Req, Resp>, RpcServer<Req, Resp>)
where
	Req: Send + 'static,
	Resp: Send + 'static,
{
	let (tx, rx) = unbounded();
	(
		RpcSender {
			tx,
			scheduler: scheduler.clone(),
			server,
		},
		RpcServer {
			rx,
		},
	)
}

/// Identifies one call made through an [`RpcClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

struct Reply<Resp> {
	id: u64,
	result: Result<Resp, RpcError>,
}

struct ReplyTo<Resp> {
	tx: Sender<Reply<Resp>>,
	scheduler: Scheduler,
	caller: ActorRef,
}

impl<Resp> ReplyTo<Resp> {
	fn send(self, id: u64, result: Result<Resp, RpcError>) {
		if self.tx.send(Reply {
			id,
			result,
		})
		.is_err()
		{
			trace!(caller = %self.caller, id, "caller gone, reply discarded");
			return;
		}
		self.scheduler.awake_actor(self.caller);
	}
}

/// Cloneable address of an rpc endpoint.
pub struct RpcSender<Req, Resp> {
	tx: Sender<RpcRequest<Req, Resp>>,
	scheduler: Scheduler,
	server: ActorRef,
}

impl<Req, Resp> RpcSender<Req, Resp> {
	/// A client for calls made by `caller`. Responses wake `caller`.
	pub fn client<C>(&self, caller: ActorRef) -> RpcClient<Req, Resp, C> {
		let (replies_tx, replies) = unbounded();
		RpcClient {
			server: self.clone(),
			caller,
			replies_tx,
			replies,
			pending: HashMap::new(),
			next_id: 0,
		}
	}

	pub fn server(&self) -> ActorRef {
		self.server
	}
}

impl<Req, Resp> Clone for RpcSender<Req, Resp> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			scheduler: self.scheduler.clone(),
			server: self.server,
		}
	}
}

impl<Req, Resp> fmt::Debug for RpcSender<Req, Resp> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RpcSender").field("server", &self.server).finish()
	}
}

/// Calling side of an endpoint, owned by the calling actor's state.
///
/// `C` is caller-side context kept until the call's outcome is delivered.
pub struct RpcClient<Req, Resp, C = ()> {
	server: RpcSender<Req, Resp>,
	caller: ActorRef,
	replies_tx: Sender<Reply<Resp>>,
	replies: Receiver<Reply<Resp>>,
	pending: HashMap<u64, C>,
	next_id: u64,
}

impl<Req, Resp, C> RpcClient<Req, Resp, C> {
	/// Send `request` to the server and wake it. `context` is handed back with
	/// the outcome.
	pub fn call(&mut self, context: C, request: Req) -> Result<CallId, RpcError> {
		let id = self.next_id;
		let request = RpcRequest {
			data: request,
			responder: Responder {
				id,
				caller: self.caller,
				reply_to: Some(ReplyTo {
					tx: self.replies_tx.clone(),
					scheduler: self.server.scheduler.clone(),
					caller: self.caller,
				}),
			},
		};

		if let Err(SendError(mut request)) = self.server.tx.send(request) {
			request.responder.reply_to = None;
			return Err(RpcError::Disconnected);
		}

		self.next_id += 1;
		self.pending.insert(id, context);
		self.server.scheduler.awake_actor(self.server.server);
		trace!(caller = %self.caller, server = %self.server.server, id, "rpc sent");
		Ok(CallId(id))
	}

	/// Calls still waiting for their outcome.
	pub fn pending(&self) -> usize {
		self.pending.len()
	}

	pub fn caller(&self) -> ActorRef {
		self.caller
	}

	/// Hand received outcomes to `handler` until none are left or `deadline`
	/// passes. At least one outcome is processed per call.
	pub fn drain_until(&mut self, deadline: Instant, mut handler: impl FnMut(C, Result<Resp, RpcError>)) -> TickResult {
		while let Ok(reply) = self.replies.try_recv() {
			match self.pending.remove(&reply.id) {
				Some(context) => handler(context, reply.result),
				None => {
					error!(caller = %self.caller, server = %self.server.server, id = reply.id, "reply without a pending call");
				}
			}
			if Instant::now() >= deadline && !self.replies.is_empty() {
				return TickResult::Yield;
			}
		}
		TickResult::Completed
	}
}

impl<Req, Resp, C> fmt::Debug for RpcClient<Req, Resp, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RpcClient")
			.field("caller", &self.caller)
			.field("server", &self.server.server)
			.field("pending", &self.pending.len())
			.finish()
	}
}

/// One incoming call.
pub struct RpcRequest<Req, Resp> {
	data: Req,
	responder: Responder<Resp>,
}

impl<Req, Resp> RpcRequest<Req, Resp> {
	pub fn data(&self) -> &Req {
		&self.data
	}

	pub fn caller(&self) -> ActorRef {
		self.responder.caller()
	}

	/// Split the request so it can be answered later.
	pub fn into_parts(self) -> (Req, Responder<Resp>) {
		(self.data, self.responder)
	}
}

/// Answers one call. Dropping it unanswered fails the call with
/// [`RpcError::Dropped`].
pub struct Responder<Resp> {
	id: u64,
	caller: ActorRef,
	reply_to: Option<ReplyTo<Resp>>,
}

impl<Resp> Responder<Resp> {
	pub fn caller(&self) -> ActorRef {
		self.caller
	}

	pub fn respond(mut self, result: Result<Resp, RpcError>) {
		if let Some(reply_to) = self.reply_to.take() {
			reply_to.send(self.id, result);
		}
	}

	pub fn succeed(self, response: Resp) {
		self.respond(Ok(response));
	}

	pub fn fail(self, reason: impl Into<String>) {
		self.respond(Err(RpcError::Failed(reason.into())));
	}
}

impl<Resp> Drop for Responder<Resp> {
	fn drop(&mut self) {
		if let Some(reply_to) = self.reply_to.take() {
			reply_to.send(self.id, Err(RpcError::Dropped));
		}
	}
}

/// Serving side of an endpoint, owned by the serving actor's state.
pub struct RpcServer<Req, Resp> {
	rx: Receiver<RpcRequest<Req, Resp>>,
}

impl<Req, Resp> RpcServer<Req, Resp> {
	pub fn try_recv(&self) -> Option<RpcRequest<Req, Resp>> {
		self.rx.try_recv().ok()
	}

	pub fn len(&self) -> usize {
		self.rx.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}

	/// Answer queued requests with `handler` until none are left or `deadline`
	/// passes. A panicking handler fails the call instead of the actor.
	pub fn serve_until(&self, deadline: Instant, mut handler: impl FnMut(Req) -> Result<Resp, RpcError>) -> TickResult {
		while let Ok(request) = self.rx.try_recv() {
			let (data, responder) = request.into_parts();
			match panic::catch_unwind(AssertUnwindSafe(|| handler(data))) {
				Ok(result) => responder.respond(result),
				Err(_) => {
					error!(caller = %responder.caller(), "rpc handler panicked");
					responder.fail("rpc handler panicked");
				}
			}
			if Instant::now() >= deadline && !self.rx.is_empty() {
				return TickResult::Yield;
			}
		}
		TickResult::Completed
	}
}

impl<Req, Resp> fmt::Debug for RpcServer<Req, Resp> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RpcServer").field("len", &self.rx.len()).finish()
	}
}
