// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{fmt, sync::Arc};

use crate::scheduler::actor::ScheduledActor;

/// Control messages exchanged between execution groups.
///
/// Each message travels over the receiving group's inbound queue reserved for
/// the sending group, so per pair of groups messages arrive in order.
pub(crate) enum ThreadMessage {
	/// Take ownership of the actor.
	AddActor(Arc<ScheduledActor>),

	/// Release the actor and acknowledge to `reply_to`.
	RemoveActor {
		reply_to: usize,
		actor: Arc<ScheduledActor>,
	},

	RemoveActorResponse(Arc<ScheduledActor>),

	/// Donate one actor to `reply_to`, if the receiver can spare one.
	StealActor {
		reply_to: usize,
	},

	StealActorResponse(Option<Arc<ScheduledActor>>),
}

impl fmt::Debug for ThreadMessage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ThreadMessage::AddActor(actor) => write!(f, "AddActor({})", actor.name()),
			ThreadMessage::RemoveActor {
				reply_to,
				actor,
			} => write!(f, "RemoveActor({}, reply_to: {reply_to})", actor.name()),
			ThreadMessage::RemoveActorResponse(actor) => write!(f, "RemoveActorResponse({})", actor.name()),
			ThreadMessage::StealActor {
				reply_to,
			} => write!(f, "StealActor(reply_to: {reply_to})"),
			ThreadMessage::StealActorResponse(Some(actor)) => write!(f, "StealActorResponse({})", actor.name()),
			ThreadMessage::StealActorResponse(None) => write!(f, "StealActorResponse(-)"),
		}
	}
}
