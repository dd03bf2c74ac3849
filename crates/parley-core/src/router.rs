//! Routing decision for inbound messages.
//!
//! Every resolved inbound message ends in exactly one of three places:
//!
//! 1. Own message with a pending echo: suppressed, it was already rendered
//!    optimistically at send time.
//! 2. Message for the active channel while the user is looking: rendered
//!    immediately, unread stays zero.
//! 3. Anything else: counted as unread. If the channel is the active one
//!    (the user is just not looking), it is also appended to the transcript so
//!    it is there when the user comes back.

use std::{ops::Sub, time::Duration};

use crate::{
    channel::{ChannelId, UserId},
    echo::EchoSuppressor,
    message::InboundMessage,
};

/// Where an inbound message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Own echo. Discard.
    Suppress,
    /// Render into the visible transcript.
    Display,
    /// Count as unread.
    Unread {
        /// Also append to the (currently unobserved) transcript.
        append: bool,
    },
}

/// What the user is looking at when a message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    /// Channel in view.
    pub active: Option<ChannelId>,
    /// Whether the application is in the foreground.
    pub visible: bool,
}

impl Focus {
    /// Whether `channel` is active and being observed.
    pub fn observes(self, channel: ChannelId) -> bool {
        self.visible && self.active == Some(channel)
    }
}

/// Decision point for inbound messages.
#[derive(Debug, Clone, Copy)]
pub struct MessageRouter {
    local_user: UserId,
}

impl MessageRouter {
    /// Create a router for `local_user`.
    pub fn new(local_user: UserId) -> Self {
        Self { local_user }
    }

    /// Decide the route for `message`, already resolved to `channel`.
    ///
    /// Consumes a pending echo when the message is the local user's own.
    pub fn route<I>(
        &self,
        message: &InboundMessage,
        channel: ChannelId,
        focus: Focus,
        echoes: &mut EchoSuppressor<I>,
        now: I,
    ) -> Route
    where
        I: Copy + Ord + Sub<Output = Duration>,
    {
        if message.sender_id == self.local_user && echoes.consume(channel, &message.content, now) {
            return Route::Suppress;
        }

        if focus.observes(channel) {
            Route::Display
        } else {
            Route::Unread { append: focus.active == Some(channel) }
        }
    }
}
