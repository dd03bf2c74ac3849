//! Engine side-effects and render instructions.
//!
//! This module defines the [`SyncAction`] enum, the instructions produced by
//! the [`crate::SyncEngine`] for the runtime to execute. The engine decides
//! what to fetch and what changed on screen; the runtime decides how.

use crate::{channel::ChannelId, message::ChatMessage, poll::PollTicket, session::HistoryTicket};

/// Actions produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Fetch the channel list and presence, then report
    /// [`crate::SyncEvent::ChannelsFetched`] with this ticket.
    FetchChannels {
        /// Poll tag.
        ticket: PollTicket,
    },

    /// Fetch history for `ticket.channel`, then report
    /// [`crate::SyncEvent::HistoryFetched`] with this ticket.
    FetchHistory {
        /// Fetch tag.
        ticket: HistoryTicket,
    },

    /// Channel list or unread badges changed.
    RenderChannelList,

    /// Transcript was replaced (cleared on selection, or history landed).
    RenderTranscript,

    /// One message was appended to the transcript of `channel`.
    AppendMessage {
        /// Channel the transcript belongs to.
        channel: ChannelId,
        /// Appended message.
        message: ChatMessage,
    },

    /// Status text for the user.
    Notice(String),
}
