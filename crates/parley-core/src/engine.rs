//! Client-side synchronization engine.
//!
//! This module defines the [`SyncEngine`], the per-session object that keeps
//! the local view of channels, unread badges, and the visible transcript
//! consistent with an asynchronous, possibly reordered inbound stream.
//!
//! The engine is a Sans-IO state machine: it consumes [`SyncEvent`]s and two
//! user intents ([`SyncEngine::select_channel`], [`SyncEngine::send_message`])
//! and produces [`SyncAction`]s for the runtime to execute. Suspending work
//! (REST fetches) is requested through actions and reported back as events
//! carrying the ticket they were issued with, so state is always re-validated
//! after a suspension.
//!
//! # Invariants
//!
//! - The unread count of the channel that is both active and visible is 0.
//! - Every unread counter belongs to a known channel.
//! - While connected, live subscriptions cover exactly the topics of the
//!   known channels.

use std::time::Duration;

use crate::{
    Clock, SyncAction, SyncEvent,
    auth::AuthContext,
    channel::{Channel, ChannelId, SEND_DESTINATION},
    echo::EchoSuppressor,
    error::{FetchError, MalformedMessage, SyncError},
    message::{ChatMessage, InboundMessage, OutboundMessage},
    poll::{PollGuard, PollTicket},
    registry::ChannelRegistry,
    router::{Focus, MessageRouter, Route},
    session::{ActiveChannelSession, HistoryTicket},
    subscription::SubscriptionManager,
    transport::{Delivery, Transport},
};

/// Synchronization state of one authenticated session.
///
/// Constructed per connection and consumed by [`SyncEngine::shutdown`] on
/// logout, so no state leaks between sessions.
pub struct SyncEngine<T, C>
where
    T: Transport,
    C: Clock,
{
    auth: AuthContext,
    transport: T,
    clock: C,
    registry: ChannelRegistry,
    subscriptions: SubscriptionManager,
    echoes: EchoSuppressor<C::Instant>,
    router: MessageRouter,
    session: ActiveChannelSession,
    polls: PollGuard,
    /// Whether the user can see the active channel.
    visible: bool,
}

impl<T, C> SyncEngine<T, C>
where
    T: Transport,
    C: Clock,
{
    /// Create an engine for `auth`, initially visible with nothing selected.
    pub fn new(auth: AuthContext, transport: T, clock: C) -> Self {
        let router = MessageRouter::new(auth.user_id);
        Self {
            auth,
            transport,
            clock,
            registry: ChannelRegistry::new(),
            subscriptions: SubscriptionManager::new(),
            echoes: EchoSuppressor::default(),
            router,
            session: ActiveChannelSession::new(),
            polls: PollGuard::new(),
            visible: true,
        }
    }

    /// Override how long sent messages wait for their echo.
    #[must_use]
    pub fn with_echo_ttl(mut self, ttl: Duration) -> Self {
        self.echoes = EchoSuppressor::new(ttl);
        self
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SyncEvent) -> Vec<SyncAction> {
        match event {
            SyncEvent::Connected => self.on_connected(),
            SyncEvent::Disconnected { reason } => {
                tracing::warn!(%reason, "transport disconnected");
                self.subscriptions.reset();
                vec![SyncAction::Notice(format!("Disconnected: {reason}"))]
            },
            SyncEvent::Delivered(delivery) => self.on_delivery(&delivery),
            SyncEvent::PollDue => vec![SyncAction::FetchChannels { ticket: self.polls.issue() }],
            SyncEvent::ChannelsFetched { ticket, result } => self.on_channels(ticket, result),
            SyncEvent::HistoryFetched { ticket, result } => self.on_history(ticket, result),
            SyncEvent::VisibilityChanged { visible } => self.set_visible(visible),
        }
    }

    /// Make `channel` the active channel.
    ///
    /// Marks it read, clears the transcript, makes sure its topic is
    /// subscribed, and requests its history.
    pub fn select_channel(&mut self, channel: ChannelId) -> Result<Vec<SyncAction>, SyncError> {
        if !self.registry.contains(channel) {
            return Err(SyncError::UnknownChannel(channel));
        }

        self.registry.mark_read(channel);
        let ticket = self.session.select(channel);
        self.subscriptions.ensure(&mut self.transport, channel, self.auth.user_id);
        tracing::debug!(%channel, "channel selected");

        Ok(vec![
            SyncAction::RenderChannelList,
            SyncAction::RenderTranscript,
            SyncAction::FetchHistory { ticket },
        ])
    }

    /// Send `content` to the active channel.
    ///
    /// The pending echo is recorded and the message rendered optimistically
    /// before it is handed to the transport, so the echo can never be
    /// checked before its optimistic render exists.
    pub fn send_message(&mut self, content: &str) -> Result<Vec<SyncAction>, SyncError> {
        let channel = self.session.active().ok_or(SyncError::NoActiveChannel)?;
        if content.trim().is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        if !self.transport.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let body = OutboundMessage::new(channel, self.auth.user_id, content)
            .to_json()
            .map_err(|e| SyncError::Encode(e.to_string()))?;

        self.echoes.remember(channel, content, self.clock.now());
        let message = ChatMessage::local(&self.auth, content, self.clock.wall_clock());
        self.session.push(message.clone());

        let mut actions = vec![SyncAction::AppendMessage { channel, message }];
        if let Err(e) = self.transport.send(SEND_DESTINATION, body) {
            tracing::warn!(%channel, error = %e, "send failed");
            actions.push(SyncAction::Notice(format!("Message not delivered: {e}")));
        }
        Ok(actions)
    }

    /// Update whether the user can see the active channel.
    ///
    /// Regaining visibility marks the active channel read.
    pub fn set_visible(&mut self, visible: bool) -> Vec<SyncAction> {
        let regained = visible && !self.visible;
        self.visible = visible;

        match self.session.active() {
            Some(active) if regained => {
                self.registry.mark_read(active);
                vec![SyncAction::RenderChannelList]
            },
            _ => vec![],
        }
    }

    /// Tear the session down: unsubscribe everything and close the transport.
    ///
    /// Returns the transport so the caller can reuse or drop it.
    pub fn shutdown(mut self) -> T {
        self.subscriptions.unsubscribe_all(&mut self.transport);
        self.transport.close();
        tracing::info!(user_id = self.auth.user_id, "session closed");
        self.transport
    }

    fn on_connected(&mut self) -> Vec<SyncAction> {
        let known = self.registry.ids();
        let report = self.subscriptions.reconcile(&mut self.transport, &known, self.auth.user_id);
        tracing::info!(subscribed = report.subscribed.len(), "transport connected");
        vec![SyncAction::Notice("Connected".into())]
    }

    fn on_delivery(&mut self, delivery: &Delivery) -> Vec<SyncAction> {
        let (message, channel) = match self.resolve(delivery) {
            Ok(resolved) => resolved,
            Err(reason) => {
                tracing::debug!(%reason, "dropping inbound payload");
                return vec![];
            },
        };
        if !self.registry.contains(channel) {
            tracing::debug!(%channel, "dropping message for unknown channel");
            return vec![];
        }

        let focus = Focus { active: self.session.active(), visible: self.visible };
        let now = self.clock.now();
        match self.router.route(&message, channel, focus, &mut self.echoes, now) {
            Route::Suppress => {
                tracing::trace!(%channel, "echo suppressed");
                if let Some(id) = message.id.filter(|_| self.session.active() == Some(channel)) {
                    self.session.confirm(message.sender_id, &message.content, id);
                }
                vec![]
            },
            Route::Display => {
                let message = ChatMessage::from(message);
                self.session.push(message.clone());
                vec![SyncAction::AppendMessage { channel, message }]
            },
            Route::Unread { append } => {
                let unread = self.registry.increment(channel);
                tracing::trace!(%channel, unread, "unread incremented");

                let mut actions = Vec::with_capacity(2);
                if append {
                    let message = ChatMessage::from(message);
                    self.session.push(message.clone());
                    actions.push(SyncAction::AppendMessage { channel, message });
                }
                actions.push(SyncAction::RenderChannelList);
                actions
            },
        }
    }

    fn resolve(&self, delivery: &Delivery) -> Result<(InboundMessage, ChannelId), MalformedMessage> {
        let origin = self
            .subscriptions
            .origin(delivery.subscription)
            .ok_or(MalformedMessage::UnknownSubscription)?;
        let message = InboundMessage::from_json(&delivery.body)?;
        let channel = message.resolve(origin, self.auth.user_id)?;
        Ok((message, channel))
    }

    fn on_channels(
        &mut self,
        ticket: PollTicket,
        result: Result<Vec<Channel>, FetchError>,
    ) -> Vec<SyncAction> {
        let channels = match result {
            Ok(channels) => channels,
            Err(e) => {
                tracing::warn!(error = %e, "channel refresh failed, keeping previous registry");
                return vec![];
            },
        };
        if !self.polls.accept(ticket) {
            tracing::debug!(?ticket, "discarding superseded channel list");
            return vec![];
        }

        let known = self.registry.refresh(channels);
        let report = self.subscriptions.reconcile(&mut self.transport, &known, self.auth.user_id);
        if !report.is_empty() {
            tracing::debug!(
                subscribed = report.subscribed.len(),
                unsubscribed = report.unsubscribed.len(),
                "subscriptions reconciled"
            );
        }
        vec![SyncAction::RenderChannelList]
    }

    fn on_history(
        &mut self,
        ticket: HistoryTicket,
        result: Result<Vec<InboundMessage>, FetchError>,
    ) -> Vec<SyncAction> {
        if !self.session.is_current(ticket) {
            tracing::debug!(channel = %ticket.channel, "discarding stale history");
            return vec![];
        }

        match result {
            Ok(messages) => {
                let history = messages.into_iter().map(ChatMessage::from).collect();
                self.session.apply_history(ticket, history);
                vec![SyncAction::RenderTranscript]
            },
            Err(e) => {
                tracing::warn!(channel = %ticket.channel, error = %e, "history fetch failed");
                self.session.fail_history(ticket);
                vec![SyncAction::Notice(format!("Could not load history: {e}"))]
            },
        }
    }

    /// Authenticated user.
    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Known channels and unread counts.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Live subscriptions.
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Channel in view. `None` before the first selection.
    pub fn active_channel(&self) -> Option<ChannelId> {
        self.session.active()
    }

    /// Registry entry of the active channel, if it is still known.
    pub fn active_channel_info(&self) -> Option<&Channel> {
        self.session.active().and_then(|id| self.registry.get(id))
    }

    /// Transcript of the active channel.
    pub fn transcript(&self) -> &[ChatMessage] {
        self.session.transcript()
    }

    /// Whether the active channel's history is still loading.
    pub fn is_loading_history(&self) -> bool {
        self.session.is_loading()
    }

    /// Whether the user can see the active channel.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Number of sends still waiting for their echo.
    pub fn pending_echoes(&self) -> usize {
        self.echoes.len()
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably. Used by the runtime to (re)connect.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
