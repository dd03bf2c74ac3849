//! Simulated client session.
//!
//! `SimClient` plays the runtime's part for a [`SyncEngine`] over a
//! [`SimTransport`] and [`ManualClock`]: it feeds events, answers fetch
//! actions with canned server state, and checks invariants after each step.

use parley_core::{
    AuthContext, Channel, ChannelId, FetchError, HistoryTicket, InboundMessage, PollTicket,
    SyncAction, SyncEngine, SyncError, SyncEvent, Topic,
};

use crate::{
    clock::ManualClock,
    invariants::{InvariantRegistry, SyncSnapshot},
    transport::SimTransport,
};

/// Engine type driven by the simulation.
pub type SimEngine = SyncEngine<SimTransport, ManualClock>;

/// Simulated client with invariant checking.
pub struct SimClient {
    engine: SimEngine,
    clock: ManualClock,
    invariants: InvariantRegistry,
}

impl SimClient {
    /// Connected client for `user_id`, with the standard invariants.
    pub fn connected(user_id: i64) -> Self {
        let clock = ManualClock::new();
        let auth = AuthContext::new(user_id, format!("user{user_id}"), "sim-token");
        let mut client = Self {
            engine: SyncEngine::new(auth, SimTransport::connected(), clock.clone()),
            clock,
            invariants: InvariantRegistry::standard(),
        };
        client.handle(SyncEvent::Connected);
        client
    }

    /// Shared clock handle.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Underlying engine.
    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    /// Underlying transport.
    pub fn transport(&self) -> &SimTransport {
        self.engine.transport()
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut SimTransport {
        self.engine.transport_mut()
    }

    /// Feed one event and check invariants.
    pub fn handle(&mut self, event: SyncEvent) -> Vec<SyncAction> {
        let context = format!("after {event:?}");
        let actions = self.engine.handle(event);
        self.record(&actions, &context);
        actions
    }

    /// Select a channel and check invariants.
    pub fn select(&mut self, channel: ChannelId) -> Result<Vec<SyncAction>, SyncError> {
        let actions = self.engine.select_channel(channel)?;
        self.record(&actions, &format!("after selecting {channel}"));
        Ok(actions)
    }

    /// Send to the active channel and check invariants.
    pub fn send(&mut self, content: &str) -> Result<Vec<SyncAction>, SyncError> {
        let actions = self.engine.send_message(content)?;
        self.record(&actions, &format!("after sending {content:?}"));
        Ok(actions)
    }

    /// Change visibility and check invariants.
    pub fn set_visible(&mut self, visible: bool) -> Vec<SyncAction> {
        self.handle(SyncEvent::VisibilityChanged { visible })
    }

    /// Start a poll and return its ticket without answering it.
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        self.handle(SyncEvent::PollDue).into_iter().find_map(|action| match action {
            SyncAction::FetchChannels { ticket } => Some(ticket),
            _ => None,
        })
    }

    /// Run a full poll that returns `channels`.
    pub fn poll(&mut self, channels: Vec<Channel>) -> Vec<SyncAction> {
        match self.begin_poll() {
            Some(ticket) => {
                self.handle(SyncEvent::ChannelsFetched { ticket, result: Ok(channels) })
            },
            None => Vec::new(),
        }
    }

    /// Answer a poll issued earlier.
    pub fn finish_poll(
        &mut self,
        ticket: PollTicket,
        result: Result<Vec<Channel>, FetchError>,
    ) -> Vec<SyncAction> {
        self.handle(SyncEvent::ChannelsFetched { ticket, result })
    }

    /// Select `channel` and return the history ticket without answering it.
    ///
    /// `None` if the selection was rejected.
    pub fn begin_select(&mut self, channel: ChannelId) -> Option<HistoryTicket> {
        self.select(channel).ok()?.into_iter().find_map(|action| match action {
            SyncAction::FetchHistory { ticket } => Some(ticket),
            _ => None,
        })
    }

    /// Answer a history fetch issued earlier.
    pub fn finish_history(
        &mut self,
        ticket: HistoryTicket,
        result: Result<Vec<InboundMessage>, FetchError>,
    ) -> Vec<SyncAction> {
        self.handle(SyncEvent::HistoryFetched { ticket, result })
    }

    /// Publish `body` on `topic` and feed the delivery, if anything is
    /// subscribed.
    pub fn publish(&mut self, topic: Topic, body: &str) -> Vec<SyncAction> {
        match self.engine.transport().deliver(topic, body) {
            Some(event) => self.handle(event),
            None => Vec::new(),
        }
    }

    /// Drop the connection and tell the engine.
    pub fn disconnect(&mut self, reason: &str) -> Vec<SyncAction> {
        let event = self.transport_mut().drop_connection(reason);
        self.handle(event)
    }

    /// Re-establish the connection and tell the engine.
    pub fn reconnect(&mut self) -> Vec<SyncAction> {
        self.transport_mut().reopen();
        self.handle(SyncEvent::Connected)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot::from_engine(&self.engine)
    }

    /// Tear the session down, returning the transport.
    pub fn shutdown(self) -> SimTransport {
        self.engine.shutdown()
    }

    fn record(&mut self, actions: &[SyncAction], context: &str) {
        tracing::trace!(count = actions.len(), context, "sim step");
        self.invariants.assert_all(&self.snapshot(), context);
    }
}
