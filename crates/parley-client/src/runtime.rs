//! Async runtime for the synchronization engine.
//!
//! The Runtime drives the engine's event loop, coordinating between:
//! - [`SyncEngine`]: Sans-IO synchronization state
//! - [`Rest`]: channel list and history fetches
//! - [`Renderer`]: whatever shows the user the result
//!
//! It owns every suspending operation the engine asks for. Fetches run as
//! tasks in a [`JoinSet`] and report back as events carrying their ticket;
//! the poll interval is a tokio timer. Both stop when the loop exits.

use std::{io, time::Duration};

use parley_core::{
    Channel, ChannelId, ChannelRegistry, ChatMessage, Clock, SyncAction, SyncEngine, SyncEvent,
    Transport, TransportEvent,
};
use thiserror::Error;
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time::MissedTickBehavior,
};

use crate::rest::Rest;

/// Runtime errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Rendering failed.
    #[error("render failed: {0}")]
    Render(#[from] io::Error),
}

/// User input, already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Show the channel list with unread badges.
    ListChannels,
    /// Switch to a channel.
    Select(ChannelId),
    /// Send text to the active channel.
    Send(String),
    /// The user stopped or started looking at the active channel.
    Visible(bool),
    /// Drop and re-establish the transport connection.
    Reconnect,
    /// Show text to the user without touching the engine.
    Notice(String),
    /// Leave.
    Quit,
}

/// Output side of the client.
pub trait Renderer {
    /// Redraw the channel list.
    fn channel_list(
        &mut self,
        registry: &ChannelRegistry,
        active: Option<ChannelId>,
    ) -> io::Result<()>;

    /// Redraw the whole transcript of the active channel.
    fn transcript(&mut self, channel: Option<&Channel>, messages: &[ChatMessage])
    -> io::Result<()>;

    /// Append one message to the active channel's transcript.
    fn append(&mut self, channel: ChannelId, message: &ChatMessage) -> io::Result<()>;

    /// Show a status line.
    fn notice(&mut self, text: &str) -> io::Result<()>;
}

/// Event loop owning one engine session.
pub struct Runtime<T, C, R, V>
where
    T: Transport,
    C: Clock,
    R: Rest,
    V: Renderer,
{
    engine: SyncEngine<T, C>,
    rest: R,
    renderer: V,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    inputs: mpsc::Receiver<Input>,
    fetches: JoinSet<SyncEvent>,
    poll_interval: Duration,
}

impl<T, C, R, V> Runtime<T, C, R, V>
where
    T: Transport,
    C: Clock,
    R: Rest,
    V: Renderer,
{
    /// Create a runtime.
    ///
    /// `events` receives the transport's connection events and deliveries;
    /// `inputs` receives parsed user input.
    pub fn new(
        engine: SyncEngine<T, C>,
        rest: R,
        renderer: V,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        inputs: mpsc::Receiver<Input>,
        poll_interval: Duration,
    ) -> Self {
        Self { engine, rest, renderer, events, inputs, fetches: JoinSet::new(), poll_interval }
    }

    /// Run until the user quits or input ends.
    ///
    /// Connects first, polls immediately and then every `poll_interval`.
    /// On exit, outstanding fetches are aborted and the session is shut down.
    /// Returns the transport.
    pub async fn run(mut self) -> Result<T, RuntimeError> {
        self.connect().await?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.dispatch(SyncEvent::PollDue)?,
                Some(event) = self.events.recv() => self.dispatch(event.into())?,
                Some(joined) = self.fetches.join_next(), if !self.fetches.is_empty() => match joined {
                    Ok(event) => self.dispatch(event)?,
                    Err(e) if e.is_cancelled() => {},
                    Err(e) => tracing::warn!(error = %e, "fetch task failed"),
                },
                input = self.inputs.recv() => match input {
                    Some(Input::Quit) | None => break,
                    Some(input) => self.on_input(input).await?,
                },
            }
        }

        self.fetches.abort_all();
        tracing::info!("shutting down");
        Ok(self.engine.shutdown())
    }

    async fn connect(&mut self) -> Result<(), RuntimeError> {
        if let Err(e) = self.engine.transport_mut().connect().await {
            tracing::warn!(error = %e, transient = e.is_transient(), "connect failed");
            self.renderer.notice(&format!("Connect failed: {e}. Use /reconnect to retry."))?;
        }
        Ok(())
    }

    async fn on_input(&mut self, input: Input) -> Result<(), RuntimeError> {
        match input {
            Input::ListChannels => {
                self.renderer.channel_list(self.engine.registry(), self.engine.active_channel())?;
            },
            Input::Select(channel) => match self.engine.select_channel(channel) {
                Ok(actions) => self.execute(actions)?,
                Err(e) => self.renderer.notice(&e.to_string())?,
            },
            Input::Send(text) => match self.engine.send_message(&text) {
                Ok(actions) => self.execute(actions)?,
                Err(e) => self.renderer.notice(&e.to_string())?,
            },
            Input::Visible(visible) => self.dispatch(SyncEvent::VisibilityChanged { visible })?,
            Input::Reconnect => {
                self.engine.transport_mut().close();
                self.dispatch(SyncEvent::Disconnected { reason: "reconnecting".into() })?;
                self.connect().await?;
            },
            Input::Notice(text) => self.renderer.notice(&text)?,
            Input::Quit => {},
        }
        Ok(())
    }

    fn dispatch(&mut self, event: SyncEvent) -> Result<(), RuntimeError> {
        let actions = self.engine.handle(event);
        self.execute(actions)
    }

    fn execute(&mut self, actions: Vec<SyncAction>) -> Result<(), RuntimeError> {
        for action in actions {
            match action {
                SyncAction::FetchChannels { ticket } => {
                    let rest = self.rest.clone();
                    let local_user = self.engine.auth().user_id;
                    self.fetches.spawn(async move {
                        let result = rest.fetch_channels(local_user).await;
                        SyncEvent::ChannelsFetched { ticket, result }
                    });
                },
                SyncAction::FetchHistory { ticket } => {
                    let rest = self.rest.clone();
                    self.fetches.spawn(async move {
                        let result = rest.fetch_history(ticket.channel).await;
                        SyncEvent::HistoryFetched { ticket, result }
                    });
                },
                SyncAction::RenderChannelList => {
                    self.renderer
                        .channel_list(self.engine.registry(), self.engine.active_channel())?;
                },
                SyncAction::RenderTranscript => {
                    self.renderer
                        .transcript(self.engine.active_channel_info(), self.engine.transcript())?;
                },
                SyncAction::AppendMessage { channel, message } => {
                    self.renderer.append(channel, &message)?;
                },
                SyncAction::Notice(text) => self.renderer.notice(&text)?,
            }
        }
        Ok(())
    }
}
