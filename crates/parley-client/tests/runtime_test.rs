//! Runtime event loop against an in-memory transport and REST fake.
//!
//! Time is paused, so the poll interval only elapses when the test sleeps.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use parley_client::{Input, Renderer, Rest, Runtime, RuntimeError};
use parley_core::{
    AuthContext, Channel, ChannelId, ChannelRegistry, ChatMessage, Delivery, FetchError,
    InboundMessage, SEND_DESTINATION, SubscriptionId, SyncEngine, Topic, Transport, TransportEvent,
    UserId,
};
use parley_harness::{ManualClock, SimTransport, TransportCall, wire};
use tokio::{sync::mpsc, task::JoinHandle};

const ME: UserId = 7;
const POLL: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct FakeRest {
    channels: Arc<Mutex<Vec<Channel>>>,
    history: Arc<Mutex<HashMap<ChannelId, Vec<InboundMessage>>>>,
    channel_fetches: Arc<Mutex<u32>>,
    hang_history: bool,
}

impl FakeRest {
    fn with_channels(channels: Vec<Channel>) -> Self {
        Self { channels: Arc::new(Mutex::new(channels)), ..Self::default() }
    }

    fn fetches(&self) -> u32 {
        *self.channel_fetches.lock().unwrap()
    }
}

impl Rest for FakeRest {
    async fn fetch_channels(&self, _local_user: UserId) -> Result<Vec<Channel>, FetchError> {
        *self.channel_fetches.lock().unwrap() += 1;
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn fetch_history(&self, channel: ChannelId) -> Result<Vec<InboundMessage>, FetchError> {
        if self.hang_history {
            std::future::pending::<()>().await;
        }
        Ok(self.history.lock().unwrap().get(&channel).cloned().unwrap_or_default())
    }
}

/// Records one line per render call.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }
}

impl Renderer for Recorder {
    fn channel_list(
        &mut self,
        registry: &ChannelRegistry,
        _active: Option<ChannelId>,
    ) -> io::Result<()> {
        let badges: Vec<String> =
            registry.counted().filter(|(_, n)| *n > 0).map(|(id, n)| format!("{id}={n}")).collect();
        self.push(format!("list [{}]", badges.join(",")));
        Ok(())
    }

    fn transcript(
        &mut self,
        channel: Option<&Channel>,
        messages: &[ChatMessage],
    ) -> io::Result<()> {
        let name = channel.map_or("-", |c| c.display_name.as_str());
        self.push(format!("transcript {name} {}", messages.len()));
        Ok(())
    }

    fn append(&mut self, channel: ChannelId, message: &ChatMessage) -> io::Result<()> {
        self.push(format!("append {channel} {}", message.content));
        Ok(())
    }

    fn notice(&mut self, text: &str) -> io::Result<()> {
        self.push(format!("notice {text}"));
        Ok(())
    }
}

struct Harness {
    events: mpsc::UnboundedSender<TransportEvent>,
    inputs: mpsc::Sender<Input>,
    recorder: Recorder,
    task: JoinHandle<Result<SimTransport, RuntimeError>>,
}

impl Harness {
    fn start(rest: FakeRest) -> Self {
        let auth = AuthContext::new(ME, "alice", "t0k");
        let engine = SyncEngine::new(auth, SimTransport::new(), ManualClock::new());
        let (events, events_rx) = mpsc::unbounded_channel();
        let (inputs, inputs_rx) = mpsc::channel(16);
        let recorder = Recorder::default();

        let runtime = Runtime::new(engine, rest, recorder.clone(), events_rx, inputs_rx, POLL);
        let task = tokio::spawn(runtime.run());
        events.send(TransportEvent::Connected).unwrap();

        Self { events, inputs, recorder, task }
    }

    async fn input(&self, input: Input) {
        self.inputs.send(input).await.unwrap();
        settle().await;
    }

    async fn event(&self, event: TransportEvent) {
        self.events.send(event).unwrap();
        settle().await;
    }

    async fn quit(self) -> (SimTransport, Vec<String>) {
        self.inputs.send(Input::Quit).await.unwrap();
        let transport = self.task.await.unwrap().unwrap();
        (transport, self.recorder.lines())
    }
}

/// Let every ready task run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn general() -> Channel {
    Channel::room(1, "general")
}

#[tokio::test(start_paused = true)]
async fn polls_on_start_and_every_interval() {
    let rest = FakeRest::with_channels(vec![general()]);
    let harness = Harness::start(rest.clone());
    settle().await;
    assert_eq!(rest.fetches(), 1);

    tokio::time::sleep(POLL).await;
    settle().await;
    assert_eq!(rest.fetches(), 2);

    let (_, lines) = harness.quit().await;
    assert!(lines.contains(&"notice Connected".to_owned()));
    assert!(lines.iter().filter(|l| l.starts_with("list")).count() >= 2);
}

#[tokio::test(start_paused = true)]
async fn select_then_send() {
    let rest = FakeRest::with_channels(vec![general()]);
    rest.history.lock().unwrap().insert(ChannelId::Room(1), vec![
        InboundMessage::from_json(&wire::room_message(1, 1, 42, "morning")).unwrap(),
        InboundMessage::from_json(&wire::room_message(2, 1, 43, "hi all")).unwrap(),
    ]);
    let harness = Harness::start(rest);
    settle().await;

    harness.input(Input::Select(ChannelId::Room(1))).await;
    harness.input(Input::Send("hello".into())).await;
    let (transport, lines) = harness.quit().await;

    assert!(lines.contains(&"transcript general 0".to_owned()));
    assert!(lines.contains(&"transcript general 2".to_owned()));
    assert!(lines.contains(&"append room:1 hello".to_owned()));

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, SEND_DESTINATION);
    assert!(sent[0].1.contains("\"content\":\"hello\""));
}

#[tokio::test(start_paused = true)]
async fn rejected_intents_become_notices() {
    let harness = Harness::start(FakeRest::with_channels(vec![general()]));
    settle().await;

    harness.input(Input::Send("nobody listening".into())).await;
    harness.input(Input::Select(ChannelId::Room(9))).await;
    harness.input(Input::Notice("Usage: /join <roomId>".into())).await;
    let (transport, lines) = harness.quit().await;

    assert!(lines.contains(&"notice no active channel selected".to_owned()));
    assert!(lines.contains(&"notice unknown channel room:9".to_owned()));
    assert!(lines.contains(&"notice Usage: /join <roomId>".to_owned()));
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delivery_to_inactive_channel_counts_unread() {
    let harness = Harness::start(FakeRest::with_channels(vec![general()]));
    settle().await;

    // Only one topic is live, so the first handle belongs to room 1.
    let body = wire::room_message(10, 1, 42, "ping");
    harness
        .event(TransportEvent::Delivery(Delivery { subscription: SubscriptionId(0), body }))
        .await;
    let (_, lines) = harness.quit().await;

    assert_eq!(lines.last().map(String::as_str), Some("list [room:1=1]"));
}

#[tokio::test(start_paused = true)]
async fn reconnect_resubscribes() {
    let harness = Harness::start(FakeRest::with_channels(vec![general()]));
    settle().await;

    harness.input(Input::Reconnect).await;
    harness.event(TransportEvent::Connected).await;
    let (transport, lines) = harness.quit().await;

    assert!(lines.contains(&"notice Disconnected: reconnecting".to_owned()));
    let subscribes = transport
        .calls()
        .iter()
        .filter(|call| matches!(call, TransportCall::Subscribe(Topic::Room(1), _)))
        .count();
    assert_eq!(subscribes, 2);
}

#[tokio::test(start_paused = true)]
async fn quit_abandons_outstanding_fetches() {
    let rest = FakeRest { hang_history: true, ..FakeRest::with_channels(vec![general()]) };
    let harness = Harness::start(rest);
    settle().await;

    harness.input(Input::Select(ChannelId::Room(1))).await;
    let (transport, lines) = harness.quit().await;

    assert!(!lines.iter().any(|l| l.starts_with("transcript general 1")));
    assert!(!transport.is_connected());
    assert_eq!(transport.calls().last(), Some(&TransportCall::Close));
}
