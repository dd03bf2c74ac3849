//! Line-oriented console front end.
//!
//! Input is read from stdin one line at a time. Lines starting with `/` are
//! commands; anything else is sent to the active channel. Output is plain
//! text written to any [`Write`] sink.

use std::{
    fmt::Write as _,
    io::{self, Write},
};

use chrono::{DateTime, NaiveDateTime};
use parley_core::{Channel, ChannelId, ChannelKind, ChannelRegistry, ChatMessage};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

use crate::runtime::{Input, Renderer};

const ACTIVE_PREFIX: &str = ">";
const INACTIVE_PREFIX: &str = " ";
const ROOM_PREFIX: &str = "#";
const DIRECT_PREFIX: &str = "@";
const LOCAL_MARKER: &str = "~";

const HELP: &str = "Commands: /rooms  /join <roomId>  /dm <userId>  /away  /back  /reconnect  /quit";

/// Parse one line of user input.
///
/// Returns `None` for blank lines. Malformed commands become
/// [`Input::Notice`] carrying a usage hint.
pub fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(Input::Send(line.to_owned()));
    };

    let parts: Vec<&str> = command.split_whitespace().collect();
    let name = parts.first().copied().unwrap_or("");
    let arg = parts.get(1).copied();

    let input = match name {
        "rooms" => Input::ListChannels,
        "join" => match arg.map(str::parse) {
            Some(Ok(room)) => Input::Select(ChannelId::Room(room)),
            Some(Err(_)) => Input::Notice("/join: invalid room ID".into()),
            None => Input::Notice("Usage: /join <roomId>".into()),
        },
        "dm" => match arg.map(str::parse) {
            Some(Ok(peer)) => Input::Select(ChannelId::Direct(peer)),
            Some(Err(_)) => Input::Notice("/dm: invalid user ID".into()),
            None => Input::Notice("Usage: /dm <userId>".into()),
        },
        "away" => Input::Visible(false),
        "back" => Input::Visible(true),
        "reconnect" => Input::Reconnect,
        "quit" | "q" => Input::Quit,
        "help" => Input::Notice(HELP.into()),
        other => Input::Notice(format!("Unknown command: /{other}. {HELP}")),
    };
    Some(input)
}

/// Read stdin on a background task, forwarding parsed lines.
///
/// Sends [`Input::Quit`] when stdin ends.
pub fn spawn_stdin(inputs: mpsc::Sender<Input>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let input = match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    Some(input) => input,
                    None => continue,
                },
                Ok(None) => Input::Quit,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    Input::Quit
                },
            };
            let quit = input == Input::Quit;
            if inputs.send(input).await.is_err() || quit {
                return;
            }
        }
    })
}

/// Time of day for a server or optimistic timestamp.
///
/// Accepts RFC 3339 and zone-less ISO timestamps. Anything else is shown as
/// received.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return at.format("%H:%M").to_string();
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return at.format("%H:%M").to_string();
    }
    raw.to_owned()
}

/// Plain-text [`Renderer`].
#[derive(Debug)]
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    /// Render to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the renderer, returning the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn message_line(&mut self, message: &ChatMessage) -> io::Result<()> {
        let marker = if message.local { LOCAL_MARKER } else { "" };
        writeln!(
            self.out,
            "[{}] {}{}: {}",
            format_timestamp(&message.timestamp),
            marker,
            message.sender_label(),
            message.content
        )
    }
}

fn channel_label(channel: &Channel) -> String {
    match channel.id.kind() {
        ChannelKind::Room => format!("{ROOM_PREFIX}{}", channel.display_name),
        ChannelKind::Direct => format!("{DIRECT_PREFIX}{}", channel.display_name),
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn channel_list(
        &mut self,
        registry: &ChannelRegistry,
        active: Option<ChannelId>,
    ) -> io::Result<()> {
        writeln!(self.out, "-- channels --")?;
        for channel in registry.channels() {
            let prefix = if active == Some(channel.id) { ACTIVE_PREFIX } else { INACTIVE_PREFIX };
            let mut line = format!("{prefix} {:<20} {}", channel_label(channel), channel.id);
            match channel.online {
                Some(true) => line.push_str(" online"),
                Some(false) => line.push_str(" offline"),
                None => {},
            }
            let unread = registry.unread(channel.id);
            if unread > 0 {
                let _ = write!(line, " ({unread})");
            }
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }

    fn transcript(
        &mut self,
        channel: Option<&Channel>,
        messages: &[ChatMessage],
    ) -> io::Result<()> {
        match channel {
            Some(channel) => writeln!(self.out, "== {} ==", channel_label(channel))?,
            None => writeln!(self.out, "== no channel ==")?,
        }
        for message in messages {
            self.message_line(message)?;
        }
        self.out.flush()
    }

    fn append(&mut self, _channel: ChannelId, message: &ChatMessage) -> io::Result<()> {
        self.message_line(message)?;
        self.out.flush()
    }

    fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "* {text}")?;
        self.out.flush()
    }
}
