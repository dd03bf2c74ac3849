//! STOMP 1.2 frame codec.
//!
//! One WebSocket text message carries one STOMP frame:
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! ...\n
//! \n
//! body\0
//! ```
//!
//! Bare end-of-line messages are heart-beats and decode to `None`. Header
//! names and values are escaped (`\\`, `\n`, `\r`, `\c`) on every frame
//! except CONNECT and CONNECTED. When a header repeats, the first occurrence
//! wins.

use std::fmt::Write as _;

use thiserror::Error;

/// Frame decoding errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StompError {
    /// Command line is not a known STOMP command.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// Header line has no `:` separator.
    #[error("malformed header line {0:?}")]
    MalformedHeader(String),

    /// Header contains an undefined escape sequence.
    #[error("invalid escape in {0:?}")]
    InvalidEscape(String),

    /// Frame has no blank line after its headers.
    #[error("frame has no header terminator")]
    MissingHeaderEnd,

    /// Frame is not NUL-terminated.
    #[error("frame is not NUL-terminated")]
    MissingTerminator,

    /// `content-length` is not a number or exceeds the body.
    #[error("bad content-length {0:?}")]
    ContentLength(String),
}

/// STOMP commands used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Server handshake reply.
    Connected,
    /// Open a subscription.
    Subscribe,
    /// Close a subscription.
    Unsubscribe,
    /// Publish to a destination.
    Send,
    /// Delivery on a subscription.
    Message,
    /// Server-side failure. The server closes the connection after it.
    Error,
    /// Acknowledgement of a frame that requested a receipt.
    Receipt,
    /// Graceful client disconnect.
    Disconnect,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Error => "ERROR",
            Self::Receipt => "RECEIPT",
            Self::Disconnect => "DISCONNECT",
        }
    }

    fn parse(line: &str) -> Result<Self, StompError> {
        Ok(match line {
            "CONNECT" | "STOMP" => Self::Connect,
            "CONNECTED" => Self::Connected,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "SEND" => Self::Send,
            "MESSAGE" => Self::Message,
            "ERROR" => Self::Error,
            "RECEIPT" => Self::Receipt,
            "DISCONNECT" => Self::Disconnect,
            other => return Err(StompError::UnknownCommand(other.to_owned())),
        })
    }

    /// CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Frame body.
    pub body: String,
}

impl Frame {
    /// Frame with no headers and no body.
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Handshake carrying the session's `Authorization` header.
    ///
    /// Heart-beating is disabled.
    pub fn connect(host: &str, authorization: &str) -> Self {
        Self::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0")
            .header("Authorization", authorization)
    }

    /// Subscribe to `destination` under subscription `id`.
    pub fn subscribe(id: u64, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id.to_string())
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// Cancel subscription `id`.
    pub fn unsubscribe(id: u64) -> Self {
        Self::new(Command::Unsubscribe).header("id", id.to_string())
    }

    /// Publish a JSON body to `destination`.
    pub fn send(destination: &str, json: impl Into<String>) -> Self {
        let body = json.into();
        Self::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", body.len().to_string())
            .body(body)
    }

    /// Graceful disconnect.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Value of the first header called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Encode for the wire, including the trailing NUL.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                let _ = writeln!(out, "{}:{}", escape_header(name), escape_header(value));
            } else {
                let _ = writeln!(out, "{name}:{value}");
            }
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode one frame. Heart-beats decode to `None`.
    pub fn decode(input: &str) -> Result<Option<Self>, StompError> {
        let input = input.trim_start_matches(['\r', '\n']);
        if input.is_empty() {
            return Ok(None);
        }

        let (head, rest) = split_head(input).ok_or(StompError::MissingHeaderEnd)?;
        let mut lines = head.lines();
        let command = Command::parse(lines.next().unwrap_or_default())?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) =
                line.split_once(':').ok_or_else(|| StompError::MalformedHeader(line.to_owned()))?;
            if command.escapes_headers() {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }

        let mut frame = Self { command, headers, body: String::new() };
        frame.body = match frame.get("content-length") {
            Some(raw) => {
                let len: usize =
                    raw.trim().parse().map_err(|_| StompError::ContentLength(raw.to_owned()))?;
                match (rest.get(..len), rest.get(len..)) {
                    (Some(body), Some(tail)) if tail.starts_with('\0') => body.to_owned(),
                    (Some(_), Some(_)) => return Err(StompError::MissingTerminator),
                    _ => return Err(StompError::ContentLength(raw.to_owned())),
                }
            },
            None => {
                let end = rest.find('\0').ok_or(StompError::MissingTerminator)?;
                rest[..end].to_owned()
            },
        };
        Ok(Some(frame))
    }
}

/// Split at the blank line ending the headers, accepting `\n` or `\r\n`.
fn split_head(input: &str) -> Option<(&str, &str)> {
    let lf = input.find("\n\n").map(|i| (i, 2));
    let crlf = input.find("\r\n\r\n").map(|i| (i, 4));
    let (at, len) = [lf, crlf].into_iter().flatten().min_by_key(|(at, _)| *at)?;
    Some((&input[..at], &input[at + len..]))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape(raw.to_owned())),
        }
    }
    Ok(out)
}
