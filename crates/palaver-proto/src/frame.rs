//! Broker frame type and text codec.
//!
//! A frame is a command line, zero or more `name:value` header lines, a
//! blank line, and a body terminated by a NUL byte:
//!
//! ```text
//! SEND
//! destination:/app/chat.send
//! content-type:application/json
//!
//! {"conversation_id":42,"content":"hi"}\0
//! ```
//!
//! The codec is a pure data layer: it guarantees structural validity
//! (known command, well-formed headers) and round-trips header values
//! through STOMP-style escaping. Body interpretation happens later, after
//! the frame has been routed by destination.

use std::fmt;

use crate::errors::ProtocolError;

/// Frame commands used by the client and the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake request.
    Connect,
    /// Broker handshake acknowledgement.
    Connected,
    /// Client subscription registration.
    Subscribe,
    /// Client message transmission.
    Send,
    /// Broker delivery to a subscribed destination.
    Message,
    /// Broker-side failure notice. Closes the connection.
    Error,
    /// Client graceful teardown.
    Disconnect,
}

impl Command {
    /// Wire spelling of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// Parse a command line.
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownCommand` for anything not in the closed set.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        match input {
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "SEND" => Ok(Self::Send),
            "MESSAGE" => Ok(Self::Message),
            "ERROR" => Ok(Self::Error),
            "DISCONNECT" => Ok(Self::Disconnect),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single broker frame.
///
/// Headers preserve insertion order; when a name repeats, the first entry
/// wins on lookup (STOMP semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerFrame {
    /// Frame command.
    pub command: Command,
    /// Header pairs in wire order.
    pub headers: Vec<(String, String)>,
    /// Frame body. Empty for control frames.
    pub body: String,
}

impl BrokerFrame {
    /// Create a bare frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header pair.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the frame body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First header value for `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// The `destination` header, used to route `MESSAGE` and `SEND` frames.
    pub fn destination(&self) -> Option<&str> {
        self.header("destination")
    }

    /// Client handshake frame.
    pub fn connect() -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("heart-beat", "0,0")
    }

    /// Client subscription frame for `destination`.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    /// Client transmission frame carrying a JSON body to `destination`.
    pub fn send_to(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Client graceful teardown frame.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Broker handshake acknowledgement (used by tests and harnesses).
    pub fn connected() -> Self {
        Self::new(Command::Connected).with_header("version", "1.2")
    }

    /// Broker delivery frame (used by tests and harnesses).
    pub fn message(destination: &str, subscription: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Message)
            .with_header("destination", destination)
            .with_header("subscription", subscription)
            .with_body(body)
    }

    /// Broker failure frame (used by tests and harnesses).
    pub fn error(message: &str) -> Self {
        Self::new(Command::Error).with_header("message", message)
    }

    /// Encode the frame to its wire form, including the trailing NUL.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len().saturating_add(64));
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(&escape(name));
            out.push(':');
            out.push_str(&escape(value));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode a frame from its wire form.
    ///
    /// A trailing NUL is accepted but not required; carriage returns before
    /// line feeds are tolerated.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EmptyFrame` if the input holds no command line
    /// - `ProtocolError::Truncated` if the header/body separator is missing
    /// - `ProtocolError::UnknownCommand` / `MalformedHeader` on bad lines
    pub fn decode(input: &str) -> Result<Self, ProtocolError> {
        let input = input.strip_suffix('\0').unwrap_or(input);
        if input.trim_matches(['\n', '\r']).is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }

        // The first blank line separates headers from the body. Header lines
        // never contain raw line breaks (they are escaped), so the earliest
        // "\n\n" or "\r\n\r\n" is the separator; the body is left untouched.
        let lf = input.find("\n\n");
        let crlf = input.find("\r\n\r\n");
        let (head, body) = match (lf, crlf) {
            (Some(l), Some(c)) if c < l => (&input[..c], &input[c + 4..]),
            (Some(l), _) => (&input[..l], &input[l + 2..]),
            (None, Some(c)) => (&input[..c], &input[c + 4..]),
            (None, None) => return Err(ProtocolError::Truncated),
        };

        let mut lines = head.lines();
        let command_line = lines.next().ok_or(ProtocolError::EmptyFrame)?;
        let command = Command::parse(command_line)?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader { line: line.to_string() })?;
            headers.push((unescape(name, line)?, unescape(value, line)?));
        }

        Ok(Self { command, headers, body: body.to_string() })
    }
}

/// Escape a header token: `\` `\n` `\r` `:` become two-character sequences.
fn escape(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for ch in token.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape`]. `line` is carried for the error message only.
fn unescape(token: &str, line: &str) -> Result<String, ProtocolError> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::MalformedHeader { line: line.to_string() }),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_send_frame() {
        let frame = BrokerFrame::send_to("/app/chat.send", r#"{"conversation_id":42}"#);
        let wire = frame.encode();

        assert!(wire.starts_with("SEND\n"));
        assert!(wire.contains("destination:/app/chat.send\n"));
        assert!(wire.ends_with("{\"conversation_id\":42}\0"));
    }

    #[test]
    fn decode_message_frame() {
        let wire = "MESSAGE\ndestination:/user/queue/messages\nsubscription:sub-0\n\n{}\0";
        let frame = BrokerFrame::decode(wire).unwrap();

        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.destination(), Some("/user/queue/messages"));
        assert_eq!(frame.header("subscription"), Some("sub-0"));
        assert_eq!(frame.body, "{}");
    }

    #[test]
    fn decode_tolerates_missing_nul_and_crlf() {
        let frame = BrokerFrame::decode("CONNECTED\r\nversion:1.2\r\n\r\n").unwrap();
        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn first_header_wins_on_duplicates() {
        let frame = BrokerFrame::new(Command::Message)
            .with_header("destination", "/a")
            .with_header("destination", "/b");

        assert_eq!(frame.destination(), Some("/a"));
    }

    #[test]
    fn header_values_round_trip_through_escaping() {
        let frame =
            BrokerFrame::new(Command::Error).with_header("message", "bad frame:\nline\\two");
        let decoded = BrokerFrame::decode(&frame.encode()).unwrap();

        assert_eq!(decoded.header("message"), Some("bad frame:\nline\\two"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(BrokerFrame::decode(""), Err(ProtocolError::EmptyFrame));
        assert_eq!(BrokerFrame::decode("\n"), Err(ProtocolError::EmptyFrame));
        assert!(matches!(
            BrokerFrame::decode("NOPE\n\nbody"),
            Err(ProtocolError::UnknownCommand(_))
        ));
        assert!(matches!(
            BrokerFrame::decode("SEND\nno-colon-here\n\n"),
            Err(ProtocolError::MalformedHeader { .. })
        ));
        assert_eq!(BrokerFrame::decode("SEND\ndestination:/a"), Err(ProtocolError::Truncated));
    }

    #[test]
    fn bad_escape_sequence_is_rejected() {
        assert!(matches!(
            BrokerFrame::decode("MESSAGE\nmessage:bad\\x\n\n"),
            Err(ProtocolError::MalformedHeader { .. })
        ));
    }
}
