//! STOMP 1.2 frame model and wire codec.
//!
//! A frame on the wire is:
//!
//! ```text
//! COMMAND\n
//! name:value\n      (zero or more)
//! \n
//! body\0
//! ```
//!
//! Header values are escaped (`\\`, `\n`, `\r`, `\c`) in every frame except
//! `CONNECT`, `STOMP` and `CONNECTED`.

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::StompError;

/// STOMP frame commands (client and server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let command = match raw {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        };
        Some(command)
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Stomp | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Headers in wire order. Repeated names are kept; lookups use the first.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Serialize the frame to wire bytes.
    ///
    /// A `content-length` header is added for non-empty bodies unless the
    /// caller already set one.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(self.command.as_str().as_bytes());
        out.push(b'\n');

        let escape = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escape {
                out.extend_from_slice(escape_header(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape_header(value).as_bytes());
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }

        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.extend_from_slice(format!("content-length:{}\n", self.body.len()).as_bytes());
        }

        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }
}

/// Escape a header name or value for the wire.
pub fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape_header`]. Undefined escape sequences are a protocol error.
pub fn unescape_header(raw: &str) -> Result<String, StompError> {
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
            Some(other) => {
                return Err(StompError::MalformedFrame(format!(
                    "undefined escape sequence \\{}",
                    other
                )))
            }
            None => {
                return Err(StompError::MalformedFrame(
                    "dangling escape at end of header".to_string(),
                ))
            }
        }
    }
    Ok(out)
}

/// Longest command or header line accepted, in bytes.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Most headers accepted in one frame.
pub const MAX_HEADERS: usize = 128;

/// Largest body accepted, in bytes.
pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

fn trim_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn closed_on_eof(e: std::io::Error) -> StompError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        StompError::ConnectionClosed
    } else {
        StompError::Io(e)
    }
}

/// Read one line of at most [`MAX_LINE_LEN`] bytes, EOL included.
///
/// Returns `Ok(None)` at end of stream.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<String>, StompError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_LINE_LEN as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(None);
    }
    if read > MAX_LINE_LEN {
        return Err(StompError::MalformedFrame(format!(
            "line longer than {} bytes",
            MAX_LINE_LEN
        )));
    }

    let line = std::str::from_utf8(buf)
        .map_err(|_| StompError::MalformedFrame("line is not valid UTF-8".to_string()))?;
    Ok(Some(trim_eol(line).to_string()))
}

/// Read the next frame from `reader`.
///
/// Heart-beat EOLs between frames are skipped. Returns `Ok(None)` when the
/// stream ends cleanly before a new frame starts. Lines, header counts and
/// bodies past [`MAX_LINE_LEN`], [`MAX_HEADERS`] and [`MAX_BODY_LEN`] are
/// rejected as malformed.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, StompError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    let command = loop {
        let line = match read_line(reader, &mut buf).await? {
            Some(line) => line,
            None => return Ok(None),
        };
        if !line.is_empty() {
            break Command::parse(&line).ok_or_else(|| {
                StompError::MalformedFrame(format!("unknown command {:?}", line))
            })?;
        }
    };

    let mut headers = Vec::new();
    loop {
        let line = read_line(reader, &mut buf)
            .await?
            .ok_or(StompError::ConnectionClosed)?;
        if line.is_empty() {
            break;
        }
        if headers.len() == MAX_HEADERS {
            return Err(StompError::MalformedFrame(format!(
                "more than {} headers",
                MAX_HEADERS
            )));
        }
        let (name, value) = line.split_once(':').ok_or_else(|| {
            StompError::MalformedFrame(format!("header without colon: {:?}", line))
        })?;
        if command.escapes_headers() {
            headers.push((unescape_header(name)?, unescape_header(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .map(|(_, v)| {
            v.trim().parse::<usize>().map_err(|_| {
                StompError::MalformedFrame(format!("invalid content-length {:?}", v))
            })
        })
        .transpose()?;

    let body = match content_length {
        Some(len) if len > MAX_BODY_LEN => {
            return Err(StompError::MalformedFrame(format!(
                "content-length {} exceeds {} bytes",
                len, MAX_BODY_LEN
            )));
        }
        Some(len) => {
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body).await.map_err(closed_on_eof)?;
            let terminator = reader.read_u8().await.map_err(closed_on_eof)?;
            if terminator != 0 {
                return Err(StompError::MalformedFrame(
                    "body not terminated by NUL".to_string(),
                ));
            }
            body
        }
        None => {
            let mut body = Vec::new();
            let limit = MAX_BODY_LEN as u64 + 1;
            (&mut *reader).take(limit).read_until(0, &mut body).await?;
            if body.last() != Some(&0) {
                if body.len() > MAX_BODY_LEN {
                    return Err(StompError::MalformedFrame(format!(
                        "body exceeds {} bytes",
                        MAX_BODY_LEN
                    )));
                }
                return Err(StompError::ConnectionClosed);
            }
            body.pop();
            body
        }
    };

    Ok(Some(Frame {
        command,
        headers,
        body,
    }))
}

/// Write `frame` and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), StompError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await?;
    writer.flush().await?;
    Ok(())
}
