//! AWS event stream framing (`application/vnd.amazon.eventstream`).
//!
//! Each message on the wire:
//!
//! ```text
//! [total_len u32][headers_len u32][prelude_crc u32][headers][payload][message_crc u32]
//! ```
//!
//! All integers are big-endian. `prelude_crc` covers the first 8 bytes and
//! `message_crc` covers everything before it. The decoder is incremental:
//! feed it bytes as they arrive and pull complete messages out.

use thiserror::Error;

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;
const MIN_MESSAGE_LEN: usize = PRELUDE_LEN + CRC_LEN;
/// Upper bound on a single frame.
pub const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventStreamError {
    #[error("prelude checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    PreludeChecksum { expected: u32, actual: u32 },

    #[error("message checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    MessageChecksum { expected: u32, actual: u32 },

    #[error("invalid frame length {0}")]
    InvalidLength(usize),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("stream ended with {0} bytes of an incomplete message")]
    Truncated(usize),
}

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Bytes(Vec<u8>),
    String(String),
    /// Milliseconds since the epoch.
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn type_tag(&self) -> u8 {
        match self {
            Self::Bool(true) => 0,
            Self::Bool(false) => 1,
            Self::Byte(_) => 2,
            Self::Int16(_) => 3,
            Self::Int32(_) => 4,
            Self::Int64(_) => 5,
            Self::Bytes(_) => 6,
            Self::String(_) => 7,
            Self::Timestamp(_) => 8,
            Self::Uuid(_) => 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: Vec::new(),
            payload: payload.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: HeaderValue) -> Self {
        self.headers.push((name.into(), value));
        self
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// A string header, if present and string-typed.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(HeaderValue::as_str)
    }
}

/// Incremental decoder.
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// The next complete message, or `None` if more bytes are needed.
    pub fn next_message(&mut self) -> Result<Option<Message>, EventStreamError> {
        if self.buffer.len() < PRELUDE_LEN {
            return Ok(None);
        }

        let total_len = read_u32(&self.buffer[0..4]) as usize;
        let headers_len = read_u32(&self.buffer[4..8]) as usize;
        let prelude_crc = read_u32(&self.buffer[8..12]);

        let actual = crc32fast::hash(&self.buffer[0..8]);
        if actual != prelude_crc {
            return Err(EventStreamError::PreludeChecksum {
                expected: prelude_crc,
                actual,
            });
        }
        if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&total_len)
            || headers_len > total_len - MIN_MESSAGE_LEN
        {
            return Err(EventStreamError::InvalidLength(total_len));
        }
        if self.buffer.len() < total_len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buffer.drain(..total_len).collect();
        let body_end = total_len - CRC_LEN;
        let message_crc = read_u32(&frame[body_end..]);
        let actual = crc32fast::hash(&frame[..body_end]);
        if actual != message_crc {
            return Err(EventStreamError::MessageChecksum {
                expected: message_crc,
                actual,
            });
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = parse_headers(&frame[PRELUDE_LEN..headers_end])?;
        let payload = frame[headers_end..body_end].to_vec();
        Ok(Some(Message { headers, payload }))
    }

    /// Call once the input is exhausted. Leftover bytes mean a frame was cut off.
    pub fn finish(&self) -> Result<(), EventStreamError> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(EventStreamError::Truncated(self.buffer.len()))
        }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], EventStreamError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| EventStreamError::InvalidHeader("header runs past its section".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], EventStreamError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

fn parse_headers(section: &[u8]) -> Result<Vec<(String, HeaderValue)>, EventStreamError> {
    let mut cursor = Cursor {
        bytes: section,
        pos: 0,
    };
    let mut headers = Vec::new();

    while !cursor.done() {
        let [name_len] = cursor.take_array::<1>()?;
        let name = std::str::from_utf8(cursor.take(name_len as usize)?)
            .map_err(|e| EventStreamError::InvalidHeader(format!("header name: {e}")))?
            .to_string();
        let [tag] = cursor.take_array::<1>()?;

        let value = match tag {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(i8::from_be_bytes(cursor.take_array()?)),
            3 => HeaderValue::Int16(i16::from_be_bytes(cursor.take_array()?)),
            4 => HeaderValue::Int32(i32::from_be_bytes(cursor.take_array()?)),
            5 => HeaderValue::Int64(i64::from_be_bytes(cursor.take_array()?)),
            6 | 7 => {
                let len = u16::from_be_bytes(cursor.take_array()?) as usize;
                let raw = cursor.take(len)?;
                if tag == 6 {
                    HeaderValue::Bytes(raw.to_vec())
                } else {
                    HeaderValue::String(
                        std::str::from_utf8(raw)
                            .map_err(|e| {
                                EventStreamError::InvalidHeader(format!("{name} value: {e}"))
                            })?
                            .to_string(),
                    )
                }
            }
            8 => HeaderValue::Timestamp(i64::from_be_bytes(cursor.take_array()?)),
            9 => HeaderValue::Uuid(cursor.take_array()?),
            other => {
                return Err(EventStreamError::InvalidHeader(format!(
                    "{name} has unknown value type {other}"
                )));
            }
        };
        headers.push((name, value));
    }
    Ok(headers)
}

/// Encode one message. Used by tests and local stand-ins for the runtime.
pub fn encode(message: &Message) -> Vec<u8> {
    let mut headers = Vec::new();
    for (name, value) in &message.headers {
        headers.push(name.len() as u8);
        headers.extend_from_slice(name.as_bytes());
        headers.push(value.type_tag());
        match value {
            HeaderValue::Bool(_) => {}
            HeaderValue::Byte(v) => headers.extend_from_slice(&v.to_be_bytes()),
            HeaderValue::Int16(v) => headers.extend_from_slice(&v.to_be_bytes()),
            HeaderValue::Int32(v) => headers.extend_from_slice(&v.to_be_bytes()),
            HeaderValue::Int64(v) | HeaderValue::Timestamp(v) => {
                headers.extend_from_slice(&v.to_be_bytes())
            }
            HeaderValue::Bytes(raw) => {
                headers.extend_from_slice(&(raw.len() as u16).to_be_bytes());
                headers.extend_from_slice(raw);
            }
            HeaderValue::String(s) => {
                headers.extend_from_slice(&(s.len() as u16).to_be_bytes());
                headers.extend_from_slice(s.as_bytes());
            }
            HeaderValue::Uuid(raw) => headers.extend_from_slice(raw),
        }
    }

    let total_len = MIN_MESSAGE_LEN + headers.len() + message.payload.len();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(&(headers.len() as u32).to_be_bytes());
    let prelude_crc = crc32fast::hash(&out);
    out.extend_from_slice(&prelude_crc.to_be_bytes());
    out.extend_from_slice(&headers);
    out.extend_from_slice(&message.payload);
    let message_crc = crc32fast::hash(&out);
    out.extend_from_slice(&message_crc.to_be_bytes());
    out
}
