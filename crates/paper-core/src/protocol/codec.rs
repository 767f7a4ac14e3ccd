//! Binary codec for encoding and decoding wire-protocol frames.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][fd_count:1][reserved:1][payload_len:4][seq:8][payload:N]
//! ```
//! Total header size: 16 bytes. All multi-byte integers are big-endian.
//! Strings are a u16 length followed by UTF-8 bytes; arrays are a u16 element
//! count followed by the elements.

use crate::protocol::messages::{
    Argument, ArgumentKind, BindMessage, FatalMessage, HelloAckMessage, HelloMessage,
    MessageType, ObjectMessage, ProtocolAnnouncement, WireMessage, HEADER_SIZE, WIRE_VERSION,
};
use thiserror::Error;

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The wire version in the header is not supported.
    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed or built (bad tag, UTF-8 error, oversized field).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The encoded payload length field does not match the actual data available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },
}

/// The fixed-size header in front of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub message_type: MessageType,
    /// Descriptors sent alongside this frame.
    pub fd_count: u8,
    pub payload_len: usize,
    pub sequence_number: u64,
}

impl FrameHeader {
    /// Header plus payload.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_len
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`WireMessage`] into a byte vector including the 16-byte header.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] if a string, array or the
/// descriptor count does not fit its length prefix.
///
/// # Examples
///
/// ```rust
/// use paper_core::protocol::{decode_message, encode_message};
/// use paper_core::protocol::messages::WireMessage;
///
/// let msg = WireMessage::Roundtrip { token: 42 };
/// let bytes = encode_message(&msg, 0).unwrap();
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(msg: &WireMessage, sequence_number: u64) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(msg)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| ProtocolError::MalformedPayload("payload exceeds u32 length".to_string()))?;
    let fd_count = u8::try_from(msg.fd_count())
        .map_err(|_| ProtocolError::MalformedPayload("too many descriptors in one frame".to_string()))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(WIRE_VERSION);
    buf.push(msg.message_type() as u8);
    buf.push(fd_count);
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Parses and validates the header at the start of `bytes`.
///
/// Only the first [`HEADER_SIZE`] bytes are inspected, so a reader can call
/// this before the payload has arrived to learn how much more to wait for.
///
/// # Errors
///
/// Returns [`ProtocolError`] if fewer than [`HEADER_SIZE`] bytes are present,
/// or the version or message type is not recognised.
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != WIRE_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let type_byte = bytes[1];
    let message_type =
        MessageType::try_from(type_byte).map_err(|_| ProtocolError::UnknownMessageType(type_byte))?;

    Ok(FrameHeader {
        message_type,
        fd_count: bytes[2],
        payload_len: read_u32(bytes, 4)? as usize,
        sequence_number: read_u64(bytes, 8)?,
    })
}

/// Decodes one [`WireMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(WireMessage, usize), ProtocolError> {
    let header = decode_header(bytes)?;
    let total_needed = header.frame_len();
    if bytes.len() < total_needed {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: header.payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = &bytes[HEADER_SIZE..total_needed];
    let msg = decode_payload(header.message_type, payload)?;
    if msg.fd_count() != header.fd_count as usize {
        return Err(ProtocolError::MalformedPayload(format!(
            "header announces {} descriptors, payload has {}",
            header.fd_count,
            msg.fd_count()
        )));
    }
    Ok((msg, total_needed))
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &WireMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    match msg {
        WireMessage::Hello(m) => encode_hello(&mut buf, m)?,
        WireMessage::HelloAck(m) => {
            buf.extend_from_slice(&m.version.to_be_bytes());
            write_bool(&mut buf, m.accepted);
        }
        WireMessage::GetSpec { name } | WireMessage::SpecMissing { name } => {
            write_string(&mut buf, name)?
        }
        WireMessage::Spec { name, version } => {
            write_string(&mut buf, name)?;
            buf.extend_from_slice(&version.to_be_bytes());
        }
        WireMessage::Bind(m) => {
            buf.extend_from_slice(&m.object.to_be_bytes());
            write_string(&mut buf, &m.protocol)?;
            buf.extend_from_slice(&m.version.to_be_bytes());
        }
        WireMessage::BindAck { object, accepted } => {
            buf.extend_from_slice(&object.to_be_bytes());
            write_bool(&mut buf, *accepted);
        }
        WireMessage::Request(m) | WireMessage::Event(m) => encode_object_message(&mut buf, m)?,
        WireMessage::Roundtrip { token } | WireMessage::RoundtripDone { token } => {
            buf.extend_from_slice(&token.to_be_bytes())
        }
        WireMessage::Fatal(m) => {
            buf.extend_from_slice(&m.object.to_be_bytes());
            buf.extend_from_slice(&m.code.to_be_bytes());
            write_string(&mut buf, &m.message)?;
        }
    }
    Ok(buf)
}

fn encode_hello(buf: &mut Vec<u8>, m: &HelloMessage) -> Result<(), ProtocolError> {
    buf.extend_from_slice(&m.version.to_be_bytes());
    write_count(buf, m.protocols.len(), "Hello.protocols")?;
    for protocol in &m.protocols {
        write_string(buf, &protocol.name)?;
        buf.extend_from_slice(&protocol.version.to_be_bytes());
    }
    Ok(())
}

fn encode_object_message(buf: &mut Vec<u8>, m: &ObjectMessage) -> Result<(), ProtocolError> {
    buf.extend_from_slice(&m.object.to_be_bytes());
    buf.extend_from_slice(&m.opcode.to_be_bytes());
    write_count(buf, m.args.len(), "arguments")?;
    for arg in &m.args {
        buf.push(arg.kind() as u8);
        match arg {
            Argument::Uint(v) | Argument::NewId(v) => buf.extend_from_slice(&v.to_be_bytes()),
            Argument::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
            Argument::Str(s) => write_string(buf, s)?,
            Argument::StrArray(items) => {
                write_count(buf, items.len(), "string array")?;
                for item in items {
                    write_string(buf, item)?;
                }
            }
            Argument::UintArray(items) => {
                write_count(buf, items.len(), "uint array")?;
                for item in items {
                    buf.extend_from_slice(&item.to_be_bytes());
                }
            }
            Argument::Fd => {}
        }
    }
    Ok(())
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(msg_type: MessageType, p: &[u8]) -> Result<WireMessage, ProtocolError> {
    match msg_type {
        MessageType::Hello => decode_hello(p).map(WireMessage::Hello),
        MessageType::HelloAck => {
            require_len(p, 5, "HelloAck")?;
            Ok(WireMessage::HelloAck(HelloAckMessage {
                version: read_u32(p, 0)?,
                accepted: p[4] != 0,
            }))
        }
        MessageType::GetSpec => {
            let (name, _) = read_string(p, 0)?;
            Ok(WireMessage::GetSpec { name })
        }
        MessageType::Spec => {
            let (name, end) = read_string(p, 0)?;
            let version = read_u32(p, end)?;
            Ok(WireMessage::Spec { name, version })
        }
        MessageType::SpecMissing => {
            let (name, _) = read_string(p, 0)?;
            Ok(WireMessage::SpecMissing { name })
        }
        MessageType::Bind => {
            let object = read_u32(p, 0)?;
            let (protocol, end) = read_string(p, 4)?;
            let version = read_u32(p, end)?;
            Ok(WireMessage::Bind(BindMessage {
                object,
                protocol,
                version,
            }))
        }
        MessageType::BindAck => {
            require_len(p, 5, "BindAck")?;
            Ok(WireMessage::BindAck {
                object: read_u32(p, 0)?,
                accepted: p[4] != 0,
            })
        }
        MessageType::Request => decode_object_message(p).map(WireMessage::Request),
        MessageType::Event => decode_object_message(p).map(WireMessage::Event),
        MessageType::Roundtrip => Ok(WireMessage::Roundtrip {
            token: read_u64(p, 0)?,
        }),
        MessageType::RoundtripDone => Ok(WireMessage::RoundtripDone {
            token: read_u64(p, 0)?,
        }),
        MessageType::Fatal => {
            let object = read_u32(p, 0)?;
            let code = read_u32(p, 4)?;
            let (message, _) = read_string(p, 8)?;
            Ok(WireMessage::Fatal(FatalMessage {
                object,
                code,
                message,
            }))
        }
    }
}

fn decode_hello(p: &[u8]) -> Result<HelloMessage, ProtocolError> {
    let version = read_u32(p, 0)?;
    let count = read_u16(p, 4)? as usize;
    let mut protocols = Vec::with_capacity(count);
    let mut off = 6;
    for _ in 0..count {
        let (name, end) = read_string(p, off)?;
        let version = read_u32(p, end)?;
        protocols.push(ProtocolAnnouncement { name, version });
        off = end + 4;
    }
    Ok(HelloMessage { version, protocols })
}

fn decode_object_message(p: &[u8]) -> Result<ObjectMessage, ProtocolError> {
    // 4 (object) + 2 (opcode) + 2 (arg count)
    require_len(p, 8, "ObjectMessage")?;
    let object = read_u32(p, 0)?;
    let opcode = read_u16(p, 4)?;
    let count = read_u16(p, 6)? as usize;
    let mut args = Vec::with_capacity(count);
    let mut off = 8;
    for _ in 0..count {
        require_len(p, off + 1, "argument tag")?;
        let tag = p[off];
        let kind = ArgumentKind::try_from(tag)
            .map_err(|_| ProtocolError::MalformedPayload(format!("unknown argument tag: 0x{tag:02X}")))?;
        off += 1;
        let arg = match kind {
            ArgumentKind::Uint => {
                let v = read_u32(p, off)?;
                off += 4;
                Argument::Uint(v)
            }
            ArgumentKind::NewId => {
                let v = read_u32(p, off)?;
                off += 4;
                Argument::NewId(v)
            }
            ArgumentKind::Int => {
                let v = read_u32(p, off)? as i32;
                off += 4;
                Argument::Int(v)
            }
            ArgumentKind::Str => {
                let (s, end) = read_string(p, off)?;
                off = end;
                Argument::Str(s)
            }
            ArgumentKind::StrArray => {
                let n = read_u16(p, off)? as usize;
                off += 2;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    let (s, end) = read_string(p, off)?;
                    off = end;
                    items.push(s);
                }
                Argument::StrArray(items)
            }
            ArgumentKind::UintArray => {
                let n = read_u16(p, off)? as usize;
                off += 2;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(read_u32(p, off)?);
                    off += 4;
                }
                Argument::UintArray(items)
            }
            ArgumentKind::Fd => Argument::Fd,
        };
        args.push(arg);
    }
    Ok(ObjectMessage { object, opcode, args })
}

// ── Byte helpers ──────────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    let bytes = take::<2>(buf, offset)?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    let bytes = take::<4>(buf, offset)?;
    Ok(u32::from_be_bytes(bytes))
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    let bytes = take::<8>(buf, offset)?;
    Ok(u64::from_be_bytes(bytes))
}

fn take<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], ProtocolError> {
    let end = offset + N;
    if buf.len() < end {
        return Err(ProtocolError::InsufficientData {
            needed: end,
            available: buf.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..end]);
    Ok(out)
}

fn write_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(if value { 0x01 } else { 0x00 });
}

fn write_count(buf: &mut Vec<u8>, count: usize, context: &str) -> Result<(), ProtocolError> {
    let count = u16::try_from(count)
        .map_err(|_| ProtocolError::MalformedPayload(format!("{context}: too many elements ({count})")))?;
    buf.extend_from_slice(&count.to_be_bytes());
    Ok(())
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtocolError> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len())
        .map_err(|_| ProtocolError::MalformedPayload(format!("string of {} bytes is too long", bytes.len())))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 2 bytes for string length at offset {offset}"
        )));
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
