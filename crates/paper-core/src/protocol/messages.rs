//! All wire-protocol message types.
//!
//! A connection carries two kinds of traffic.  *Control* messages
//! (handshake, spec lookup, binding, round trips) are understood by the
//! transport itself.  *Object* messages ([`WireMessage::Request`] and
//! [`WireMessage::Event`]) address a remote object by id and carry an opcode
//! plus a list of typed [`Argument`]s whose meaning is defined by the bound
//! interface (see [`crate::interfaces`]).

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current wire format version byte.
pub const WIRE_VERSION: u8 = 0x01;

/// Total size of the common frame header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Object id of the connection itself; never handed out to a bound object.
pub const DISPLAY_OBJECT: u32 = 0;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes understood on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    // Handshake (0x01–0x0F)
    Hello = 0x01,
    HelloAck = 0x02,
    // Protocol lookup and binding (0x10–0x1F)
    GetSpec = 0x10,
    Spec = 0x11,
    SpecMissing = 0x12,
    Bind = 0x13,
    BindAck = 0x14,
    // Object traffic (0x20–0x2F)
    Request = 0x20,
    Event = 0x21,
    // Synchronisation (0x30–0x3F)
    Roundtrip = 0x30,
    RoundtripDone = 0x31,
    Fatal = 0x3F,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Hello),
            0x02 => Ok(MessageType::HelloAck),
            0x10 => Ok(MessageType::GetSpec),
            0x11 => Ok(MessageType::Spec),
            0x12 => Ok(MessageType::SpecMissing),
            0x13 => Ok(MessageType::Bind),
            0x14 => Ok(MessageType::BindAck),
            0x20 => Ok(MessageType::Request),
            0x21 => Ok(MessageType::Event),
            0x30 => Ok(MessageType::Roundtrip),
            0x31 => Ok(MessageType::RoundtripDone),
            0x3F => Ok(MessageType::Fatal),
            _ => Err(()),
        }
    }
}

// ── Arguments ─────────────────────────────────────────────────────────────────

/// Type tag written before every argument in a request or event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArgumentKind {
    Uint = 0x01,
    Int = 0x02,
    Str = 0x03,
    StrArray = 0x04,
    UintArray = 0x05,
    NewId = 0x06,
    Fd = 0x07,
}

impl TryFrom<u8> for ArgumentKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ArgumentKind::Uint),
            0x02 => Ok(ArgumentKind::Int),
            0x03 => Ok(ArgumentKind::Str),
            0x04 => Ok(ArgumentKind::StrArray),
            0x05 => Ok(ArgumentKind::UintArray),
            0x06 => Ok(ArgumentKind::NewId),
            0x07 => Ok(ArgumentKind::Fd),
            _ => Err(()),
        }
    }
}

/// One typed argument of a request or event.
///
/// [`Argument::Fd`] is only a placeholder in the byte stream: the descriptor
/// itself travels out-of-band, and the frame header records how many
/// descriptors accompany the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Uint(u32),
    Int(i32),
    Str(String),
    StrArray(Vec<String>),
    UintArray(Vec<u32>),
    /// Id the sender allocated for an object created by this request.
    NewId(u32),
    Fd,
}

impl Argument {
    /// Returns the wire tag for this argument.
    pub fn kind(&self) -> ArgumentKind {
        match self {
            Argument::Uint(_) => ArgumentKind::Uint,
            Argument::Int(_) => ArgumentKind::Int,
            Argument::Str(_) => ArgumentKind::Str,
            Argument::StrArray(_) => ArgumentKind::StrArray,
            Argument::UintArray(_) => ArgumentKind::UintArray,
            Argument::NewId(_) => ArgumentKind::NewId,
            Argument::Fd => ArgumentKind::Fd,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Argument::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint_array(&self) -> Option<&[u32]> {
        match self {
            Argument::UintArray(v) => Some(v),
            _ => None,
        }
    }
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// A protocol the sender implements locally, announced during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolAnnouncement {
    pub name: String,
    pub version: u32,
}

/// HELLO (0x01): sent by the client to open the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloMessage {
    /// Wire version the client speaks.
    pub version: u32,
    /// Protocols the client registered implementations for.
    pub protocols: Vec<ProtocolAnnouncement>,
}

/// HELLO_ACK (0x02): the service's answer to a HELLO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloAckMessage {
    pub version: u32,
    pub accepted: bool,
}

/// BIND (0x13): create a manager object for a named protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMessage {
    /// Client-allocated id for the new manager object.
    pub object: u32,
    pub protocol: String,
    pub version: u32,
}

/// REQUEST (0x20) and EVENT (0x21) share this layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMessage {
    pub object: u32,
    pub opcode: u16,
    pub args: Vec<Argument>,
}

impl ObjectMessage {
    /// Number of out-of-band descriptors this message carries.
    pub fn fd_count(&self) -> usize {
        self.args.iter().filter(|a| matches!(a, Argument::Fd)).count()
    }
}

/// FATAL (0x3F): the peer hit an unrecoverable error on an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalMessage {
    pub object: u32,
    pub code: u32,
    pub message: String,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// Every message that can travel over a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Hello(HelloMessage),
    HelloAck(HelloAckMessage),
    GetSpec { name: String },
    Spec { name: String, version: u32 },
    SpecMissing { name: String },
    Bind(BindMessage),
    BindAck { object: u32, accepted: bool },
    Request(ObjectMessage),
    Event(ObjectMessage),
    Roundtrip { token: u64 },
    RoundtripDone { token: u64 },
    Fatal(FatalMessage),
}

impl WireMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            WireMessage::Hello(_) => MessageType::Hello,
            WireMessage::HelloAck(_) => MessageType::HelloAck,
            WireMessage::GetSpec { .. } => MessageType::GetSpec,
            WireMessage::Spec { .. } => MessageType::Spec,
            WireMessage::SpecMissing { .. } => MessageType::SpecMissing,
            WireMessage::Bind(_) => MessageType::Bind,
            WireMessage::BindAck { .. } => MessageType::BindAck,
            WireMessage::Request(_) => MessageType::Request,
            WireMessage::Event(_) => MessageType::Event,
            WireMessage::Roundtrip { .. } => MessageType::Roundtrip,
            WireMessage::RoundtripDone { .. } => MessageType::RoundtripDone,
            WireMessage::Fatal(_) => MessageType::Fatal,
        }
    }

    /// Number of descriptors that must accompany this message out-of-band.
    pub fn fd_count(&self) -> usize {
        match self {
            WireMessage::Request(m) | WireMessage::Event(m) => m.fd_count(),
            _ => 0,
        }
    }
}
