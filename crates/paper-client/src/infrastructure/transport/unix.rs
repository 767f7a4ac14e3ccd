//! [`ClientSocket`] over a Unix stream socket.

use std::collections::HashMap;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;

use paper_core::protocol::messages::{
    Argument, BindMessage, HelloMessage, ObjectMessage, ProtocolAnnouncement, WireMessage,
    DISPLAY_OBJECT, WIRE_VERSION,
};
use tracing::{debug, warn};

use super::channel::FrameChannel;
use super::{
    ClientSocket, Connector, Endpoint, Event, Listener, ObjectId, ProtocolImplementation,
    ProtocolSpec, TransportError,
};

/// A client connection that owns one Unix stream.
///
/// Dropping it closes the descriptor.
pub struct UnixClientSocket {
    channel: FrameChannel,
    implementations: Vec<ProtocolImplementation>,
    listeners: HashMap<ObjectId, Listener>,
    next_object: ObjectId,
    next_token: u64,
}

impl UnixClientSocket {
    /// Wraps an already-connected stream.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            channel: FrameChannel::new(stream),
            implementations: Vec::new(),
            listeners: HashMap::new(),
            next_object: DISPLAY_OBJECT + 1,
            next_token: 1,
        }
    }

    /// Opens a connection to `endpoint`, or `None` if it cannot be reached.
    pub fn open(endpoint: Endpoint) -> Option<Self> {
        match endpoint {
            Endpoint::Path(path) => match UnixStream::connect(&path) {
                Ok(stream) => Some(Self::from_stream(stream)),
                Err(e) => {
                    debug!("could not connect to {}: {e}", path.display());
                    None
                }
            },
            Endpoint::Descriptor(descriptor) => Some(Self::from_stream(descriptor.into_stream())),
        }
    }

    fn allocate_object(&mut self) -> ObjectId {
        let id = self.next_object;
        self.next_object += 1;
        id
    }

    fn send(&mut self, msg: WireMessage) -> Result<(), TransportError> {
        self.channel.send(&msg, &[])
    }

    /// Reads frames until a non-event message arrives, dispatching events to
    /// their listeners on the way.
    fn next_control(&mut self) -> Result<WireMessage, TransportError> {
        loop {
            let (msg, fds) = self.channel.recv()?;
            match msg {
                WireMessage::Event(event) => self.dispatch(event, fds),
                WireMessage::Fatal(fatal) => {
                    return Err(TransportError::Fatal {
                        object: fatal.object,
                        code: fatal.code,
                        message: fatal.message,
                    })
                }
                other => return Ok(other),
            }
        }
    }

    fn dispatch(&mut self, event: ObjectMessage, fds: Vec<OwnedFd>) {
        match self.listeners.get_mut(&event.object) {
            Some(listener) => listener(Event {
                object: event.object,
                opcode: event.opcode,
                args: event.args,
                fds,
            }),
            None => debug!(
                "dropping event {} for object {} without a listener",
                event.opcode, event.object
            ),
        }
    }
}

impl ClientSocket for UnixClientSocket {
    fn add_implementation(&mut self, implementation: ProtocolImplementation) {
        self.implementations.push(implementation);
    }

    fn wait_for_handshake(&mut self) -> bool {
        let hello = WireMessage::Hello(HelloMessage {
            version: u32::from(WIRE_VERSION),
            protocols: self
                .implementations
                .iter()
                .map(|imp| ProtocolAnnouncement {
                    name: imp.name().to_string(),
                    version: imp.version(),
                })
                .collect(),
        });
        if let Err(e) = self.send(hello) {
            warn!("handshake send failed: {e}");
            return false;
        }
        match self.next_control() {
            Ok(WireMessage::HelloAck(ack)) if ack.accepted => true,
            Ok(WireMessage::HelloAck(ack)) => {
                debug!("peer refused handshake (peer wire version {})", ack.version);
                false
            }
            Ok(other) => {
                debug!("expected HelloAck, got {:?}", other.message_type());
                false
            }
            Err(e) => {
                debug!("handshake did not complete: {e}");
                false
            }
        }
    }

    fn get_spec(&mut self, name: &str) -> Result<Option<ProtocolSpec>, TransportError> {
        self.send(WireMessage::GetSpec {
            name: name.to_string(),
        })?;
        match self.next_control()? {
            WireMessage::Spec { name: found, version } if found == name => {
                Ok(Some(ProtocolSpec { name: found, version }))
            }
            WireMessage::SpecMissing { name: missing } if missing == name => Ok(None),
            other => Err(TransportError::Unexpected(other.message_type())),
        }
    }

    fn bind_protocol(&mut self, spec: &ProtocolSpec, version: u32) -> Result<ObjectId, TransportError> {
        if !self.implementations.iter().any(|imp| imp.name() == spec.name) {
            return Err(TransportError::NotImplemented(spec.name.clone()));
        }

        let object = self.allocate_object();
        self.send(WireMessage::Bind(BindMessage {
            object,
            protocol: spec.name.clone(),
            version,
        }))?;
        match self.next_control()? {
            WireMessage::BindAck { object: acked, accepted: true } if acked == object => Ok(object),
            WireMessage::BindAck { object: acked, accepted: false } if acked == object => {
                Err(TransportError::BindRejected {
                    protocol: spec.name.clone(),
                    version,
                })
            }
            other => Err(TransportError::Unexpected(other.message_type())),
        }
    }

    fn create_object(
        &mut self,
        parent: ObjectId,
        opcode: u16,
        args: Vec<Argument>,
    ) -> Result<ObjectId, TransportError> {
        let object = self.allocate_object();
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Argument::NewId(object));
        full.extend(args);
        self.send_request(parent, opcode, full)?;
        Ok(object)
    }

    fn set_listener(&mut self, object: ObjectId, listener: Listener) {
        self.listeners.insert(object, listener);
    }

    fn send_request(
        &mut self,
        object: ObjectId,
        opcode: u16,
        args: Vec<Argument>,
    ) -> Result<(), TransportError> {
        self.send(WireMessage::Request(ObjectMessage { object, opcode, args }))
    }

    fn roundtrip(&mut self) -> Result<(), TransportError> {
        let token = self.next_token;
        self.next_token += 1;
        self.send(WireMessage::Roundtrip { token })?;
        loop {
            match self.next_control()? {
                WireMessage::RoundtripDone { token: done } if done == token => return Ok(()),
                WireMessage::RoundtripDone { token: stale } => {
                    debug!("ignoring completion of earlier round trip {stale}")
                }
                other => return Err(TransportError::Unexpected(other.message_type())),
            }
        }
    }
}

/// [`Connector`] that opens [`UnixClientSocket`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixConnector;

impl Connector for UnixConnector {
    fn open(&self, endpoint: Endpoint) -> Option<Box<dyn ClientSocket>> {
        UnixClientSocket::open(endpoint).map(|socket| Box::new(socket) as Box<dyn ClientSocket>)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::interfaces::wallpaper;
    use paper_core::protocol::messages::HelloAckMessage;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;

    /// Runs `script` as the peer on the other end of a socket pair.
    fn with_peer<F>(script: F) -> (UnixClientSocket, thread::JoinHandle<()>)
    where
        F: FnOnce(FrameChannel) + Send + 'static,
    {
        let (client, server) = UnixStream::pair().expect("socketpair");
        let handle = thread::spawn(move || script(FrameChannel::new(server)));
        (UnixClientSocket::from_stream(client), handle)
    }

    fn wallpaper_impl() -> ProtocolImplementation {
        ProtocolImplementation::new(wallpaper::PROTOCOL)
    }

    #[test]
    fn test_handshake_announces_registered_protocols() {
        // Arrange
        let (mut socket, peer) = with_peer(|mut ch| {
            let (msg, _) = ch.recv().unwrap();
            let WireMessage::Hello(hello) = msg else {
                panic!("expected Hello")
            };
            assert_eq!(hello.protocols[0].name, "hyprpaper_core");
            assert_eq!(hello.protocols[0].version, 1);
            ch.send(
                &WireMessage::HelloAck(HelloAckMessage {
                    version: 1,
                    accepted: true,
                }),
                &[],
            )
            .unwrap();
        });
        socket.add_implementation(wallpaper_impl());

        // Act / Assert
        assert!(socket.wait_for_handshake());
        peer.join().unwrap();
    }

    #[test]
    fn test_handshake_fails_when_peer_hangs_up() {
        let (mut socket, peer) = with_peer(|mut ch| {
            let _ = ch.recv();
        });
        socket.add_implementation(wallpaper_impl());

        assert!(!socket.wait_for_handshake());
        peer.join().unwrap();
    }

    #[test]
    fn test_get_spec_distinguishes_missing_protocol() {
        let (mut socket, peer) = with_peer(|mut ch| {
            let _ = ch.recv().unwrap();
            ch.send(&WireMessage::SpecMissing { name: "hyprpaper_core".into() }, &[])
                .unwrap();
        });

        let spec = socket.get_spec("hyprpaper_core").unwrap();

        assert!(spec.is_none());
        peer.join().unwrap();
    }

    #[test]
    fn test_bind_without_local_implementation_is_refused_locally() {
        let (mut socket, peer) = with_peer(|_| {});
        let spec = ProtocolSpec {
            name: "hyprpaper_core".into(),
            version: 1,
        };

        let result = socket.bind_protocol(&spec, 1);

        assert!(matches!(result, Err(TransportError::NotImplemented(_))));
        peer.join().unwrap();
    }

    #[test]
    fn test_bind_rejection_is_reported() {
        let (mut socket, peer) = with_peer(|mut ch| {
            let (msg, _) = ch.recv().unwrap();
            let WireMessage::Bind(bind) = msg else {
                panic!("expected Bind")
            };
            ch.send(
                &WireMessage::BindAck {
                    object: bind.object,
                    accepted: false,
                },
                &[],
            )
            .unwrap();
        });
        socket.add_implementation(wallpaper_impl());
        let spec = ProtocolSpec {
            name: "hyprpaper_core".into(),
            version: 1,
        };

        let result = socket.bind_protocol(&spec, 1);

        assert!(matches!(result, Err(TransportError::BindRejected { version: 1, .. })));
        peer.join().unwrap();
    }

    #[test]
    fn test_roundtrip_dispatches_events_before_returning() {
        // Arrange: the peer answers the round trip only after emitting an event.
        let (mut socket, peer) = with_peer(|mut ch| {
            let (msg, _) = ch.recv().unwrap();
            let WireMessage::Request(req) = msg else {
                panic!("expected Request")
            };
            let Argument::NewId(object) = req.args[0] else {
                panic!("expected new_id")
            };
            let (msg, _) = ch.recv().unwrap();
            let WireMessage::Roundtrip { token } = msg else {
                panic!("expected Roundtrip")
            };
            ch.send(
                &WireMessage::Event(ObjectMessage {
                    object,
                    opcode: 1,
                    args: vec![Argument::Uint(9)],
                }),
                &[],
            )
            .unwrap();
            ch.send(&WireMessage::RoundtripDone { token }, &[]).unwrap();
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let object = socket.create_object(1, 0, vec![]).unwrap();
        let sink = Rc::clone(&seen);
        socket.set_listener(
            object,
            Box::new(move |event: Event| sink.borrow_mut().push((event.opcode, event.args))),
        );

        // Act
        socket.roundtrip().unwrap();

        // Assert
        assert_eq!(*seen.borrow(), vec![(1, vec![Argument::Uint(9)])]);
        peer.join().unwrap();
    }

    #[test]
    fn test_fatal_message_aborts_roundtrip() {
        let (mut socket, peer) = with_peer(|mut ch| {
            let _ = ch.recv().unwrap();
            ch.send(
                &WireMessage::Fatal(paper_core::protocol::messages::FatalMessage {
                    object: 2,
                    code: 5,
                    message: "invalid object".into(),
                }),
                &[],
            )
            .unwrap();
        });

        let result = socket.roundtrip();

        assert!(matches!(result, Err(TransportError::Fatal { object: 2, code: 5, .. })));
        peer.join().unwrap();
    }

    #[test]
    fn test_open_missing_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::Path(dir.path().join("absent.sock"));

        assert!(UnixClientSocket::open(endpoint).is_none());
    }
}
