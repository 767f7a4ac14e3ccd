//! In-process fake peers for integration tests.
//!
//! Each fake speaks the real wire protocol through a [`FrameChannel`] on its
//! own thread: it answers the handshake, spec lookup and bind, feeds every
//! object request to a handler, answers round trips, and returns the
//! requests it saw once the client hangs up.

#![allow(dead_code)]

use std::os::fd::AsFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use paper_client::infrastructure::environment::{
    EnvironmentMap, DISPLAY_TOKEN, HOME, INSTANCE_SIGNATURE, RUNTIME_DIR,
};
use paper_client::infrastructure::transport::channel::FrameChannel;
use paper_core::interfaces::{broker, wallpaper};
use paper_core::protocol::messages::{Argument, HelloAckMessage, ObjectMessage, WireMessage};

pub const SIGNATURE: &str = "abc";
pub const DISPLAY: &str = "wayland-1";

/// A runtime directory laid out like a live session, plus a home directory
/// holding `pic.png`.
pub struct Session {
    pub dir: tempfile::TempDir,
}

impl Session {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("hypr").join(SIGNATURE)).unwrap();
        std::fs::create_dir_all(dir.path().join("hyprwire")).unwrap();
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        std::fs::write(dir.path().join("home").join("pic.png"), b"png").unwrap();
        Self { dir }
    }

    pub fn service_path(&self) -> PathBuf {
        self.dir.path().join("hypr").join(SIGNATURE).join(".hyprpaper.sock")
    }

    pub fn broker_path(&self) -> PathBuf {
        self.dir.path().join("hyprwire").join("broker.sock")
    }

    pub fn picture(&self) -> PathBuf {
        self.dir.path().join("home").join("pic.png").canonicalize().unwrap()
    }

    /// Environment without a display token, so discovery is skipped.
    pub fn env(&self) -> EnvironmentMap {
        EnvironmentMap::new()
            .with(RUNTIME_DIR, self.dir.path().to_string_lossy())
            .with(INSTANCE_SIGNATURE, SIGNATURE)
            .with(HOME, self.dir.path().join("home").to_string_lossy())
    }

    /// Environment with a display token, so discovery is attempted.
    pub fn env_with_display(&self) -> EnvironmentMap {
        self.env().with(DISPLAY_TOKEN, DISPLAY)
    }
}

/// Serves `protocol` on `stream` until the client disconnects.
///
/// `on_request` sees every object request and may send events in reply
/// before the next round trip is answered.
pub fn serve<F>(stream: UnixStream, protocol: &str, mut on_request: F) -> Vec<ObjectMessage>
where
    F: FnMut(&ObjectMessage, &mut FrameChannel),
{
    let mut channel = FrameChannel::new(stream);
    let mut seen = Vec::new();
    while let Ok((msg, _fds)) = channel.recv() {
        let reply = match msg {
            WireMessage::Hello(_) => Some(WireMessage::HelloAck(HelloAckMessage {
                version: 1,
                accepted: true,
            })),
            WireMessage::GetSpec { name } if name == protocol => {
                Some(WireMessage::Spec { name, version: 1 })
            }
            WireMessage::GetSpec { name } => Some(WireMessage::SpecMissing { name }),
            WireMessage::Bind(bind) => Some(WireMessage::BindAck {
                object: bind.object,
                accepted: bind.version == 1,
            }),
            WireMessage::Request(request) => {
                on_request(&request, &mut channel);
                seen.push(request);
                None
            }
            WireMessage::Roundtrip { token } => Some(WireMessage::RoundtripDone { token }),
            _ => None,
        };
        if let Some(reply) = reply {
            if channel.send(&reply, &[]).is_err() {
                break;
            }
        }
    }
    seen
}

/// Wallpaper service behaviour: report `failure` (or success) on `apply`.
pub fn wallpaper_handler(failure: Option<u32>) -> impl FnMut(&ObjectMessage, &mut FrameChannel) {
    move |request: &ObjectMessage, channel: &mut FrameChannel| {
        if request.opcode != wallpaper::wallpaper_object::APPLY {
            return;
        }
        let (opcode, args) = match failure {
            Some(code) => (wallpaper::wallpaper_object::EVENT_FAILED, vec![Argument::Uint(code)]),
            None => (wallpaper::wallpaper_object::EVENT_SUCCESS, vec![]),
        };
        let event = WireMessage::Event(ObjectMessage {
            object: request.object,
            opcode,
            args,
        });
        channel.send(&event, &[]).unwrap();
    }
}

/// Broker behaviour: answer every query with `candidates`, and hand over
/// `target` (if any) when a handle connects.
pub fn broker_handler(
    candidates: Vec<u32>,
    mut target: Option<UnixStream>,
) -> impl FnMut(&ObjectMessage, &mut FrameChannel) {
    let mut query_object = None;
    let mut handle_object = None;
    move |request: &ObjectMessage, channel: &mut FrameChannel| {
        let new_id = match request.args.first() {
            Some(Argument::NewId(id)) => Some(*id),
            _ => None,
        };
        match (request.object, request.opcode) {
            (1, broker::manager::GET_QUERY_OBJECT) => query_object = new_id,
            (1, broker::manager::GET_HANDLE) => handle_object = new_id,
            (object, broker::query::SUBMIT) if Some(object) == query_object => {
                let event = WireMessage::Event(ObjectMessage {
                    object,
                    opcode: broker::query::EVENT_RESULTS,
                    args: vec![Argument::UintArray(candidates.clone())],
                });
                channel.send(&event, &[]).unwrap();
            }
            (object, broker::handle::CONNECT) if Some(object) == handle_object => {
                if let Some(stream) = target.take() {
                    let event = WireMessage::Event(ObjectMessage {
                        object,
                        opcode: broker::handle::EVENT_FD,
                        args: vec![Argument::Fd],
                    });
                    channel.send(&event, &[stream.as_fd()]).unwrap();
                }
            }
            _ => {}
        }
    }
}

/// Accepts one connection on `path` and serves it on a thread.
pub fn listen<F>(path: &Path, protocol: &'static str, handler: F) -> JoinHandle<Vec<ObjectMessage>>
where
    F: FnMut(&ObjectMessage, &mut FrameChannel) + Send + 'static,
{
    let listener = UnixListener::bind(path).expect("bind fake socket");
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        serve(stream, protocol, handler)
    })
}

/// Serves `protocol` on an already-connected stream on a thread.
pub fn spawn_on<F>(stream: UnixStream, protocol: &'static str, handler: F) -> JoinHandle<Vec<ObjectMessage>>
where
    F: FnMut(&ObjectMessage, &mut FrameChannel) + Send + 'static,
{
    thread::spawn(move || serve(stream, protocol, handler))
}

/// Arguments of every request in `seen` sent to `object` with `opcode`.
pub fn args_of(seen: &[ObjectMessage], object: u32, opcode: u16) -> Vec<Vec<Argument>> {
    seen.iter()
        .filter(|request| request.object == object && request.opcode == opcode)
        .map(|request| request.args.clone())
        .collect()
}
