//! Framed message channel over a Unix stream socket.
//!
//! Frames are written with `sendmsg(2)`; any descriptors a frame carries ride
//! along as `SCM_RIGHTS` ancillary data on the same call, so they arrive no
//! later than the first byte of the frame.  The reader keeps a byte buffer
//! and a descriptor queue and hands out one frame at a time together with
//! the descriptors its header announces.

use std::collections::VecDeque;
use std::io::{IoSlice, IoSliceMut, Write};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use nix::errno::Errno;
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use paper_core::protocol::messages::{WireMessage, HEADER_SIZE};
use paper_core::protocol::{decode_header, decode_message, encode_message};
use tracing::trace;

use super::TransportError;

/// Upper bound on descriptors accepted by a single read.
const MAX_FDS_PER_READ: usize = 8;

const READ_CHUNK: usize = 4096;

/// A bidirectional frame channel that owns its socket.
pub struct FrameChannel {
    stream: UnixStream,
    inbox: Vec<u8>,
    fds: VecDeque<OwnedFd>,
    next_seq: u64,
}

impl FrameChannel {
    pub fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            inbox: Vec::new(),
            fds: VecDeque::new(),
            next_seq: 0,
        }
    }

    /// Encodes and writes one frame, attaching `fds` out-of-band.
    ///
    /// # Errors
    ///
    /// Fails if the number of descriptors differs from the number of fd
    /// placeholders in `msg`, or on any encode or socket error.
    pub fn send(&mut self, msg: &WireMessage, fds: &[BorrowedFd<'_>]) -> Result<(), TransportError> {
        if msg.fd_count() != fds.len() {
            return Err(TransportError::DescriptorMismatch {
                expected: msg.fd_count(),
                available: fds.len(),
            });
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let bytes = encode_message(msg, seq)?;
        trace!(seq, kind = ?msg.message_type(), len = bytes.len(), "send frame");

        if fds.is_empty() {
            self.stream.write_all(&bytes)?;
            return Ok(());
        }

        let raw: Vec<RawFd> = fds.iter().map(|fd| fd.as_raw_fd()).collect();
        let cmsgs = [ControlMessage::ScmRights(&raw)];
        let iov = [IoSlice::new(&bytes)];
        let sent = loop {
            match sendmsg::<()>(self.stream.as_raw_fd(), &iov, &cmsgs, MsgFlags::empty(), None) {
                Err(Errno::EINTR) => continue,
                other => break other?,
            }
        };
        // The descriptors went out with the first chunk; the rest is plain data.
        if sent < bytes.len() {
            self.stream.write_all(&bytes[sent..])?;
        }
        Ok(())
    }

    /// Blocks until one complete frame is available and returns it with the
    /// descriptors it carries.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] on end-of-stream, or any decode/socket error.
    pub fn recv(&mut self) -> Result<(WireMessage, Vec<OwnedFd>), TransportError> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }
            self.fill()?;
        }
    }

    fn take_frame(&mut self) -> Result<Option<(WireMessage, Vec<OwnedFd>)>, TransportError> {
        if self.inbox.len() < HEADER_SIZE {
            return Ok(None);
        }
        let header = decode_header(&self.inbox)?;
        if self.inbox.len() < header.frame_len() {
            return Ok(None);
        }

        let expected = header.fd_count as usize;
        if self.fds.len() < expected {
            return Err(TransportError::DescriptorMismatch {
                expected,
                available: self.fds.len(),
            });
        }

        let (msg, consumed) = decode_message(&self.inbox)?;
        self.inbox.drain(..consumed);
        let fds = self.fds.drain(..expected).collect();
        trace!(seq = header.sequence_number, kind = ?header.message_type, "recv frame");
        Ok(Some((msg, fds)))
    }

    fn fill(&mut self) -> Result<(), TransportError> {
        let mut buf = [0u8; READ_CHUNK];
        let mut cmsg_space = nix::cmsg_space!([RawFd; MAX_FDS_PER_READ]);

        let (read, received, truncated) = loop {
            let mut iov = [IoSliceMut::new(&mut buf)];
            let result = recvmsg::<()>(
                self.stream.as_raw_fd(),
                &mut iov,
                Some(&mut cmsg_space),
                MsgFlags::MSG_CMSG_CLOEXEC,
            );
            let msg = match result {
                Err(Errno::EINTR) => continue,
                other => other?,
            };
            let mut received: Vec<RawFd> = Vec::new();
            for cmsg in msg.cmsgs()? {
                if let ControlMessageOwned::ScmRights(fds) = cmsg {
                    received.extend(fds);
                }
            }
            break (msg.bytes, received, msg.flags.contains(MsgFlags::MSG_CTRUNC));
        };

        // SAFETY: the kernel just installed each descriptor in our table for
        // this message and nothing else refers to it.
        let received: Vec<OwnedFd> = received
            .into_iter()
            .map(|raw| unsafe { OwnedFd::from_raw_fd(raw) })
            .collect();
        if truncated {
            return Err(TransportError::DescriptorsTruncated {
                limit: MAX_FDS_PER_READ,
            });
        }
        self.fds.extend(received);

        if read == 0 {
            return Err(TransportError::Closed);
        }
        self.inbox.extend_from_slice(&buf[..read]);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
