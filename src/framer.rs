//! Turns a byte stream into whole messages using a 4-byte big-endian length
//! prefix (§4.1).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// A declared frame length exceeded the configured cap. The connection is
/// unrecoverable once this fires (§4.1): the caller must close the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame length {declared} exceeds the {max} byte cap")]
pub struct FrameTooLarge {
    pub declared: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitHeader,
    ProcessingBody { total: u32 },
}

/// Reassembles length-prefixed frames out of an arbitrarily-chunked byte
/// stream.
///
/// Grounded on `raid_client.c`'s `RAID_STATE_WAIT_MESSAGE` /
/// `RAID_STATE_PROCESSING_MESSAGE` pair and on the iSCSI client's
/// `ClientConnection::read_loop`, which grows a single `BytesMut` and splits
/// complete frames off the front rather than juggling a separate header
/// accumulator and body buffer — the two-buffer shape in the original is an
/// implementation detail of manual C buffer management, not part of the
/// observable state machine.
pub struct Framer {
    max_frame_len: u32,
    state: State,
    acc: BytesMut,
}

impl Framer {
    pub fn new(max_frame_len: u32) -> Self {
        Self {
            max_frame_len,
            state: State::WaitHeader,
            acc: BytesMut::new(),
        }
    }

    /// Feeds a chunk just read from the transport; returns any frames
    /// completed by it, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, FrameTooLarge> {
        self.acc.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            match self.state {
                State::WaitHeader => {
                    if self.acc.len() < 4 {
                        break;
                    }
                    let header = self.acc.split_to(4);
                    let total = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
                    if total > self.max_frame_len {
                        return Err(FrameTooLarge {
                            declared: total,
                            max: self.max_frame_len,
                        });
                    }
                    self.state = State::ProcessingBody { total };
                },
                State::ProcessingBody { total } => {
                    if (self.acc.len() as u32) < total {
                        break;
                    }
                    frames.push(self.acc.split_to(total as usize).freeze());
                    self.state = State::WaitHeader;
                },
            }
        }

        Ok(frames)
    }

    /// True while a length prefix has been consumed but its body has not yet
    /// fully arrived.
    pub fn has_partial_frame(&self) -> bool {
        matches!(self.state, State::ProcessingBody { .. })
    }

    /// Discards an in-progress partial frame and returns to `WAIT_HEADER`.
    /// Called by the receive loop on an idle recv timeout with an empty
    /// registry (§4.1, Open Question 3).
    pub fn discard_partial(&mut self) {
        self.acc.clear();
        self.state = State::WaitHeader;
    }
}
