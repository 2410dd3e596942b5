// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Error kinds reported by the public surface of the client.
///
/// A pending request's callback always receives either a valid
/// [`crate::reader::Reader`] together with [`RaidError::Success`], or no
/// reader together with a non-success variant — mirroring the C
/// `raid_response_callback_t` contract.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Error)]
pub enum RaidError {
    #[error("success")]
    #[default]
    Success,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid address")]
    InvalidAddress,
    #[error("socket error")]
    SocketError,
    #[error("connect error")]
    ConnectError,
    #[error("recv timeout")]
    RecvTimeout,
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("shutdown error")]
    ShutdownError,
    #[error("close error")]
    CloseError,
    #[error("canceled")]
    Canceled,
    #[error("unknown error")]
    Unknown,
}

impl RaidError {
    /// Whether this code represents a successful outcome.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, RaidError::Success)
    }

    /// Classify a plain I/O error the way `raid_socket.c` classifies `errno`
    /// after a `recv`/`send` call: would-block becomes a timeout, a reset or
    /// closed peer becomes `NotConnected`, anything else is `Unknown`.
    pub fn from_recv_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind as K;
        match err.kind() {
            K::WouldBlock | K::TimedOut => RaidError::RecvTimeout,
            K::ConnectionReset | K::ConnectionAborted | K::BrokenPipe | K::UnexpectedEof => {
                RaidError::NotConnected
            },
            _ => RaidError::Unknown,
        }
    }

    pub fn from_send_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind as K;
        match err.kind() {
            K::ConnectionReset | K::ConnectionAborted | K::BrokenPipe | K::UnexpectedEof => {
                RaidError::NotConnected
            },
            _ => RaidError::SocketError,
        }
    }
}

pub type Result<T> = std::result::Result<T, RaidError>;
