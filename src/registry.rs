//! Ordered collection of pending requests keyed by etag, with creation time,
//! timeout, and response callback (§4.3).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::{error::RaidError, reader::Reader};

/// Invoked exactly once per request, with either a reader positioned at the
/// response and [`RaidError::Success`], or no reader and a non-success
/// error. A plain boxed closure is the Rust substitute for the C API's
/// function-pointer-plus-`void*`-user-data pair (the closure's captures are
/// the user data).
pub type ResponseCallback = Box<dyn FnOnce(Option<Reader>, RaidError) + Send>;

pub struct PendingRequest {
    pub etag: String,
    pub created_at: Instant,
    pub timeout: Duration,
    pub callback: ResponseCallback,
}

impl PendingRequest {
    pub fn complete(self, reader: Option<Reader>, err: RaidError) {
        (self.callback)(reader, err);
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.timeout
    }
}

/// The client's list of requests awaiting a response.
///
/// This is deliberately a simple linked list, not an indexed map ("N is
/// expected to be small ... simplicity dominates asymptotics"), which is
/// why this wraps a `VecDeque` under one mutex instead of a
/// `DashMap<u32, mpsc::Sender<RawPdu>>` concurrent-map routing table —
/// Raid's registry is deliberately simpler than a PDU dispatch table.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<VecDeque<PendingRequest>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a newly-sent request to the front of the list.
    pub async fn append(&self, etag: String, timeout: Duration, callback: ResponseCallback) {
        let mut guard = self.entries.lock().await;
        guard.push_front(PendingRequest {
            etag,
            created_at: Instant::now(),
            timeout,
            callback,
        });
    }

    /// Sends a request and registers it atomically under one lock
    /// acquisition (§5 "Send under lock", Open Question 4): `send` runs
    /// while the registry mutex is held, the same way
    /// `ClientConnection::write` serializes all writers through a single
    /// `Mutex<OwnedWriteHalf>`. On send failure the entry is never
    /// registered and `callback` is simply dropped unfired — the caller
    /// gets the error back directly instead of through a callback.
    pub async fn send_and_append<F, Fut>(
        &self,
        etag: String,
        timeout: Duration,
        callback: ResponseCallback,
        send: F,
    ) -> Result<(), RaidError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), RaidError>>,
    {
        let mut guard = self.entries.lock().await;
        send().await?;
        guard.push_front(PendingRequest {
            etag,
            created_at: Instant::now(),
            timeout,
            callback,
        });
        Ok(())
    }

    /// Finds and removes the entry with an exactly matching etag
    /// (Open Question 1: full equality, not prefix compare) in one
    /// lock acquisition — the dispatcher always looks up and removes
    /// together, so there is no benefit to exposing the two as separate
    /// locked operations.
    pub async fn take(&self, etag: &str) -> Option<PendingRequest> {
        let mut guard = self.entries.lock().await;
        let pos = guard.iter().position(|r| r.etag == etag)?;
        guard.remove(pos)
    }

    /// Removes every entry whose deadline has passed, or every entry
    /// regardless of deadline when `err` is [`RaidError::NotConnected`]
    /// (§4.3). Returns the removed entries so the caller can invoke their
    /// callbacks outside the lock.
    pub async fn sweep_timeouts(&self, err: RaidError) -> Vec<PendingRequest> {
        let now = Instant::now();
        let force_all = err == RaidError::NotConnected;
        let mut guard = self.entries.lock().await;
        let mut expired = Vec::new();
        let mut i = 0;
        while i < guard.len() {
            if force_all || guard[i].is_expired(now) {
                // SAFETY-free: VecDeque::remove never panics for i < len.
                if let Some(entry) = guard.remove(i) {
                    expired.push(entry);
                }
            } else {
                i += 1;
            }
        }
        expired
    }

    /// Drains every pending entry, for use on disconnect.
    pub async fn clear_all(&self) -> Vec<PendingRequest> {
        let mut guard = self.entries.lock().await;
        guard.drain(..).collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
