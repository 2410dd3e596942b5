//! Background receive loop, frame dispatch, and the send path under the
//! registry lock (§4.2, §4.4).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cfg::config::ClientConfig,
    codec::map_lookup,
    error::RaidError,
    framer::Framer,
    hooks::HookList,
    reader::Reader,
    registry::{Registry, ResponseCallback},
    transport::Transport,
    writer::Writer,
};

const RECV_BUF_LEN: usize = 64 * 1024;

/// One connected transport plus the machinery hanging off it: the
/// registry of pending requests, the hook list, and the background task that
/// drives the receive loop (§4.4's pseudocode, `raid_client.c`'s worker
/// thread).
///
/// The iSCSI client's `ClientConnection` spawns `read_loop` off `Arc<Self>` on
/// `connect()`; this keeps that shape, substituting the PDU-keyed `DashMap`
/// routing tables for the simpler etag [`Registry`].
pub struct ClientConnection<T: Transport> {
    transport: Arc<T>,
    registry: Arc<Registry>,
    hooks: Arc<RwLock<HookList>>,
    cfg: ClientConfig,
    cancel: CancellationToken,
}

impl<T: Transport> ClientConnection<T> {
    /// Starts the background receive loop and returns the shared handle used
    /// to submit requests against it.
    pub fn spawn(
        transport: Arc<T>,
        registry: Arc<Registry>,
        hooks: Arc<RwLock<HookList>>,
        cfg: ClientConfig,
    ) -> Arc<Self> {
        let conn = Arc::new(Self {
            transport,
            registry,
            hooks,
            cfg,
            cancel: CancellationToken::new(),
        });

        let worker = conn.clone();
        tokio::spawn(async move {
            worker.recv_loop().await;
        });

        conn
    }

    /// Stops the receive loop at its next wakeup without waiting for it to
    /// exit; pending requests are failed with [`RaidError::NotConnected`]
    /// once it does.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled() && self.transport.is_connected()
    }

    /// Sends a framed request and registers its callback atomically (§4.5
    /// `request_async`, Open Question 4 "send under lock").
    pub async fn request_async(
        &self,
        writer: &Writer,
        callback: ResponseCallback,
    ) -> Result<(), RaidError> {
        let etag = writer.etag().ok_or(RaidError::InvalidArgument)?.to_string();
        if !self.is_connected() {
            return Err(RaidError::NotConnected);
        }

        if let Ok(hooks) = self.hooks.read() {
            hooks.fire_before_send(writer.data());
        }
        let frame = frame_message(writer.data());
        let timeout = self.cfg.default_request_timeout;
        let send_timeout = self.cfg.send_timeout;
        let transport = self.transport.clone();

        let result = self
            .registry
            .send_and_append(etag, timeout, callback, move || async move {
                transport.send(&frame, send_timeout).await
            })
            .await;

        // §4.5: a send failure classified as peer-closed tears the
        // connection down immediately rather than waiting for the recv
        // loop to next observe it.
        if result == Err(RaidError::NotConnected) {
            self.cancel();
            let _ = self.transport.close().await;
        }

        result
    }

    /// Removes and fails a pending request directly, without waiting for a
    /// reply or a timeout (`raid_cancel_request`). A reply that arrives for
    /// `etag` afterward is unsolicited and reaches the `msg_recv` hooks
    /// instead.
    pub async fn cancel_request(&self, etag: &str) -> bool {
        match self.registry.take(etag).await {
            Some(entry) => {
                entry.complete(None, RaidError::Canceled);
                true
            },
            None => false,
        }
    }

    pub async fn disconnect(&self) -> Result<(), RaidError> {
        self.cancel.cancel();
        self.transport.close().await
    }

    async fn recv_loop(self: Arc<Self>) {
        let mut framer = Framer::new(self.cfg.max_frame_len);
        let mut buf = vec![0u8; RECV_BUF_LEN];

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.transport.recv(&mut buf, self.cfg.recv_timeout).await {
                Ok(n) => match framer.feed(&buf[..n]) {
                    Ok(frames) => {
                        for frame in frames {
                            if let Ok(hooks) = self.hooks.read() {
                                hooks.fire_after_recv(&frame);
                            }
                            self.dispatch(&frame).await;
                        }
                    },
                    Err(e) => {
                        warn!("framing error, closing connection: {e}");
                        break;
                    },
                },
                Err(RaidError::RecvTimeout) => {
                    self.sweep_and_maybe_discard(RaidError::RecvTimeout, &mut framer)
                        .await;
                },
                Err(RaidError::NotConnected) => break,
                Err(e) => {
                    debug!("recoverable recv error: {e}");
                },
            }
        }

        for entry in self.registry.clear_all().await {
            entry.complete(None, RaidError::NotConnected);
        }
    }

    async fn sweep_and_maybe_discard(&self, err: RaidError, framer: &mut Framer) {
        for entry in self.registry.sweep_timeouts(err).await {
            entry.complete(None, err);
        }
        // §4.1, Open Question 3: an idle recv timeout with nothing pending
        // discards an in-progress partial frame rather than keeping it
        // indefinitely across a possibly-wedged peer.
        if framer.has_partial_frame() && self.registry.is_empty().await {
            framer.discard_partial();
        }
    }

    /// Decodes one complete frame and routes it to its pending request, or
    /// to the `msg_recv` hooks when no request is waiting on its etag (§4.2).
    async fn dispatch(&self, frame: &[u8]) {
        let mut slice = frame;
        let value = match rmpv::decode::read_value(&mut slice) {
            Ok(v) => v,
            Err(_) => return,
        };
        if !value.is_map() {
            return;
        }

        let etag = map_lookup(&value, "header")
            .and_then(|h| map_lookup(h, "etag"))
            .and_then(rmpv::Value::as_str)
            .map(str::to_owned);
        let Some(etag) = etag else {
            return;
        };

        match self.registry.take(&etag).await {
            Some(entry) => match Reader::with_data(frame, true) {
                Ok(reader) => entry.complete(Some(reader), RaidError::Success),
                Err(err) => entry.complete(None, err),
            },
            None => {
                if let Ok(reader) = Reader::with_data(frame, true)
                    && let Ok(hooks) = self.hooks.read()
                {
                    hooks.fire_msg_recv(&reader);
                }
            },
        }
    }
}

fn frame_message(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}
