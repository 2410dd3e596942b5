//! `init`/`connect`/`disconnect`/`destroy`, the async/sync request surface,
//! cancellation, and hook registration (§4.5).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::{Mutex, oneshot};

use crate::{
    cfg::config::ClientConfig,
    client::connection::ClientConnection,
    error::RaidError,
    hooks::{AfterRecvHook, BeforeSendHook, HookList, MsgRecvHook},
    reader::Reader,
    registry::Registry,
    transport::TcpTransport,
    writer::Writer,
};

/// The public entry point: one Raid connection to one server.
///
/// Mirrors the `Pool`/`ClientConnection` split, collapsed to a
/// single connection since Raid has no session/multi-connection pooling.
/// `connection_id` is bumped on every successful
/// `connect()`, the Rust analogue of `raid_client_t::connection_id` used by
/// callers to detect a reconnect (Raid itself never reconnects, but the
/// counter distinguishes successive `connect()` calls on a reused façade).
pub struct RaidClient {
    cfg: ClientConfig,
    connection_id: AtomicU64,
    hooks: Arc<RwLock<HookList>>,
    connection: Mutex<Option<Arc<ClientConnection<TcpTransport>>>>,
}

impl RaidClient {
    /// `raid_init(client, host, port)`: allocates client-side state, opens no
    /// socket.
    pub fn new(cfg: ClientConfig) -> Self {
        Self {
            cfg,
            connection_id: AtomicU64::new(0),
            hooks: Arc::new(RwLock::new(HookList::new())),
            connection: Mutex::new(None),
        }
    }

    pub fn add_before_send_hook(&self, hook: BeforeSendHook) {
        if let Ok(mut hooks) = self.hooks.write() {
            hooks.add_before_send(hook);
        }
    }

    pub fn add_after_recv_hook(&self, hook: AfterRecvHook) {
        if let Ok(mut hooks) = self.hooks.write() {
            hooks.add_after_recv(hook);
        }
    }

    pub fn add_msg_recv_hook(&self, hook: MsgRecvHook) {
        if let Ok(mut hooks) = self.hooks.write() {
            hooks.add_msg_recv(hook);
        }
    }

    /// Opens the TCP connection and starts the background receive loop.
    /// Fails with [`RaidError::AlreadyConnected`] if a connection is already
    /// active (§4.5).
    pub async fn connect(&self) -> Result<(), RaidError> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() {
            return Err(RaidError::AlreadyConnected);
        }

        let transport = TcpTransport::connect(&self.cfg.address()).await?;
        self.connection_id.fetch_add(1, Ordering::SeqCst);

        let conn = ClientConnection::spawn(
            Arc::new(transport),
            Arc::new(Registry::new()),
            self.hooks.clone(),
            self.cfg.clone(),
        );
        *guard = Some(conn);
        Ok(())
    }

    pub async fn connected(&self) -> bool {
        match self.connection.lock().await.as_ref() {
            Some(conn) => conn.is_connected(),
            None => false,
        }
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id.load(Ordering::SeqCst)
    }

    /// Submits `writer`'s current message and returns immediately;
    /// `callback` runs on the receive task once a reply, timeout,
    /// cancellation, or disconnection resolves it.
    pub async fn request_async(
        &self,
        writer: &Writer,
        callback: crate::registry::ResponseCallback,
    ) -> Result<(), RaidError> {
        let guard = self.connection.lock().await;
        let conn = guard.as_ref().ok_or(RaidError::NotConnected)?;
        conn.request_async(writer, callback).await
    }

    /// Synchronous wrapper around [`Self::request_async`] (§4.5, §9 "cross-
    /// thread sharing of decoded values"): the response's decoded tree is
    /// handed across the oneshot channel by value rather than by a raw
    /// pointer into the receive task's state, so there is nothing to copy
    /// explicitly — `Reader` already owns its tree outright.
    pub async fn request(&self, writer: &Writer) -> Result<Reader, RaidError> {
        let (tx, rx) = oneshot::channel();
        self.request_async(
            writer,
            Box::new(move |reader, err| {
                let _ = tx.send((reader, err));
            }),
        )
        .await?;

        let (reader, err) = rx.await.map_err(|_| RaidError::NotConnected)?;
        match reader {
            Some(reader) if err.is_success() => Ok(reader),
            _ => Err(err),
        }
    }

    /// Removes a pending request before it completes on its own
    /// (`raid_cancel_request`).
    pub async fn cancel_request(&self, etag: &str) -> bool {
        match self.connection.lock().await.as_ref() {
            Some(conn) => conn.cancel_request(etag).await,
            None => false,
        }
    }

    /// Closes the transport and stops the receive task; pending requests
    /// fail with [`RaidError::NotConnected`] (§4.5).
    pub async fn disconnect(&self) -> Result<(), RaidError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }

    /// `raid_destroy`: disconnects if still connected. There is no separate
    /// teardown step beyond that in the Rust port — `Drop` on the contained
    /// `Arc`s frees everything else once the caller drops the client.
    pub async fn destroy(self) -> Result<(), RaidError> {
        self.disconnect().await
    }
}
