//! Append-only `before_send`/`after_recv`/`msg_recv` hook lists (§3 "Callback
//! hook").

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::reader::Reader;

pub type BeforeSendHook = Box<dyn Fn(&[u8]) + Send + Sync>;
pub type AfterRecvHook = Box<dyn Fn(&[u8]) + Send + Sync>;
pub type MsgRecvHook = Box<dyn Fn(&Reader) + Send + Sync>;

/// Holds the three hook kinds `raid.h` exposes as
/// `raid_add_before_send_callback`/`raid_add_after_recv_callback`/
/// `raid_add_msg_recv_callback`. The C API pairs a function pointer with a
/// `void*` user-data blob per callback; a `Box<dyn Fn>` closure is the direct
/// Rust substitute since the closure's captures already carry whatever state
/// the C callback would have reached through `user_data`.
#[derive(Default)]
pub struct HookList {
    before_send: Vec<BeforeSendHook>,
    after_recv: Vec<AfterRecvHook>,
    msg_recv: Vec<MsgRecvHook>,
}

impl HookList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_before_send(&mut self, hook: BeforeSendHook) {
        self.before_send.push(hook);
    }

    pub fn add_after_recv(&mut self, hook: AfterRecvHook) {
        self.after_recv.push(hook);
    }

    pub fn add_msg_recv(&mut self, hook: MsgRecvHook) {
        self.msg_recv.push(hook);
    }

    /// Fires before the length prefix is sent (§5).
    pub fn fire_before_send(&self, payload: &[u8]) {
        for hook in &self.before_send {
            hook(payload);
        }
    }

    /// Fires after a complete message is framed, but before it is decoded
    /// and dispatched (§5).
    pub fn fire_after_recv(&self, payload: &[u8]) {
        for hook in &self.after_recv {
            hook(payload);
        }
    }

    /// Fires for a well-formed incoming message whose etag matches no
    /// pending request.
    pub fn fire_msg_recv(&self, reader: &Reader) {
        for hook in &self.msg_recv {
            hook(reader);
        }
    }
}
