//! Batch submission, join, and array aggregation of multiple requests (§4.8).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::Notify;

use crate::{client::facade::RaidClient, error::RaidError, reader::Reader, writer::Writer};

#[derive(Default)]
struct Slot {
    reader: Option<Reader>,
    error: RaidError,
}

struct Entry {
    writer: Writer,
    slot: Arc<Mutex<Slot>>,
}

/// A batch of requests submitted together and joined as a unit.
///
/// `raid_request_group_t` stores each entry's result inline and protects it
/// with the group's own mutex; here each entry owns its result behind a
/// small `Arc<Mutex<Slot>>` so the completion callback — which must be
/// `'static` to hand to [`RaidClient::request_async`] — can write into it
/// without unsafe aliasing of the entry `Vec` the group mutates concurrently.
/// `tokio::sync::Notify` stands in for the condition variable; `wait()`
/// re-checks the done count after every notification, the same defensive
/// loop a condvar wait needs against spurious wakeups.
pub struct RequestGroup<'a> {
    client: &'a RaidClient,
    entries: Vec<Entry>,
    num_done: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl<'a> RequestGroup<'a> {
    pub fn new(client: &'a RaidClient) -> Self {
        Self {
            client,
            entries: Vec::new(),
            num_done: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Allocates a new entry and returns a `&mut Writer` for the caller to
    /// build its message into.
    pub fn add(&mut self) -> &mut Writer {
        self.entries.push(Entry {
            writer: Writer::new(),
            slot: Arc::new(Mutex::new(Slot::default())),
        });
        &mut self
            .entries
            .last_mut()
            .unwrap_or_else(|| unreachable!("just pushed"))
            .writer
    }

    /// Submits every entry in order. On the first send failure, every entry
    /// already queued is canceled by etag and the error is returned (§4.8).
    pub async fn send(&mut self) -> Result<(), RaidError> {
        let n = self.entries.len();
        self.num_done.store(0, Ordering::SeqCst);

        for i in 0..n {
            let etag = self.entries[i]
                .writer
                .etag()
                .ok_or(RaidError::InvalidArgument)?
                .to_string();

            let slot = self.entries[i].slot.clone();
            let num_done = self.num_done.clone();
            let notify = self.notify.clone();
            let callback: crate::registry::ResponseCallback = Box::new(move |reader, err| {
                if let Ok(mut slot) = slot.lock() {
                    slot.reader = reader;
                    slot.error = err;
                }
                num_done.fetch_add(1, Ordering::SeqCst);
                notify.notify_one();
            });

            if let Err(err) = self.client.request_async(&self.entries[i].writer, callback).await {
                for prev in &self.entries[..i] {
                    if let Some(prev_etag) = prev.writer.etag() {
                        let _ = self.client.cancel_request(prev_etag).await;
                    }
                }
                self.num_done.store(n, Ordering::SeqCst);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Blocks until every submitted entry has completed.
    pub async fn wait(&self) {
        let n = self.entries.len();
        loop {
            if self.num_done.load(Ordering::SeqCst) >= n {
                return;
            }
            self.notify.notified().await;
        }
    }

    pub async fn send_and_wait(&mut self) -> Result<(), RaidError> {
        self.send().await?;
        self.wait().await;
        Ok(())
    }

    /// Builds an array of each entry's response body (`nil` for an entry
    /// with no body or a failed entry), in submission order — not reply
    /// order (scenario S3). When `out_errors` is `Some`, it also receives a
    /// parallel array of per-entry error codes.
    pub fn read_to_array(
        &self,
        out_errors: Option<&mut Vec<RaidError>>,
    ) -> Result<Reader, RaidError> {
        let mut w = Writer::new();
        w.write_array(self.entries.len() as u32)?;
        let mut errors = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let slot = entry.slot.lock().map_err(|_| RaidError::Unknown)?;
            match (&slot.reader, slot.error) {
                (Some(reader), err) if err.is_success() => match reader.value() {
                    Some(v) => w.write_object(v)?,
                    None => w.write_nil()?,
                },
                _ => w.write_nil()?,
            }
            errors.push(slot.error);
        }

        if let Some(out) = out_errors {
            *out = errors;
        }

        Reader::with_data(w.data(), false)
    }
}
