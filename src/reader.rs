//! Owns a decoded value tree plus a cursor for structured navigation
//! (arrays, maps, scalars) with a bounded stack (§4.7).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use rmpv::Value;

use crate::{
    codec::{as_f64, map_lookup},
    error::RaidError,
};

/// Minimum stack depth required (§4.7): the 65th nested
/// `begin_array`/`begin_map` must fail.
const MAX_DEPTH: usize = 64;

/// A cursor over a decoded value tree.
///
/// `raid_read.c` keeps `nested` as a raw pointer into a `msgpack_zone`-owned
/// tree, with a parallel `parents[64]`/`indices[64]` stack. `rmpv::Value`
/// owns its data outright (no zone indirection, §3 of the expanded spec), so
/// a self-referential pointer into `root` would fight the borrow checker for
/// no benefit; instead the cursor and the stack collapse into a single
/// `Vec<usize>` of child indices from the root, re-walked on every access.
/// This is the same "parents + indices" shape, just addressed by position
/// instead of by pointer.
#[derive(Debug, Clone)]
pub struct Reader {
    root: Value,
    etag: Option<String>,
    code: Option<String>,
    body_path: Vec<usize>,
    cursor_path: Vec<usize>,
}

impl Default for Reader {
    fn default() -> Self {
        Self {
            root: Value::Nil,
            etag: None,
            code: None,
            body_path: Vec::new(),
            cursor_path: Vec::new(),
        }
    }
}

fn navigate<'a>(root: &'a Value, path: &[usize]) -> Option<&'a Value> {
    let mut cur = root;
    for &idx in path {
        cur = match cur {
            Value::Array(items) => items.get(idx)?,
            Value::Map(entries) => &entries.get(idx)?.1,
            _ => return None,
        };
    }
    Some(cur)
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(bytes: &[u8], is_response: bool) -> Result<Self, RaidError> {
        let mut reader = Self::new();
        reader.set_data(bytes, is_response)?;
        Ok(reader)
    }

    /// Decodes `bytes` and, for a response, locates `body` and
    /// `header.{etag,code}`; for anything else the cursor starts at the
    /// root.
    pub fn set_data(&mut self, bytes: &[u8], is_response: bool) -> Result<(), RaidError> {
        let mut slice = bytes;
        self.root =
            rmpv::decode::read_value(&mut slice).map_err(|_| RaidError::InvalidArgument)?;
        self.etag = None;
        self.code = None;
        self.body_path.clear();

        if is_response {
            if let Some(header) = map_lookup(&self.root, "header") {
                self.etag = map_lookup(header, "etag")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                self.code = map_lookup(header, "code")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
            }
            if let Value::Map(entries) = &self.root
                && let Some(idx) = entries.iter().position(|(k, _)| k.as_str() == Some("body"))
            {
                self.body_path = vec![idx];
            }
        }

        self.cursor_path = self.body_path.clone();
        Ok(())
    }

    /// Exchanges all fields with `other` (`raid_reader_swap`); `mem::swap`
    /// is the direct Rust substitute for swapping the C struct's raw fields.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn current(&self) -> Option<&Value> {
        navigate(&self.root, &self.cursor_path)
    }

    /// The raw value the cursor is positioned on, for callers (such as
    /// [`crate::group::RequestGroup::read_to_array`]) that re-serialize it
    /// verbatim rather than reading through the typed accessors.
    pub fn value(&self) -> Option<&Value> {
        self.current()
    }

    pub fn is_invalid(&self) -> bool {
        self.current().is_none()
    }

    pub fn is_nil(&self) -> bool {
        self.current().is_some_and(Value::is_nil)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.current(), Some(Value::Boolean(_)))
    }

    pub fn is_int(&self) -> bool {
        matches!(self.current(), Some(Value::Integer(_)))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.current(), Some(Value::F32(_) | Value::F64(_)))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.current(), Some(Value::String(_)))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.current(), Some(Value::Binary(_)))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.current(), Some(Value::Array(_)))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.current(), Some(Value::Map(_)))
    }

    pub fn read_bool(&self) -> Option<bool> {
        match self.current()? {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn read_int(&self) -> Option<i64> {
        self.current()?.as_i64()
    }

    pub fn read_float(&self) -> Option<f64> {
        as_f64(self.current()?)
    }

    pub fn read_string(&self) -> Option<String> {
        self.current()?.as_str().map(str::to_owned)
    }

    pub fn read_binary(&self) -> Option<Vec<u8>> {
        match self.current()? {
            Value::Binary(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// Looks up `header.code` by exact key match (§9 supplemented feature:
    /// `raid_read_code`'s linear scan, performed once in [`Self::set_data`]
    /// rather than per call).
    pub fn read_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_code(&self, s: &str) -> bool {
        self.code.as_deref() == Some(s)
    }

    pub fn read_etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Enters an array; fails if the cursor is not on an array or the stack
    /// is already at [`MAX_DEPTH`]. Returns the array's length.
    pub fn read_begin_array(&mut self) -> Option<usize> {
        if self.cursor_path.len() >= MAX_DEPTH {
            return None;
        }
        let len = match self.current()? {
            Value::Array(items) => items.len(),
            _ => return None,
        };
        self.cursor_path.push(0);
        Some(len)
    }

    /// Enters a map; cursor moves to the first entry's value. Returns the
    /// map's length (entry count).
    pub fn read_begin_map(&mut self) -> Option<usize> {
        if self.cursor_path.len() >= MAX_DEPTH {
            return None;
        }
        let len = match self.current()? {
            Value::Map(entries) => entries.len(),
            _ => return None,
        };
        self.cursor_path.push(0);
        Some(len)
    }

    /// The key at the current map index, when inside a map.
    pub fn read_map_key(&self) -> Option<&Value> {
        let idx = *self.cursor_path.last()?;
        let parent = navigate(&self.root, &self.cursor_path[..self.cursor_path.len() - 1])?;
        match parent {
            Value::Map(entries) => entries.get(idx).map(|(k, _)| k),
            _ => None,
        }
    }

    pub fn is_map_key(&self, s: &str) -> bool {
        self.read_map_key().and_then(Value::as_str) == Some(s)
    }

    /// Advances the index on the innermost container and moves the cursor
    /// to the next element. Leaves the cursor unchanged and returns `false`
    /// when already at the last element or not inside a container.
    pub fn read_next(&mut self) -> bool {
        let Some(&last_idx) = self.cursor_path.last() else {
            return false;
        };
        let parent_path = &self.cursor_path[..self.cursor_path.len() - 1];
        let Some(parent) = navigate(&self.root, parent_path) else {
            return false;
        };
        let len = match parent {
            Value::Array(items) => items.len(),
            Value::Map(entries) => entries.len(),
            _ => return false,
        };
        let next_idx = last_idx + 1;
        if next_idx >= len {
            return false;
        }
        *self.cursor_path.last_mut().unwrap_or_else(|| unreachable!()) = next_idx;
        true
    }

    /// Pops the stack, moving the cursor back to the container itself. A
    /// no-op when not inside a container.
    pub fn read_end_array(&mut self) {
        self.cursor_path.pop();
    }

    pub fn read_end_map(&mut self) {
        self.cursor_path.pop();
    }
}
