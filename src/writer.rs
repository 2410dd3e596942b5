//! Builds outbound message buffers; owns the current request's etag (§4.6).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use rmpv::Value;

use crate::{error::RaidError, utils::generate_etag};

const KEY_HEADER: &str = "header";
const KEY_ACTION: &str = "action";
const KEY_ETAG: &str = "etag";
const KEY_BODY: &str = "body";

/// A typed value handed to [`Writer::write_arrayf`]/[`Writer::write_mapf`],
/// substituting for C's variadic `%d/%f/%s/%o` arguments (§9 "Design Notes":
/// "re-express as a typed variadic builder").
#[derive(Debug, Clone, Copy)]
pub enum FormatArg<'a> {
    Int(i64),
    Float(f64),
    Str(&'a str),
    Object(&'a Value),
}

/// Builds one outbound frame's payload.
///
/// `raid_write.c`'s `raid_writer_t` carries a back-reference to the owning
/// client so etag generation can happen under the registry mutex while
/// bumping a shared counter. That indirection existed to keep a *counter*
/// unique across threads; [`generate_etag`] instead draws from the OS RNG, so
/// no shared state or lock is needed to keep etags distinct with high
/// probability, and `Writer` is self-contained.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    etag: Option<String>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer, emits `{ header: { action, etag }, body: <to be
    /// appended> }`, and replaces any etag this writer previously held.
    pub fn write_message(&mut self, action: &str) -> Result<(), RaidError> {
        self.buf.clear();
        let etag = generate_etag();
        write_map_len(&mut self.buf, 2)?;
        write_str(&mut self.buf, KEY_HEADER)?;
        self.write_header_map(action, &etag)?;
        write_str(&mut self.buf, KEY_BODY)?;
        self.etag = Some(etag);
        Ok(())
    }

    /// Like [`Writer::write_message`] but emits only `{ header }`, for
    /// requests with no body.
    pub fn write_message_without_body(&mut self, action: &str) -> Result<(), RaidError> {
        self.buf.clear();
        let etag = generate_etag();
        write_map_len(&mut self.buf, 1)?;
        write_str(&mut self.buf, KEY_HEADER)?;
        self.write_header_map(action, &etag)?;
        self.etag = Some(etag);
        Ok(())
    }

    fn write_header_map(&mut self, action: &str, etag: &str) -> Result<(), RaidError> {
        write_map_len(&mut self.buf, 2)?;
        write_str(&mut self.buf, KEY_ACTION)?;
        write_str(&mut self.buf, action)?;
        write_str(&mut self.buf, KEY_ETAG)?;
        write_str(&mut self.buf, etag)?;
        Ok(())
    }

    pub fn write_nil(&mut self) -> Result<(), RaidError> {
        rmp::encode::write_nil(&mut self.buf).map_err(|_| RaidError::InvalidArgument)
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), RaidError> {
        rmp::encode::write_bool(&mut self.buf, v).map_err(|_| RaidError::InvalidArgument)
    }

    pub fn write_int(&mut self, v: i64) -> Result<(), RaidError> {
        rmp::encode::write_sint(&mut self.buf, v)
            .map(|_| ())
            .map_err(|_| RaidError::InvalidArgument)
    }

    pub fn write_float(&mut self, v: f64) -> Result<(), RaidError> {
        rmp::encode::write_f64(&mut self.buf, v).map_err(|_| RaidError::InvalidArgument)
    }

    pub fn write_binary(&mut self, v: &[u8]) -> Result<(), RaidError> {
        rmp::encode::write_bin(&mut self.buf, v).map_err(|_| RaidError::InvalidArgument)
    }

    pub fn write_string(&mut self, v: &str) -> Result<(), RaidError> {
        write_str(&mut self.buf, v)
    }

    /// Begins an array of `len` elements; the caller writes the `len`
    /// elements with subsequent calls, same contract as `msgpack_pack_array`.
    pub fn write_array(&mut self, len: u32) -> Result<(), RaidError> {
        write_array_len(&mut self.buf, len)
    }

    /// Begins a map of `len` key/value pairs; the caller writes `2 * len`
    /// values with subsequent calls.
    pub fn write_map(&mut self, len: u32) -> Result<(), RaidError> {
        write_map_len(&mut self.buf, len)
    }

    /// Appends an already-decoded value verbatim (`raid_write_object`); used
    /// by [`crate::group::RequestGroup::read_to_array`] to re-serialize a
    /// response body into an aggregate array.
    pub fn write_object(&mut self, v: &Value) -> Result<(), RaidError> {
        rmpv::encode::write_value(&mut self.buf, v).map_err(|_| RaidError::InvalidArgument)
    }

    /// Appends `bytes` to the buffer without any encoding (`raid_write_raw`);
    /// the caller is responsible for the result being valid msgpack.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Convenience array builder: `%d`/`%f`/`%s`/`%o` tokens separated by
    /// whitespace, one per entry in `args`.
    pub fn write_arrayf(&mut self, n: usize, format: &str, args: &[FormatArg]) -> Result<(), RaidError> {
        if args.len() != n {
            return Err(RaidError::InvalidArgument);
        }
        self.write_array(n as u32)?;
        let tokens: Vec<&str> = format.split_whitespace().collect();
        if tokens.len() != n {
            return Err(RaidError::InvalidArgument);
        }
        for (tok, arg) in tokens.iter().zip(args) {
            self.write_format_value(tok, arg)?;
        }
        Ok(())
    }

    /// Convenience map builder: `'key' %x` or `"key" %x` pairs separated by
    /// whitespace, one pair per entry in `args`.
    pub fn write_mapf(&mut self, n: usize, format: &str, args: &[FormatArg]) -> Result<(), RaidError> {
        if args.len() != n {
            return Err(RaidError::InvalidArgument);
        }
        self.write_map(n as u32)?;
        let tokens: Vec<&str> = format.split_whitespace().collect();
        if tokens.len() != 2 * n {
            return Err(RaidError::InvalidArgument);
        }
        for (pair, arg) in tokens.chunks(2).zip(args) {
            let [key_tok, val_tok] = pair else {
                return Err(RaidError::InvalidArgument);
            };
            let key = parse_quoted_key(key_tok)?;
            self.write_string(key)?;
            self.write_format_value(val_tok, arg)?;
        }
        Ok(())
    }

    fn write_format_value(&mut self, tok: &str, arg: &FormatArg) -> Result<(), RaidError> {
        match (tok, arg) {
            ("%d", FormatArg::Int(v)) => self.write_int(*v),
            ("%f", FormatArg::Float(v)) => self.write_float(*v),
            ("%s", FormatArg::Str(v)) => self.write_string(v),
            ("%o", FormatArg::Object(v)) => self.write_object(v),
            _ => Err(RaidError::InvalidArgument),
        }
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

fn parse_quoted_key(tok: &str) -> Result<&str, RaidError> {
    let bytes = tok.as_bytes();
    if bytes.len() < 2 {
        return Err(RaidError::InvalidArgument);
    }
    let (open, close) = (bytes[0], bytes[bytes.len() - 1]);
    if close != open || (open != b'\'' && open != b'"') {
        return Err(RaidError::InvalidArgument);
    }
    Ok(&tok[1..tok.len() - 1])
}

fn write_str(buf: &mut Vec<u8>, s: &str) -> Result<(), RaidError> {
    rmp::encode::write_str(buf, s).map_err(|_| RaidError::InvalidArgument)
}

fn write_array_len(buf: &mut Vec<u8>, len: u32) -> Result<(), RaidError> {
    rmp::encode::write_array_len(buf, len)
        .map(|_| ())
        .map_err(|_| RaidError::InvalidArgument)
}

fn write_map_len(buf: &mut Vec<u8>, len: u32) -> Result<(), RaidError> {
    rmp::encode::write_map_len(buf, len)
        .map(|_| ())
        .map_err(|_| RaidError::InvalidArgument)
}
