// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub use rmpv::Value;

/// Looks up `key` in a msgpack map by exact string equality.
///
/// Raid maps are small (a handful of header/body entries), so a linear scan
/// over the `(key, value)` pairs is the right tool — the same approach
/// `raid_read.c` takes when it walks `via.map.ptr` looking for `"etag"` or
/// `"code"`. Open Question 1 (spec §9) resolves prefix matching in favor of
/// full equality; this is the one place that decision is enforced.
pub fn map_lookup<'a>(map: &'a Value, key: &str) -> Option<&'a Value> {
    map.as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// Reads a float regardless of whether the encoder chose the 32- or 64-bit
/// representation; matches `raid_read_float`'s tolerance of either msgpack
/// float width.
pub fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::F32(f) => Some(f64::from(*f)),
        Value::F64(f) => Some(*f),
        _ => None,
    }
}
