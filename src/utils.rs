// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use rand::RngExt;

const ETAG_LEN: usize = 8;
const ETAG_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates an 8-character ASCII alphanumeric etag.
///
/// Grounded on `generate_isid` (random bytes, formatted into a
/// short ASCII identifier); `raid_write.c`'s superseded `gen_etag` used a
/// timestamp instead, but the fixed 8-character alphabet wins over a
/// timestamp encoding.
pub fn generate_etag() -> String {
    let mut rng = rand::rng();
    (0..ETAG_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ETAG_ALPHABET.len());
            ETAG_ALPHABET[idx] as char
        })
        .collect()
}
