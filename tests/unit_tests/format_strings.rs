// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `write_arrayf`/`write_mapf` format-string building, plus the
//! format-error edge cases: a mismatched token returns `InvalidArgument`
//! and the caller must not use the partially-written buffer.

use raid_client_rs::{
    error::RaidError,
    reader::Reader,
    writer::{FormatArg, Writer},
};

#[test]
fn mapf_scenario_s2_produces_the_documented_map() {
    let mut w = Writer::new();
    w.write_message("api.named").expect("write_message");
    w.write_mapf(
        2,
        "'number' %d 'name' %s",
        &[FormatArg::Int(42), FormatArg::Str("hello")],
    )
    .expect("write_mapf");

    let mut reader = Reader::with_data(w.data(), true).expect("decode");
    assert_eq!(reader.read_begin_map(), Some(2));
    assert!(reader.is_map_key("number"));
    assert_eq!(reader.read_int(), Some(42));
    assert!(reader.read_next());
    assert!(reader.is_map_key("name"));
    assert_eq!(reader.read_string().as_deref(), Some("hello"));
}

#[test]
fn arrayf_builds_object_tokens_from_preserved_values() {
    let preserved = rmpv::Value::String("verbatim".into());
    let mut w = Writer::new();
    w.write_message("api.passthrough").expect("write_message");
    w.write_arrayf(1, "%o", &[FormatArg::Object(&preserved)])
        .expect("write_arrayf");

    let mut reader = Reader::with_data(w.data(), true).expect("decode");
    assert_eq!(reader.read_begin_array(), Some(1));
    assert_eq!(reader.read_string().as_deref(), Some("verbatim"));
}

#[test]
fn arrayf_rejects_an_arg_count_mismatch() {
    let mut w = Writer::new();
    w.write_message("api.bad").expect("write_message");
    let err = w
        .write_arrayf(2, "%d %d", &[FormatArg::Int(1)])
        .unwrap_err();
    assert_eq!(err, RaidError::InvalidArgument);
}

#[test]
fn mapf_rejects_an_unquoted_key_token() {
    let mut w = Writer::new();
    w.write_message("api.bad").expect("write_message");
    let err = w.write_mapf(1, "number %d", &[FormatArg::Int(1)]).unwrap_err();
    assert_eq!(err, RaidError::InvalidArgument);
}

#[test]
fn mapf_rejects_mismatched_quote_delimiters() {
    let mut w = Writer::new();
    w.write_message("api.bad").expect("write_message");
    let err = w
        .write_mapf(1, "'number\" %d", &[FormatArg::Int(1)])
        .unwrap_err();
    assert_eq!(err, RaidError::InvalidArgument);
}
