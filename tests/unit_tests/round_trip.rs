// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Writing nil/bool/int/float/string/binary/array/map with the Writer and
//! reading them back with the Reader yields values equal to the inputs,
//! with bitwise equality for finite, non-NaN floats.

use raid_client_rs::writer::Writer;

fn encode_body(body: impl FnOnce(&mut Writer)) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_message("api.round_trip").expect("write_message");
    body(&mut w);
    w.data().to_vec()
}

#[test]
fn nil_round_trips() {
    let bytes = encode_body(|w| w.write_nil().expect("write_nil"));
    let reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
    assert!(reader.is_nil());
}

#[test]
fn bool_round_trips() {
    for v in [true, false] {
        let bytes = encode_body(|w| w.write_bool(v).expect("write_bool"));
        let reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
        assert!(reader.is_bool());
        assert_eq!(reader.read_bool(), Some(v));
    }
}

#[test]
fn int_round_trips_negative_and_positive() {
    for v in [i64::MIN, -1, 0, 1, i64::MAX] {
        let bytes = encode_body(|w| w.write_int(v).expect("write_int"));
        let reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
        assert!(reader.is_int());
        assert_eq!(reader.read_int(), Some(v));
    }
}

#[test]
fn float_round_trips_bitwise_for_finite_values() {
    for v in [0.0_f64, -0.0, 1.5, -42.25, f64::MIN_POSITIVE, 1e300] {
        let bytes = encode_body(|w| w.write_float(v).expect("write_float"));
        let reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
        assert!(reader.is_float());
        let got = reader.read_float().expect("read_float");
        assert_eq!(got.to_bits(), v.to_bits());
    }
}

#[test]
fn string_round_trips() {
    let bytes = encode_body(|w| w.write_string("Hello World").expect("write_string"));
    let reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
    assert!(reader.is_string());
    assert_eq!(reader.read_string().as_deref(), Some("Hello World"));
}

#[test]
fn binary_round_trips() {
    let payload = vec![0u8, 1, 2, 255, 254, 253];
    let bytes = encode_body(|w| w.write_binary(&payload).expect("write_binary"));
    let reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
    assert!(reader.is_binary());
    assert_eq!(reader.read_binary(), Some(payload));
}

#[test]
fn array_round_trips_mixed_types() {
    let bytes = encode_body(|w| {
        w.write_array(3).expect("write_array");
        w.write_int(1).expect("write_int");
        w.write_string("two").expect("write_string");
        w.write_bool(true).expect("write_bool");
    });
    let mut reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
    assert_eq!(reader.read_begin_array(), Some(3));
    assert_eq!(reader.read_int(), Some(1));
    assert!(reader.read_next());
    assert_eq!(reader.read_string().as_deref(), Some("two"));
    assert!(reader.read_next());
    assert_eq!(reader.read_bool(), Some(true));
    assert!(!reader.read_next());
    reader.read_end_array();
}

#[test]
fn map_round_trips_and_preserves_insertion_order() {
    let bytes = encode_body(|w| {
        w.write_map(2).expect("write_map");
        w.write_string("first").expect("write_string");
        w.write_int(1).expect("write_int");
        w.write_string("second").expect("write_string");
        w.write_int(2).expect("write_int");
    });
    let mut reader = raid_client_rs::reader::Reader::with_data(&bytes, true).expect("decode");
    assert_eq!(reader.read_begin_map(), Some(2));
    assert!(reader.is_map_key("first"));
    assert_eq!(reader.read_int(), Some(1));
    assert!(reader.read_next());
    assert!(reader.is_map_key("second"));
    assert_eq!(reader.read_int(), Some(2));
}
