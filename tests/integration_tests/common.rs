// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use raid_client_rs::cfg::config::ClientConfig;
use rmpv::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

/// A loopback Raid server stands in for the real daemon: it listens on an
/// ephemeral port and hands the caller the accepted socket to script by
/// hand.
pub async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    (listener, addr.to_string())
}

/// A client config tuned for fast tests: short recv/timeout windows so
/// timeout-driven scenarios (S5) don't need to wait out the 10s default.
pub fn fast_cfg(addr: &str) -> ClientConfig {
    let (host, port) = addr.rsplit_once(':').expect("host:port");
    let mut cfg = ClientConfig::new(host, port.parse().expect("port"));
    cfg.recv_timeout = Duration::from_millis(20);
    cfg.default_request_timeout = Duration::from_millis(150);
    cfg
}

pub async fn read_one_request(sock: &mut TcpStream) -> (String, Value) {
    let mut len_buf = [0u8; 4];
    sock.read_exact(&mut len_buf).await.expect("read length prefix");
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    sock.read_exact(&mut payload).await.expect("read payload");
    let req: Value = rmpv::decode::read_value(&mut &payload[..]).expect("decode request");
    let etag = raid_client_rs::codec::map_lookup(&req, "header")
        .and_then(|h| raid_client_rs::codec::map_lookup(h, "etag"))
        .and_then(Value::as_str)
        .expect("request header.etag")
        .to_string();
    (etag, req)
}

pub async fn send_response(sock: &mut TcpStream, etag: &str, code: &str, body: Option<Value>) {
    let header = vec![
        (Value::String("action".into()), Value::String("api.echo".into())),
        (Value::String("etag".into()), Value::String(etag.into())),
        (Value::String("code".into()), Value::String(code.into())),
    ];
    let mut entries = vec![(Value::String("header".into()), Value::Map(header))];
    if let Some(body) = body {
        entries.push((Value::String("body".into()), body));
    }
    let reply = Value::Map(entries);

    let mut raw = Vec::new();
    rmpv::encode::write_value(&mut raw, &reply).expect("encode response");
    sock.write_all(&(raw.len() as u32).to_be_bytes())
        .await
        .expect("write length prefix");
    sock.write_all(&raw).await.expect("write payload");
}
