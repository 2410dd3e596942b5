// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! An `api.echo` request with a string body gets the same string back,
//! alongside the server's response code.

use raid_client_rs::{client::RaidClient, writer::Writer};
use rmpv::Value;

use crate::integration_tests::common::{fast_cfg, listen, read_one_request, send_response};

#[tokio::test]
async fn echoes_the_request_body_and_reports_the_response_code() {
    let (listener, addr) = listen().await;

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.expect("accept");
        let (etag, req) = read_one_request(&mut sock).await;
        let body = raid_client_rs::codec::map_lookup(&req, "body").cloned();
        assert_eq!(body.as_ref().and_then(Value::as_str), Some("Hello World"));
        send_response(&mut sock, &etag, "OK", body).await;
    });

    let client = RaidClient::new(fast_cfg(&addr));
    client.connect().await.expect("connect");

    let mut writer = Writer::new();
    writer.write_message("api.echo").expect("write_message");
    writer.write_string("Hello World").expect("write_string");

    let reader = client.request(&writer).await.expect("request");
    assert_eq!(reader.read_string().as_deref(), Some("Hello World"));
    assert_eq!(reader.read_code(), Some("OK"));

    server.await.expect("server task");
}
