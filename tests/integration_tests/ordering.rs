// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! For two responses A, B received in that order, `cb_A` is invoked before
//! `cb_B` — dispatch never reorders.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use raid_client_rs::{client::RaidClient, error::RaidError, writer::Writer};
use tokio::sync::oneshot;

use crate::integration_tests::common::{fast_cfg, listen, read_one_request, send_response};

#[tokio::test]
async fn callbacks_fire_in_arrival_order() {
    let (listener, addr) = listen().await;

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.expect("accept");
        let (etag_a, _) = read_one_request(&mut sock).await;
        let (etag_b, _) = read_one_request(&mut sock).await;
        send_response(&mut sock, &etag_a, "OK", None).await;
        send_response(&mut sock, &etag_b, "OK", None).await;
    });

    let client = RaidClient::new(fast_cfg(&addr));
    client.connect().await.expect("connect");

    let sequence = Arc::new(AtomicUsize::new(0));
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();

    let mut writer_a = Writer::new();
    writer_a.write_message("api.a").expect("write_message");
    let seq_a = sequence.clone();
    client
        .request_async(
            &writer_a,
            Box::new(move |_, err| {
                assert_eq!(err, RaidError::Success);
                let _ = tx_a.send(seq_a.fetch_add(1, Ordering::SeqCst));
            }),
        )
        .await
        .expect("request_async a");

    let mut writer_b = Writer::new();
    writer_b.write_message("api.b").expect("write_message");
    let seq_b = sequence.clone();
    client
        .request_async(
            &writer_b,
            Box::new(move |_, err| {
                assert_eq!(err, RaidError::Success);
                let _ = tx_b.send(seq_b.fetch_add(1, Ordering::SeqCst));
            }),
        )
        .await
        .expect("request_async b");

    let order_a = rx_a.await.expect("callback a fired");
    let order_b = rx_b.await.expect("callback b fired");
    assert!(order_a < order_b, "callback a must fire before callback b");

    server.await.expect("server task");
}
