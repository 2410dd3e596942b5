// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A request's timeout elapses before any reply, firing its callback with
//! `RecvTimeout`; a subsequently-arriving reply for that same etag is now
//! unsolicited and reaches the `msg_recv` hooks instead of the
//! (already-removed) original callback.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use raid_client_rs::{client::RaidClient, error::RaidError, writer::Writer};
use tokio::sync::oneshot;

use crate::integration_tests::common::{fast_cfg, listen, read_one_request, send_response};

#[tokio::test]
async fn late_reply_after_timeout_reaches_msg_recv_hooks() {
    let (listener, addr) = listen().await;

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.expect("accept");
        let (etag, _) = read_one_request(&mut sock).await;
        // Stay silent well past the client's request timeout, then reply.
        tokio::time::sleep(Duration::from_millis(300)).await;
        send_response(&mut sock, &etag, "OK", None).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    let client = RaidClient::new(fast_cfg(&addr));
    client.connect().await.expect("connect");

    let unsolicited: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = unsolicited.clone();
    client.add_msg_recv_hook(Box::new(move |reader| {
        if let Some(code) = reader.read_code() {
            captured.lock().expect("lock").push(code.to_string());
        }
    }));

    let mut writer = Writer::new();
    writer.write_message("api.slow").expect("write_message");

    let (tx, rx) = oneshot::channel();
    client
        .request_async(
            &writer,
            Box::new(move |reader, err| {
                let _ = tx.send((reader, err));
            }),
        )
        .await
        .expect("request_async");

    let (reader, err) = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("callback fires before the test's own timeout")
        .expect("callback sender not dropped");
    assert!(reader.is_none());
    assert_eq!(err, RaidError::RecvTimeout);

    // Give the late reply time to arrive and route through the hooks.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(*unsolicited.lock().expect("lock"), vec!["OK".to_string()]);

    client.disconnect().await.ok();
    server.await.expect("server task");
}
