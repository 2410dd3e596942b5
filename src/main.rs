// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use raid_client_rs::{cfg::config::ClientConfig, client::RaidClient, writer::Writer};

/// Sends one `api.echo` request and prints the server's reply, mirroring
/// `raid.h`'s own usage example.
#[tokio::main]
async fn main() -> Result<()> {
    let host = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "9000".to_string())
        .parse()
        .context("invalid port")?;

    let client = RaidClient::new(ClientConfig::new(host, port));
    client.connect().await.context("error connecting to server")?;

    let mut writer = Writer::new();
    writer.write_message("api.echo").context("error building request")?;
    writer.write_string("Hello World").context("error building request")?;

    let reader = client.request(&writer).await.context("error sending the message")?;

    match reader.read_string() {
        Some(body) => println!("Response: {body}"),
        None => println!("Response is not a string"),
    }

    client.disconnect().await.ok();
    Ok(())
}
