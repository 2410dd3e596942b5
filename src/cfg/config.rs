// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Hard cap on a single frame's declared length (§4.1): 1 GiB.
pub const MAX_FRAME_LEN: u32 = 1 << 30;

/// Default per-request timeout, in seconds, applied when a request does not
/// override it (§4.5).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Connection and timing parameters for a [`crate::client::RaidClient`].
///
/// This is the Raid analogue of the iSCSI `Config`: there is no
/// protocol negotiation to carry (Raid has none), only the runtime knobs the
/// specification names explicitly.
pub struct ClientConfig {
    #[serde(rename = "Host")]
    /// Hostname or IP address of the Raid server.
    pub host: String,

    #[serde(rename = "Port")]
    /// TCP port of the Raid server.
    pub port: u16,

    #[serde(rename = "DefaultRequestTimeout", with = "serde_secs")]
    /// Default timeout applied to a request when none is given explicitly.
    pub default_request_timeout: Duration,

    #[serde(rename = "RecvTimeout", with = "serde_secs")]
    /// Socket recv timeout used by the background receive loop; also the
    /// cadence at which pending-request timeouts are swept (§4.4/§9 Open
    /// Question 2).
    pub recv_timeout: Duration,

    #[serde(rename = "SendTimeout", with = "serde_secs")]
    /// Timeout applied to an individual outbound write.
    pub send_timeout: Duration,

    #[serde(rename = "MaxFrameLen", default = "default_max_frame_len")]
    /// Hard cap on a single frame's declared length in bytes (§4.1).
    pub max_frame_len: u32,
}

fn default_max_frame_len() -> u32 {
    MAX_FRAME_LEN
}

impl ClientConfig {
    /// Builds a config with the protocol's documented defaults, the Rust
    /// equivalent of `raid_init(&client, host, port)`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            default_request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            recv_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            send_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: ClientConfig =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates invariants.
    pub fn validate(&mut self) -> Result<()> {
        ensure!(!self.host.is_empty(), "Host must not be empty");
        ensure!(self.port != 0, "Port must not be zero");
        ensure!(
            self.max_frame_len > 0 && self.max_frame_len <= MAX_FRAME_LEN,
            "MaxFrameLen must be in (0, {MAX_FRAME_LEN}]"
        );
        ensure!(
            !self.default_request_timeout.is_zero(),
            "DefaultRequestTimeout must be > 0"
        );
        ensure!(!self.recv_timeout.is_zero(), "RecvTimeout must be > 0");
        Ok(())
    }

    /// `host:port` string suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Serde helper for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
