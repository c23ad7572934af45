use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ONU_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// How long a disconnected player may reconnect before being removed from
/// the lobby. Zero removes them immediately.
pub fn reconnect_grace() -> Duration {
    let millis = env::var("ONU_RECONNECT_GRACE_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(10_000);
    Duration::from_millis(millis)
}

pub fn ping_interval() -> Duration {
    let millis = env::var("ONU_PING_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(10_000);
    Duration::from_millis(millis)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 256;
