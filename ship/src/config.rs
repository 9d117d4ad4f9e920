use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

/// Client-facing HTTP(S) proxy peer.
#[derive(Debug, Parser)]
#[command(name = "ship", version)]
pub struct Config {
    /// Local address to accept client HTTP(S) proxy connections on.
    #[arg(long, env = "SHIP_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Hostname or IP of the shore peer.
    #[arg(long, env = "SHIP_OFFSHORE_HOST")]
    pub offshore_host: String,

    /// TCP port of the shore peer's framed-link listener.
    #[arg(long, env = "SHIP_OFFSHORE_PORT", default_value_t = 9999)]
    pub offshore_port: u16,

    /// Hard cap, in bytes, on a single frame's payload length.
    #[arg(long, env = "SHIP_MAX_FRAME_SIZE", default_value_t = linkproto::DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_size: u32,

    /// Maximum delay between reconnect attempts to the shore peer.
    #[arg(long, env = "SHIP_RECONNECT_BACKOFF_CAP", value_parser = parse_secs, default_value = "30")]
    pub reconnect_backoff_cap: Duration,
}

fn parse_secs(s: &str) -> Result<Duration, std::num::ParseIntError> {
    s.parse().map(Duration::from_secs)
}

impl Config {
    pub fn offshore_addr(&self) -> String {
        format!("{}:{}", self.offshore_host, self.offshore_port)
    }
}
