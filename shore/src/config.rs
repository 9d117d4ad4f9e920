use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

/// Internet-facing peer: accepts exactly one ship link and executes its
/// exchanges against the real Internet.
#[derive(Debug, Parser)]
#[command(name = "shore", version)]
pub struct Config {
    /// Local address to accept the ship's framed-link connection on.
    #[arg(long, env = "SHORE_LISTEN", default_value = "0.0.0.0:9999")]
    pub listen: SocketAddr,

    /// Hard cap, in bytes, on a single frame's payload length. Must match the
    /// ship's configured value or large requests/responses will be rejected
    /// by one side and not the other.
    #[arg(long, env = "SHORE_MAX_FRAME_SIZE", default_value_t = linkproto::DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_size: u32,

    /// Total time budget for a single upstream HTTP request, from dial to
    /// last response byte.
    #[arg(long, env = "SHORE_UPSTREAM_TIMEOUT", value_parser = parse_secs, default_value = "60")]
    pub upstream_timeout: Duration,

    /// Time budget for dialing a CONNECT tunnel target.
    #[arg(long, env = "SHORE_CONNECT_TIMEOUT", value_parser = parse_secs, default_value = "10")]
    pub connect_timeout: Duration,
}

fn parse_secs(s: &str) -> Result<Duration, std::num::ParseIntError> {
    s.parse().map(Duration::from_secs)
}
