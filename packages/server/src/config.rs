//! Server configuration (command line).

use std::{net::SocketAddr, time::Duration};

use clap::{Parser, ValueEnum};

/// What to do with a frame that cannot be parsed as a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MalformedFramePolicy {
    /// Drop the frame and keep the session open
    #[default]
    Drop,
    /// Close the session
    Close,
}

/// Plaza chat server
#[derive(Debug, Clone, Parser)]
#[command(name = "plaza-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Send a `rejected` frame back to the sender when a message is refused
    #[arg(long)]
    pub notify_rejections: bool,

    /// Policy for frames that are not valid chat messages
    #[arg(long, value_enum, default_value_t = MalformedFramePolicy::Drop)]
    pub malformed_frame: MalformedFramePolicy,

    /// Close sessions that stay silent for this many seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub idle_timeout_secs: u64,
}

impl ServerConfig {
    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            notify_rejections: false,
            malformed_frame: MalformedFramePolicy::Drop,
            idle_timeout_secs: 0,
        }
    }
}
