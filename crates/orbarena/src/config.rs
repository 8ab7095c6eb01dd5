//! Server settings read from the environment.
//!
//! | Variable            | Default          |
//! |---------------------|------------------|
//! | `NETWORK_ADDR`      | `127.0.0.1:8080` |
//! | `IDLE_TIMEOUT_SECS` | `30`             |
//!
//! The binary loads a `.env` file from the working directory (if present)
//! before reading these, so values from the real environment win.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Invalid values
    /// are logged and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = match lookup("NETWORK_ADDR") {
            Some(addr) if addr.trim().parse::<SocketAddr>().is_ok() => addr.trim().to_string(),
            Some(addr) => {
                tracing::warn!(
                    value = %addr,
                    default = DEFAULT_BIND_ADDR,
                    "NETWORK_ADDR is not a socket address, using default"
                );
                defaults.bind_addr
            }
            None => defaults.bind_addr,
        };

        let idle_timeout = match lookup("IDLE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(
                        value = %raw,
                        default = DEFAULT_IDLE_TIMEOUT_SECS,
                        "IDLE_TIMEOUT_SECS must be a positive integer, using default"
                    );
                    defaults.idle_timeout
                }
            },
            None => defaults.idle_timeout,
        };

        Self {
            bind_addr,
            idle_timeout,
        }
    }
}
