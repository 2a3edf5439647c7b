//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use super::page::INDEX_PAGE;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Time allowed for a client to send its request head
    pub request_timeout: Duration,

    /// Time allowed for a single response write before the client is
    /// considered stalled (None = wait forever)
    pub write_timeout: Option<Duration>,

    /// Body served at `/index.html`
    pub index_page: Arc<str>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Parts go out as soon as they are written
            request_timeout: Duration::from_secs(10),
            write_timeout: Some(Duration::from_secs(30)),
            index_page: Arc::from(INDEX_PAGE),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Replace the index page body
    pub fn index_page(mut self, page: impl Into<Arc<str>>) -> Self {
        self.index_page = page.into();
        self
    }
}
