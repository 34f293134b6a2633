/// HTTP server plumbing shared by every node role

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// A bound listener waiting to serve a router
pub struct ApiServer {
    name: String,
    listener: TcpListener,
}

impl ApiServer {
    /// Bind `addr`; binding happens up front so callers can announce
    /// themselves before the first request arrives
    pub async fn bind(name: impl Into<String>, addr: SocketAddr) -> Result<Self> {
        let name = name.into();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("{} could not bind {}", name, addr))?;
        Ok(Self { name, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the task is cancelled or the listener fails
    pub async fn serve(self, app: Router) -> Result<()> {
        info!("{} listening on {}", self.name, self.local_addr()?);

        axum::serve(self.listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("{} server error: {}", self.name, e))?;

        Ok(())
    }
}

/// Resolve `host:port` into a socket address
pub fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))
}
