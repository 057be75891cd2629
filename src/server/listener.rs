//! TCP listener shared by both Telnet servers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::Result;

/// Telnet server that accepts TCP connections on one port, bounded by a
/// connection-slot semaphore.
pub struct TelnetServer {
    listener: TcpListener,
    semaphore: Arc<Semaphore>,
    max_connections: usize,
}

impl TelnetServer {
    /// Create a new TelnetServer bound to `host:port`.
    pub async fn bind(host: &str, port: u16, max_connections: usize) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!("telnet server listening on {}", local_addr);

        Ok(Self {
            listener,
            semaphore: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get the maximum number of connections allowed.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get the number of available connection slots.
    pub fn available_connections(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the number of active connections.
    pub fn active_connections(&self) -> usize {
        self.max_connections - self.semaphore.available_permits()
    }

    /// Accept a new connection.
    ///
    /// Waits until a connection slot is available, then accepts the next
    /// incoming connection. Returns the stream, the peer address, and a
    /// permit that releases the slot when dropped.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| crate::TelnetError::Protocol("semaphore closed".to_string()))?;

        let (stream, addr) = self.listener.accept().await?;
        debug!("accepted connection from {}", addr);

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Run the server, accepting connections and spawning a handler task for
    /// each, until the accept loop itself fails fatally.
    pub async fn run<F, Fut>(self, handler: F) -> Result<()>
    where
        F: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);

        loop {
            match self.accept().await {
                Ok((stream, addr, permit)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler(stream, addr).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// A permit that represents an active connection slot.
///
/// When this permit is dropped, the connection slot is released.
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
