//! Serialized output writer.
//!
//! All writers for a connection (the session read loop, the timestamp
//! emitter, and negotiation replies) go through one [`Writer`] so that any
//! composed message is written under a single mutex acquisition and cannot
//! be interleaved with another writer's bytes mid-message.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// Shared, lock-protected half of a split `TcpStream`.
pub struct Writer {
    half: Mutex<OwnedWriteHalf>,
}

impl Writer {
    pub fn new(half: OwnedWriteHalf) -> Arc<Self> {
        Arc::new(Self {
            half: Mutex::new(half),
        })
    }

    /// Write `bytes` atomically with respect to any other writer sharing
    /// this `Writer`.
    pub async fn write_all(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut half = self.half.lock().await;
        half.write_all(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_write_all_reaches_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        let (_read, write) = stream.into_split();
        let writer = Writer::new(write);

        writer.write_all(b"hello").await.unwrap();

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_not_interleaved() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        let (_read, write) = stream.into_split();
        let writer = Writer::new(write);

        let w1 = writer.clone();
        let w2 = writer.clone();
        let a = tokio::spawn(async move { w1.write_all(&[b'A'; 64]).await.unwrap() });
        let b = tokio::spawn(async move { w2.write_all(&[b'B'; 64]).await.unwrap() });
        a.await.unwrap();
        b.await.unwrap();

        let mut buf = [0u8; 128];
        client.read_exact(&mut buf).await.unwrap();
        // Either all 64 A's come before all 64 B's, or vice versa: never mixed.
        let all_a_then_b = buf[..64].iter().all(|&b| b == b'A') && buf[64..].iter().all(|&b| b == b'B');
        let all_b_then_a = buf[..64].iter().all(|&b| b == b'B') && buf[64..].iter().all(|&b| b == b'A');
        assert!(all_a_then_b || all_b_then_a);
    }
}
