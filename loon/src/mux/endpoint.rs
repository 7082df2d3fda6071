use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use util::{Buffer, Conn};

use super::mux_func::MatchFunc;

/// Endpoint implements Conn. It is used to read muxed packets.
pub struct Endpoint {
    pub(crate) id: usize,
    pub(crate) buffer: Buffer,
    pub(crate) match_fn: MatchFunc,
    pub(crate) next_conn: Arc<dyn Conn + Send + Sync>,
    pub(crate) endpoints: Arc<Mutex<HashMap<usize, Arc<Endpoint>>>>,
}

impl Endpoint {
    /// close unregisters the endpoint from the Mux.
    pub async fn close(&self) -> util::error::Result<()> {
        self.buffer.close().await;
        let mut endpoints = self.endpoints.lock().await;
        endpoints.remove(&self.id);
        Ok(())
    }
}

#[async_trait]
impl Conn for Endpoint {
    async fn connect(&self, _addr: SocketAddr) -> util::error::Result<()> {
        Err(util::Error::Other("connect is not supported".to_owned()))
    }

    /// reads a packet of len(p) bytes.
    async fn recv(&self, buf: &mut [u8]) -> util::error::Result<usize> {
        self.buffer.read(buf, None).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> util::error::Result<(usize, SocketAddr)> {
        let n = self.recv(buf).await?;
        let addr = self
            .next_conn
            .remote_addr()
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        Ok((n, addr))
    }

    /// writes bytes to the underlying conn.
    async fn send(&self, buf: &[u8]) -> util::error::Result<usize> {
        self.next_conn.send(buf).await
    }

    async fn send_to(&self, buf: &[u8], _target: SocketAddr) -> util::error::Result<usize> {
        self.next_conn.send(buf).await
    }

    fn local_addr(&self) -> util::error::Result<SocketAddr> {
        self.next_conn.local_addr()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.next_conn.remote_addr()
    }

    async fn close(&self) -> util::error::Result<()> {
        Endpoint::close(self).await
    }
}
