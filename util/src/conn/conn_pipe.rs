#[cfg(test)]
mod conn_pipe_test;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use super::Conn;
use crate::error::{Error, Result};

/// pipe creates a pair of connected in-memory Conns, datagram-preserving,
/// for exercising handshake and association state machines without sockets.
pub fn pipe() -> (Arc<PipeConn>, Arc<PipeConn>) {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();

    let a = Arc::new(PipeConn {
        wr: tx_b,
        rd: Mutex::new(rx_a),
    });
    let b = Arc::new(PipeConn {
        wr: tx_a,
        rd: Mutex::new(rx_b),
    });
    (a, b)
}

pub struct PipeConn {
    wr: mpsc::UnboundedSender<Bytes>,
    rd: Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

fn placeholder_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

#[async_trait]
impl Conn for PipeConn {
    async fn connect(&self, _addr: SocketAddr) -> Result<()> {
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rd = self.rd.lock().await;
        match rd.recv().await {
            Some(pkt) => {
                if buf.len() < pkt.len() {
                    return Err(Error::ErrBufferShort);
                }
                buf[..pkt.len()].copy_from_slice(&pkt);
                Ok(pkt.len())
            }
            None => Err(Error::ErrBufferClosed),
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let n = self.recv(buf).await?;
        Ok((n, placeholder_addr()))
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.wr
            .send(Bytes::copy_from_slice(buf))
            .map_err(|_| Error::ErrBufferClosed)?;
        Ok(buf.len())
    }

    async fn send_to(&self, buf: &[u8], _target: SocketAddr) -> Result<usize> {
        self.send(buf).await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(placeholder_addr())
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(placeholder_addr())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
