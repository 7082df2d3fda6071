use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::Conn;
use crate::error::{Error, Result};

#[async_trait]
impl Conn for UdpSocket {
    async fn connect(&self, addr: SocketAddr) -> Result<()> {
        Ok(UdpSocket::connect(self, addr).await?)
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(UdpSocket::recv(self, buf).await?)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(UdpSocket::recv_from(self, buf).await?)
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        Ok(UdpSocket::send(self, buf).await?)
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(UdpSocket::send_to(self, buf, target).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(UdpSocket::local_addr(self)?)
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        UdpSocket::peer_addr(self).ok()
    }

    async fn close(&self) -> Result<()> {
        // UDP sockets close on drop; recv loops are stopped by their owner.
        Err(Error::Other("close on raw UdpSocket is a no-op".to_owned()))
    }
}
