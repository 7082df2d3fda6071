pub mod conn_pipe;
pub mod conn_udp;

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;

/// Conn is an object-safe, packet-oriented network connection.
///
/// Every socket the stack touches (UDP sockets, TURN relays, muxed
/// endpoints, in-memory test pipes) is driven through this trait so the
/// layers above stay transport-agnostic.
#[async_trait]
pub trait Conn {
    async fn connect(&self, addr: SocketAddr) -> Result<()>;
    async fn recv(&self, buf: &mut [u8]) -> Result<usize>;
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;
    async fn send(&self, buf: &[u8]) -> Result<usize>;
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize>;
    fn local_addr(&self) -> Result<SocketAddr>;
    fn remote_addr(&self) -> Option<SocketAddr>;
    async fn close(&self) -> Result<()>;
}
