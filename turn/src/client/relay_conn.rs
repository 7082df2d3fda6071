use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stun::message::*;
use tokio::sync::{mpsc, Mutex};
use util::Conn;

use super::permission::PermissionMap;
use super::ClientInternal;
use crate::error::*;
use crate::proto::chandata::ChannelData;
use crate::proto::channum::ChannelNumber;
use crate::proto::peeraddr::PeerAddress;

/// Channel bindings last 10 minutes on the server; rebind before expiry.
const BINDING_REFRESH_AFTER: Duration = Duration::from_secs(9 * 60);

/// RelayConn is a Conn whose local address is the TURN-relayed transport
/// address. Sending installs permissions and binds a channel on first use
/// so the steady-state path uses the 4-byte ChannelData framing instead of
/// the ~36-byte Send indication.
pub struct RelayConn {
    internal: Arc<ClientInternal>,
    relayed_addr: SocketAddr,
    read_rx: Mutex<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>,
    perms: Mutex<PermissionMap>,
    remote_addr: Mutex<Option<SocketAddr>>,
}

impl RelayConn {
    pub(crate) fn new(
        internal: Arc<ClientInternal>,
        relayed_addr: SocketAddr,
        read_rx: mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>,
    ) -> Self {
        RelayConn {
            internal,
            relayed_addr,
            read_rx: Mutex::new(read_rx),
            perms: Mutex::new(PermissionMap::new()),
            remote_addr: Mutex::new(None),
        }
    }

    pub fn relayed_addr(&self) -> SocketAddr {
        self.relayed_addr
    }

    async fn ensure_permission(&self, peer: SocketAddr) -> Result<()> {
        {
            let perms = self.perms.lock().await;
            if !perms.needs_install(&peer.ip()) {
                return Ok(());
            }
        }

        self.internal
            .send_auth_request(
                METHOD_CREATE_PERMISSION,
                vec![Box::new(PeerAddress::from(peer))],
            )
            .await?;

        let mut perms = self.perms.lock().await;
        perms.installed(peer.ip());
        Ok(())
    }

    /// bind_channel binds a channel number to peer, lazily, on first send.
    async fn bind_channel(&self, peer: SocketAddr) -> Result<ChannelNumber> {
        {
            let bindings = self.internal.bindings.lock().await;
            if let Some((number, bound_at)) = bindings.by_addr.get(&peer) {
                if bound_at.elapsed() < BINDING_REFRESH_AFTER {
                    return Ok(*number);
                }
            }
        }

        let number = {
            let mut bindings = self.internal.bindings.lock().await;
            match bindings.by_addr.get(&peer) {
                Some((number, _)) => *number,
                None => {
                    let number = bindings.next;
                    bindings.next = number.next();
                    number
                }
            }
        };

        self.internal
            .send_auth_request(
                METHOD_CHANNEL_BIND,
                vec![Box::new(PeerAddress::from(peer)), Box::new(number)],
            )
            .await?;

        let mut bindings = self.internal.bindings.lock().await;
        bindings
            .by_addr
            .insert(peer, (number, tokio::time::Instant::now()));
        bindings.by_number.insert(number.0, peer);
        Ok(number)
    }

    async fn send_to_peer(&self, buf: &[u8], peer: SocketAddr) -> Result<usize> {
        self.ensure_permission(peer).await?;
        let number = self.bind_channel(peer).await?;

        let mut ch = ChannelData {
            data: buf.to_vec(),
            number,
            raw: vec![],
        };
        ch.encode();
        self.internal.stun_client.send_raw(&ch.raw).await?;
        Ok(buf.len())
    }
}

#[async_trait]
impl Conn for RelayConn {
    async fn connect(&self, addr: SocketAddr) -> util::error::Result<()> {
        let mut remote = self.remote_addr.lock().await;
        *remote = Some(addr);
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> util::error::Result<usize> {
        let (n, _) = self.recv_from(buf).await?;
        Ok(n)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> util::error::Result<(usize, SocketAddr)> {
        let mut rx = self.read_rx.lock().await;
        match rx.recv().await {
            Some((pkt, from)) => {
                if buf.len() < pkt.len() {
                    return Err(util::Error::ErrBufferShort);
                }
                buf[..pkt.len()].copy_from_slice(&pkt);
                Ok((pkt.len(), from))
            }
            None => Err(util::Error::ErrBufferClosed),
        }
    }

    async fn send(&self, buf: &[u8]) -> util::error::Result<usize> {
        let remote = { *self.remote_addr.lock().await };
        match remote {
            Some(addr) => self.send_to(buf, addr).await,
            None => Err(util::Error::ErrNoRemoteAddress),
        }
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> util::error::Result<usize> {
        self.send_to_peer(buf, target)
            .await
            .map_err(|e| util::Error::Other(e.to_string()))
    }

    fn local_addr(&self) -> util::error::Result<SocketAddr> {
        Ok(self.relayed_addr)
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr.try_lock().ok().and_then(|guard| *guard)
    }

    async fn close(&self) -> util::error::Result<()> {
        self.read_rx.lock().await.close();
        Ok(())
    }
}
