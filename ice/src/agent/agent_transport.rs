use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use util::{Buffer, Conn};

use super::agent_internal::AgentInternal;
use crate::state::CandidatePairState;

/// AgentConn is the packet-oriented connection the upper layers use
/// once ICE has a working pair: sends leave through the selected pair's
/// socket, receives surface everything non-STUN the sockets deliver.
pub struct AgentConn {
    internal: Arc<Mutex<AgentInternal>>,
    buffer: Buffer,
}

impl AgentConn {
    pub(crate) fn new(internal: Arc<Mutex<AgentInternal>>, buffer: Buffer) -> Self {
        AgentConn { internal, buffer }
    }

    async fn best_pair(
        &self,
    ) -> Option<(Arc<dyn Conn + Send + Sync>, SocketAddr, SocketAddr)> {
        let internal = self.internal.lock().await;

        let idx = internal.selected_pair.or_else(|| {
            internal
                .checklist
                .iter()
                .position(|p| p.state == CandidatePairState::Succeeded)
        })?;
        let pair = internal.checklist.get(idx)?;
        let conn = pair.local.conn.clone()?;
        let local_addr = pair.local.addr()?;
        let remote_addr = pair.remote.addr()?;
        Some((conn, local_addr, remote_addr))
    }
}

#[async_trait]
impl Conn for AgentConn {
    async fn connect(&self, _addr: SocketAddr) -> util::error::Result<()> {
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> util::error::Result<usize> {
        self.buffer.read(buf, None).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> util::error::Result<(usize, SocketAddr)> {
        let n = self.buffer.read(buf, None).await?;
        let addr = self
            .best_pair()
            .await
            .map(|(_, _, remote)| remote)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        Ok((n, addr))
    }

    async fn send(&self, buf: &[u8]) -> util::error::Result<usize> {
        let Some((conn, _, remote)) = self.best_pair().await else {
            return Err(util::Error::Other("no candidate pairs available".to_owned()));
        };
        conn.send_to(buf, remote).await
    }

    async fn send_to(&self, buf: &[u8], _target: SocketAddr) -> util::error::Result<usize> {
        self.send(buf).await
    }

    fn local_addr(&self) -> util::error::Result<SocketAddr> {
        Err(util::Error::Other(
            "local_addr is not supported on AgentConn".to_owned(),
        ))
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }

    async fn close(&self) -> util::error::Result<()> {
        self.buffer.close().await;
        Ok(())
    }
}
