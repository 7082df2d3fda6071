use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use sctp::association::{Association, Config as SctpConfig};
use tokio::sync::Mutex;

use crate::data_channel::RTCDataChannel;
use crate::dtls_transport::RTCDtlsTransport;
use crate::error::{Error, Result};

pub type OnDataChannelHdlrFn = Box<dyn FnMut(Arc<RTCDataChannel>) + Send + Sync>;

/// RTCSctpTransport runs the SCTP association over the DTLS transport
/// and hands inbound DCEP-negotiated channels up to the peer connection.
pub struct RTCSctpTransport {
    dtls_transport: Arc<RTCDtlsTransport>,
    association: Mutex<Option<Arc<Association>>>,
    /// Stream ids are even for the DTLS client, odd for the server
    /// (RFC 8832).
    next_stream_id: AtomicU16,
    accept_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RTCSctpTransport {
    pub(crate) fn new(dtls_transport: Arc<RTCDtlsTransport>) -> Arc<Self> {
        Arc::new(RTCSctpTransport {
            dtls_transport,
            association: Mutex::new(None),
            next_stream_id: AtomicU16::new(0),
            accept_handle: Mutex::new(None),
        })
    }

    /// start brings the association up in the role derived from the DTLS
    /// role and begins accepting inbound data channels.
    pub(crate) async fn start(
        self: &Arc<Self>,
        is_dtls_client: bool,
        on_data_channel: tokio::sync::mpsc::UnboundedSender<Arc<RTCDataChannel>>,
    ) -> Result<()> {
        self.next_stream_id
            .store(if is_dtls_client { 0 } else { 1 }, Ordering::SeqCst);

        let conn = self.dtls_transport.data_conn().await?;
        let config = SctpConfig::new(conn);
        let association = if is_dtls_client {
            Association::client(config).await?
        } else {
            Association::server(config).await?
        };

        {
            let mut guard = self.association.lock().await;
            *guard = Some(Arc::clone(&association));
        }

        // accept loop: every inbound stream is DCEP-negotiated
        let accept_assoc = Arc::clone(&association);
        let handle = tokio::spawn(async move {
            loop {
                match data::data_channel::DataChannel::accept(&accept_assoc).await {
                    Ok(dc) => {
                        let channel = RTCDataChannel::from_accepted(Arc::new(dc)).await;
                        if on_data_channel.send(channel).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log::debug!("data channel accept loop exiting: {err}");
                        break;
                    }
                }
            }
        });
        {
            let mut guard = self.accept_handle.lock().await;
            *guard = Some(handle);
        }

        Ok(())
    }

    pub(crate) async fn association(&self) -> Option<Arc<Association>> {
        self.association.lock().await.clone()
    }

    pub(crate) fn allocate_stream_id(&self) -> u16 {
        self.next_stream_id.fetch_add(2, Ordering::SeqCst)
    }

    /// dial opens an outbound channel once the association is live.
    pub(crate) async fn dial_channel(
        &self,
        channel: &Arc<RTCDataChannel>,
    ) -> Result<()> {
        let Some(association) = self.association().await else {
            return Err(Error::ErrSctpNotEstablished);
        };
        let stream_id = self.allocate_stream_id();
        let config = channel.dcep_config();
        let inner = data::data_channel::DataChannel::dial(&association, stream_id, config).await?;
        channel.attach(Arc::new(inner), false).await;
        Ok(())
    }

    pub(crate) async fn stop(&self) -> Result<()> {
        if let Some(handle) = self.accept_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(association) = self.association.lock().await.take() {
            let _ = association.close().await;
        }
        Ok(())
    }
}
