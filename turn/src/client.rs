#[cfg(test)]
mod client_test;

pub mod permission;
pub mod relay_conn;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use stun::attributes::*;
use stun::error_code::*;
use stun::fingerprint::FINGERPRINT;
use stun::integrity::MessageIntegrity;
use stun::message::*;
use stun::textattrs::TextAttribute;
use stun::xoraddr::XorMappedAddress;
use tokio::sync::{mpsc, Mutex};
use util::Conn;

use crate::error::*;
use crate::proto::chandata::ChannelData;
use crate::proto::channum::{ChannelNumber, MIN_CHANNEL_NUMBER};
use crate::proto::lifetime::Lifetime;
use crate::proto::peeraddr::PeerAddress;
use crate::proto::relayaddr::RelayedAddress;
use crate::proto::reqtrans::RequestedTransport;
use crate::proto::PROTO_UDP;
use relay_conn::RelayConn;

/// ClientConfig is a bag of config parameters for Client.
pub struct ClientConfig {
    pub stun_serv_addr: Option<SocketAddr>,
    pub turn_serv_addr: SocketAddr,
    pub username: String,
    pub password: String,
    pub realm: String,
    pub software: String,
    pub rto: Duration,
    pub conn: Arc<dyn Conn + Send + Sync>,
}

#[derive(Default)]
pub(crate) struct AuthState {
    pub(crate) realm: String,
    pub(crate) nonce: String,
    pub(crate) integrity: Option<MessageIntegrity>,
}

pub(crate) struct BindingState {
    pub(crate) by_addr: HashMap<SocketAddr, (ChannelNumber, tokio::time::Instant)>,
    pub(crate) by_number: HashMap<u16, SocketAddr>,
    pub(crate) next: ChannelNumber,
}

impl Default for BindingState {
    fn default() -> Self {
        BindingState {
            by_addr: HashMap::new(),
            by_number: HashMap::new(),
            next: ChannelNumber(MIN_CHANNEL_NUMBER),
        }
    }
}

pub(crate) struct ClientInternal {
    pub(crate) stun_client: Arc<stun::client::Client>,
    pub(crate) turn_serv_addr: SocketAddr,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) auth: Mutex<AuthState>,
    pub(crate) bindings: Mutex<BindingState>,
}

/// Client is a TURN client: it keeps one allocation on one server and
/// relays datagrams between the local endpoint and remote peers.
pub struct Client {
    internal: Arc<ClientInternal>,
    stun_serv_addr: Option<SocketAddr>,
    relay_rx: Mutex<Option<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>>,
    allocated: Mutex<bool>,
    refresh_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    router_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Client {
    pub async fn new(config: ClientConfig) -> Result<Arc<Self>> {
        let (indication_tx, mut indication_rx) = mpsc::unbounded_channel();
        let (data_tx, mut data_rx) = mpsc::unbounded_channel();
        let (relay_tx, relay_rx) = mpsc::unbounded_channel::<(Vec<u8>, SocketAddr)>();

        let mut stun_config = stun::client::ClientConfig::new(Arc::clone(&config.conn));
        if config.rto > Duration::from_millis(0) {
            stun_config.rto = config.rto;
        }
        stun_config.indication_tx = Some(indication_tx);
        stun_config.data_tx = Some(data_tx);
        let stun_client = stun::client::Client::new(stun_config);

        let internal = Arc::new(ClientInternal {
            stun_client,
            turn_serv_addr: config.turn_serv_addr,
            username: config.username,
            password: config.password,
            auth: Mutex::new(AuthState {
                realm: config.realm,
                ..Default::default()
            }),
            bindings: Mutex::new(BindingState::default()),
        });

        // Route Data indications and ChannelData frames into the relay
        // read queue.
        let router_internal = Arc::clone(&internal);
        let router_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = indication_rx.recv() => {
                        let Some(msg) = msg else { break };
                        if msg.typ.method != METHOD_DATA {
                            continue;
                        }
                        let mut peer = PeerAddress::default();
                        let mut data = crate::proto::data::Data::default();
                        if peer.get_from(&msg).is_err() || data.get_from(&msg).is_err() {
                            continue;
                        }
                        let from = SocketAddr::new(peer.ip, peer.port);
                        let _ = relay_tx.send((data.0, from));
                    }
                    pkt = data_rx.recv() => {
                        let Some((pkt, _from)) = pkt else { break };
                        if !crate::proto::chandata::is_channel_data(&pkt) {
                            continue;
                        }
                        let mut ch = ChannelData {
                            raw: pkt,
                            ..Default::default()
                        };
                        if ch.decode().is_err() {
                            continue;
                        }
                        let peer = {
                            let bindings = router_internal.bindings.lock().await;
                            bindings.by_number.get(&ch.number.0).copied()
                        };
                        if let Some(peer) = peer {
                            let _ = relay_tx.send((ch.data, peer));
                        } else {
                            log::trace!("ChannelData for unbound channel {}", ch.number);
                        }
                    }
                }
            }
        });

        Ok(Arc::new(Client {
            internal,
            stun_serv_addr: config.stun_serv_addr,
            relay_rx: Mutex::new(Some(relay_rx)),
            allocated: Mutex::new(false),
            refresh_handle: Mutex::new(None),
            router_handle: Mutex::new(Some(router_handle)),
        }))
    }

    /// send_binding_request discovers the server-reflexive address via the
    /// configured STUN server.
    pub async fn send_binding_request(&self) -> Result<SocketAddr> {
        let Some(_to) = self.stun_serv_addr else {
            return Err(Error::Other("no STUN server address configured".to_owned()));
        };

        let mut msg = Message::new();
        msg.build(&[
            Box::new(TransactionId::new()),
            Box::new(BINDING_REQUEST),
            Box::new(FINGERPRINT),
        ])?;

        let res = self.internal.stun_client.send_request(&msg).await?;
        if res.typ.class == CLASS_ERROR_RESPONSE {
            let mut code = ErrorCodeAttribute::default();
            let _ = code.get_from(&res);
            return Err(Error::Other(format!("binding failed: {code}")));
        }
        let mut refl = XorMappedAddress::default();
        refl.get_from(&res)?;
        Ok(SocketAddr::new(refl.ip, refl.port))
    }

    /// allocate sends an Allocate request, performing the long-term
    /// credential dance on the expected initial 401.
    pub async fn allocate(self: &Arc<Self>) -> Result<Arc<RelayConn>> {
        {
            let mut allocated = self.allocated.lock().await;
            if *allocated {
                return Err(Error::ErrAlreadyAllocated);
            }
            *allocated = true;
        }

        let res = self
            .internal
            .send_auth_request(
                METHOD_ALLOCATE,
                vec![Box::new(RequestedTransport {
                    protocol: PROTO_UDP,
                })],
            )
            .await?;

        let mut relayed = RelayedAddress::default();
        relayed.get_from(&res).map_err(|e| {
            Error::ErrAllocationFailure(format!("no XOR-RELAYED-ADDRESS: {e}"))
        })?;
        let mut lifetime = Lifetime::default();
        let _ = lifetime.get_from(&res);
        if lifetime.0.is_zero() {
            lifetime.0 = crate::proto::lifetime::DEFAULT_LIFETIME;
        }

        let relay_rx = {
            let mut guard = self.relay_rx.lock().await;
            guard.take().ok_or(Error::ErrOneAllocateOnly)?
        };

        let relay_conn = Arc::new(RelayConn::new(
            Arc::clone(&self.internal),
            SocketAddr::new(relayed.ip, relayed.port),
            relay_rx,
        ));

        // Keep the allocation alive by refreshing at half its lifetime.
        let refresh_internal = Arc::clone(&self.internal);
        let refresh_interval = lifetime.0 / 2;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(refresh_interval).await;
                match refresh_internal
                    .send_auth_request(
                        METHOD_REFRESH,
                        vec![Box::new(Lifetime(
                            crate::proto::lifetime::DEFAULT_LIFETIME,
                        ))],
                    )
                    .await
                {
                    Ok(_) => log::debug!("allocation refreshed"),
                    Err(err) => {
                        log::warn!("allocation refresh failed: {err}");
                        break;
                    }
                }
            }
        });
        {
            let mut guard = self.refresh_handle.lock().await;
            *guard = Some(handle);
        }

        Ok(relay_conn)
    }

    pub async fn close(&self) -> Result<()> {
        if let Some(handle) = self.refresh_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.router_handle.lock().await.take() {
            handle.abort();
        }
        // Releasing the allocation is best effort.
        let _ = self
            .internal
            .send_auth_request(
                METHOD_REFRESH,
                vec![Box::new(Lifetime(Duration::from_secs(0)))],
            )
            .await;
        self.internal.stun_client.close().await?;
        Ok(())
    }
}

impl ClientInternal {
    /// send_auth_request sends a request with the long-term credentials
    /// attached, bootstrapping realm/nonce from the initial 401 and
    /// recovering once from a 438 stale nonce.
    pub(crate) async fn send_auth_request(
        &self,
        method: Method,
        extra: Vec<Box<dyn Setter>>,
    ) -> Result<Message> {
        let mut stale_retry = false;
        loop {
            let mut msg = Message::new();
            msg.build(&[
                Box::new(TransactionId::new()),
                Box::new(MessageType::new(method, CLASS_REQUEST)),
            ])?;
            for s in &extra {
                s.add_to(&mut msg)?;
            }

            let integrity = {
                let auth = self.auth.lock().await;
                if let Some(integrity) = &auth.integrity {
                    TextAttribute::new(ATTR_USERNAME, self.username.clone())
                        .add_to(&mut msg)?;
                    TextAttribute::new(ATTR_REALM, auth.realm.clone()).add_to(&mut msg)?;
                    TextAttribute::new(ATTR_NONCE, auth.nonce.clone()).add_to(&mut msg)?;
                    Some(integrity.clone())
                } else {
                    None
                }
            };
            if let Some(integrity) = integrity {
                integrity.add_to(&mut msg)?;
            }
            FINGERPRINT.add_to(&mut msg)?;

            let res = self.stun_client.send_request(&msg).await?;
            if res.typ.class != CLASS_ERROR_RESPONSE {
                return Ok(res);
            }

            let mut code = ErrorCodeAttribute::default();
            let _ = code.get_from(&res);
            match code.code {
                CODE_UNAUTHORIZED | CODE_STALE_NONCE => {
                    if code.code == CODE_STALE_NONCE {
                        if stale_retry {
                            return Err(Error::ErrStaleNonce);
                        }
                        stale_retry = true;
                    } else if self.auth.lock().await.integrity.is_some() {
                        // 401 with credentials already in place is fatal
                        return Err(Error::ErrAllocationFailure(format!("{code}")));
                    }

                    let realm = TextAttribute::get_from_as(&res, ATTR_REALM)
                        .map(|a| a.text)
                        .unwrap_or_default();
                    let nonce = TextAttribute::get_from_as(&res, ATTR_NONCE)
                        .map(|a| a.text)
                        .unwrap_or_default();

                    let mut auth = self.auth.lock().await;
                    if !realm.is_empty() {
                        auth.realm = realm;
                    }
                    auth.nonce = nonce;
                    auth.integrity = Some(MessageIntegrity::new_long_term_integrity(
                        &self.username,
                        &auth.realm,
                        &self.password,
                    ));
                }
                _ => {
                    return Err(Error::ErrAllocationFailure(format!("{code}")));
                }
            }
        }
    }
}
