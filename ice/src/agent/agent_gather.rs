use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use stun::fingerprint::FINGERPRINT;
use stun::message::*;
use stun::xoraddr::XorMappedAddress;
use tokio::net::UdpSocket;
use util::Conn;

use super::Agent;
use crate::candidate::*;
use crate::mdns_mode::{generate_multicast_dns_name, MulticastDnsMode};
use crate::network_type::NetworkType;
use crate::state::GatheringState;
use crate::url::{ProtoType, SchemeType, Url};

/// gather runs the full local gathering pass: srflx and relay first
/// (their transactions own their sockets briefly), then host candidates
/// with persistent read loops, then the end-of-candidates sentinel.
pub(crate) async fn gather(agent: Arc<Agent>) {
    let (urls, candidate_types, include_loopback, mdns_mode) = {
        let internal = agent.internal.lock().await;
        (
            internal.urls.clone(),
            internal.candidate_types.clone(),
            internal.include_loopback,
            internal.multicast_dns_mode,
        )
    };

    let local_ips = local_interfaces(include_loopback);

    // mDNS service: register our obfuscation name and/or resolve peers
    if mdns_mode != MulticastDnsMode::Disabled {
        let mdns_name = if mdns_mode == MulticastDnsMode::QueryAndGather {
            generate_multicast_dns_name()
        } else {
            String::new()
        };
        let config = mdns::Config {
            local_names: if mdns_name.is_empty() {
                vec![]
            } else {
                vec![mdns_name.clone()]
            },
            local_address: local_ips.first().copied(),
            ..Default::default()
        };
        match mdns::DnsConn::server(config) {
            Ok(conn) => {
                let mut internal = agent.internal.lock().await;
                internal.mdns_conn = Some(Arc::new(conn));
                internal.mdns_name = mdns_name;
            }
            Err(err) => log::warn!("failed to start mDNS: {err}"),
        }
    }

    if candidate_types.contains(&CandidateType::ServerReflexive) {
        gather_srflx(&agent, &urls, &local_ips).await;
    }
    if candidate_types.contains(&CandidateType::Relay) {
        gather_relay(&agent, &urls).await;
    }
    if candidate_types.contains(&CandidateType::Host) {
        gather_host(&agent, &local_ips).await;
    }

    let mut internal = agent.internal.lock().await;
    internal.gathering_state = GatheringState::Complete;
    if let Some(hdlr) = &mut internal.on_candidate_hdlr {
        hdlr(None);
    }
}

/// The primary route address, discovered without sending a packet
/// (connecting a UDP socket only selects a route).
fn local_interfaces(include_loopback: bool) -> Vec<IpAddr> {
    let mut ips = vec![];
    if let Ok(socket) = std::net::UdpSocket::bind("0.0.0.0:0") {
        if socket.connect("8.8.8.8:80").is_ok() {
            if let Ok(addr) = socket.local_addr() {
                if !addr.ip().is_loopback() && !addr.ip().is_unspecified() {
                    ips.push(addr.ip());
                }
            }
        }
    }
    if ips.is_empty() || include_loopback {
        ips.push(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    ips
}

async fn gather_host(agent: &Arc<Agent>, local_ips: &[IpAddr]) {
    for ip in local_ips {
        let socket = match UdpSocket::bind(SocketAddr::new(*ip, 0)).await {
            Ok(s) => s,
            Err(err) => {
                log::warn!("failed to bind host candidate socket on {ip}: {err}");
                continue;
            }
        };
        let port = match socket.local_addr() {
            Ok(a) => a.port(),
            Err(_) => continue,
        };
        let conn: Arc<dyn Conn + Send + Sync> = Arc::new(socket);

        let (address, resolved) = {
            let internal = agent.internal.lock().await;
            if internal.mdns_name.is_empty() {
                (ip.to_string(), None)
            } else {
                // obfuscated host candidate; we still know our own addr
                (internal.mdns_name.clone(), Some(SocketAddr::new(*ip, port)))
            }
        };

        let candidate = Arc::new(Candidate {
            network_type: if ip.is_ipv4() {
                NetworkType::Udp4
            } else {
                NetworkType::Udp6
            },
            candidate_type: CandidateType::Host,
            address,
            port,
            component: COMPONENT_RTP,
            conn: Some(Arc::clone(&conn)),
            ..Default::default()
        });
        if let Some(resolved) = resolved {
            candidate.set_resolved_addr(resolved);
        }

        add_and_pump(agent, candidate, conn).await;
    }
}

async fn gather_srflx(agent: &Arc<Agent>, urls: &[Url], local_ips: &[IpAddr]) {
    for url in urls {
        if url.scheme != SchemeType::Stun || url.proto != ProtoType::Udp {
            continue;
        }
        let server = format!("{}:{}", url.host, url.port);
        let Ok(server_addr) = tokio::net::lookup_host(server.clone())
            .await
            .map(|mut it| it.next())
        else {
            log::warn!("failed to resolve STUN server {server}");
            continue;
        };
        let Some(server_addr) = server_addr else {
            continue;
        };

        let bind_ip = local_ips
            .first()
            .copied()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let socket = match UdpSocket::bind(SocketAddr::new(bind_ip, 0)).await {
            Ok(s) => s,
            Err(err) => {
                log::warn!("failed to bind srflx socket: {err}");
                continue;
            }
        };
        let base_addr = match socket.local_addr() {
            Ok(a) => a,
            Err(_) => continue,
        };

        // one manual Binding transaction on the future candidate socket
        let mut request = Message::new();
        if request
            .build(&[
                Box::new(TransactionId::new()),
                Box::new(BINDING_REQUEST),
                Box::new(FINGERPRINT),
            ])
            .is_err()
        {
            continue;
        }

        let stun_timeout = {
            let internal = agent.internal.lock().await;
            internal.stun_timeout
        };
        let mut reflexive = None;
        let mut buf = vec![0u8; RECEIVE_MTU];
        for _ in 0..2 {
            if socket.send_to(&request.raw, server_addr).await.is_err() {
                break;
            }
            match tokio::time::timeout(stun_timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok((n, _))) => {
                    let mut response = Message::new();
                    if response.unmarshal_binary(&buf[..n]).is_ok()
                        && response.transaction_id == request.transaction_id
                    {
                        let mut xor = XorMappedAddress::default();
                        if xor.get_from(&response).is_ok() {
                            reflexive = Some(SocketAddr::new(xor.ip, xor.port));
                        }
                    }
                    break;
                }
                _ => continue,
            }
        }

        let Some(reflexive) = reflexive else {
            log::warn!("STUN binding to {server} produced no reflexive address");
            continue;
        };

        let conn: Arc<dyn Conn + Send + Sync> = Arc::new(socket);
        let candidate = Arc::new(Candidate {
            network_type: NetworkType::Udp4,
            candidate_type: CandidateType::ServerReflexive,
            address: reflexive.ip().to_string(),
            port: reflexive.port(),
            component: COMPONENT_RTP,
            related_address: Some(CandidateRelatedAddress {
                address: base_addr.ip().to_string(),
                port: base_addr.port(),
            }),
            conn: Some(Arc::clone(&conn)),
            ..Default::default()
        });

        add_and_pump(agent, candidate, conn).await;
    }
}

async fn gather_relay(agent: &Arc<Agent>, urls: &[Url]) {
    for url in urls {
        if url.scheme != SchemeType::Turn || url.proto != ProtoType::Udp {
            continue;
        }
        let server = format!("{}:{}", url.host, url.port);
        let Ok(Some(server_addr)) = tokio::net::lookup_host(server.clone())
            .await
            .map(|mut it| it.next())
        else {
            log::warn!("failed to resolve TURN server {server}");
            continue;
        };

        let socket = match UdpSocket::bind("0.0.0.0:0").await {
            Ok(s) => s,
            Err(err) => {
                log::warn!("failed to bind relay socket: {err}");
                continue;
            }
        };
        if socket.connect(server_addr).await.is_err() {
            continue;
        }

        let client = match turn::client::Client::new(turn::client::ClientConfig {
            stun_serv_addr: None,
            turn_serv_addr: server_addr,
            username: url.username.clone(),
            password: url.password.clone(),
            realm: String::new(),
            software: String::new(),
            rto: std::time::Duration::from_millis(200),
            conn: Arc::new(socket),
        })
        .await
        {
            Ok(c) => c,
            Err(err) => {
                log::warn!("failed to create TURN client for {server}: {err}");
                continue;
            }
        };

        let relay_conn = match client.allocate().await {
            Ok(c) => c,
            Err(err) => {
                log::warn!("TURN allocation on {server} failed: {err}");
                continue;
            }
        };
        let relayed = relay_conn.relayed_addr();

        let conn: Arc<dyn Conn + Send + Sync> = relay_conn;
        let candidate = Arc::new(Candidate {
            network_type: NetworkType::Udp4,
            candidate_type: CandidateType::Relay,
            address: relayed.ip().to_string(),
            port: relayed.port(),
            component: COMPONENT_RTP,
            related_address: Some(CandidateRelatedAddress {
                address: server_addr.ip().to_string(),
                port: server_addr.port(),
            }),
            conn: Some(Arc::clone(&conn)),
            ..Default::default()
        });

        add_and_pump(agent, candidate, conn).await;
    }
}

/// Registers the candidate and spawns its socket read loop: STUN goes to
/// the agent, everything else surfaces on the AgentConn buffer.
async fn add_and_pump(
    agent: &Arc<Agent>,
    candidate: Arc<Candidate>,
    conn: Arc<dyn Conn + Send + Sync>,
) {
    let (local_idx, buffer) = {
        let mut internal = agent.internal.lock().await;
        internal.add_local_candidate(Arc::clone(&candidate));
        let idx = internal
            .local_candidates
            .iter()
            .position(|c| c.id == candidate.id);
        (idx, internal.buffer.clone())
    };
    let Some(local_idx) = local_idx else {
        // duplicate candidate; socket not needed
        return;
    };

    let task_agent = Arc::clone(agent);
    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; RECEIVE_MTU];
        loop {
            let (n, from) = match conn.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(_) => break,
            };
            if stun::message::is_message(&buf[..n]) {
                {
                    let mut internal = task_agent.internal.lock().await;
                    if internal.done {
                        break;
                    }
                    internal.handle_inbound(&buf[..n], local_idx, from).await;
                }
                task_agent.notify.notify_one();
            } else if buffer.write(&buf[..n]).await.is_err() {
                break;
            }
        }
    });

    let mut internal = agent.internal.lock().await;
    internal.read_loop_handles.push(handle);
}
