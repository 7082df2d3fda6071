#[cfg(test)]
mod conn_test;

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};

use crate::config::Config;
use crate::error::*;
use crate::message::*;

pub const DEFAULT_DEST_ADDR: &str = "224.0.0.251:5353";

const INBOUND_BUFFER_SIZE: usize = 512;
const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(1);
const RESPONSE_TTL: u32 = 120;

struct Query {
    name_with_suffix: String,
    query_result_chan: mpsc::Sender<QueryResult>,
}

struct QueryResult {
    answer: String,
    addr: IpAddr,
}

/// DnsConn is a shared mDNS endpoint: it answers A queries for the names
/// registered to it and resolves remote `.local` names by multicasting
/// queries on 224.0.0.251:5353.
pub struct DnsConn {
    socket: Arc<UdpSocket>,
    dst_addr: SocketAddr,
    query_interval: Duration,
    queries: Arc<Mutex<Vec<Query>>>,
    recv_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl DnsConn {
    /// server establishes a mDNS connection over the well-known multicast
    /// group, both answering for config.local_names and serving queries.
    pub fn server(config: Config) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(not(windows))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&SocketAddr::from(([0, 0, 0, 0], 5353)).into())?;
        socket.join_multicast_v4(&Ipv4Addr::new(224, 0, 0, 251), &Ipv4Addr::UNSPECIFIED)?;
        socket.set_multicast_loop_v4(true)?;

        let socket = UdpSocket::from_std(socket.into())?;

        let dst_addr: SocketAddr = DEFAULT_DEST_ADDR
            .parse()
            .map_err(|_| Error::Other("bad mDNS destination".to_owned()))?;

        let local_names: Vec<String> = config
            .local_names
            .iter()
            .map(|n| ensure_suffix(n))
            .collect();
        if !local_names.is_empty() && config.local_address.is_none() {
            return Err(Error::Other(
                "local_address required to answer mDNS queries".to_owned(),
            ));
        }

        let conn = DnsConn {
            socket: Arc::new(socket),
            dst_addr,
            query_interval: if config.query_interval.is_zero() {
                DEFAULT_QUERY_INTERVAL
            } else {
                config.query_interval
            },
            queries: Arc::new(Mutex::new(vec![])),
            recv_handle: Mutex::new(None),
        };

        let socket = Arc::clone(&conn.socket);
        let queries = Arc::clone(&conn.queries);
        let local_address = config.local_address;
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; INBOUND_BUFFER_SIZE];
            loop {
                let (n, from) = match socket.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(err) => {
                        log::warn!("mDNS recv loop exiting: {err}");
                        return;
                    }
                };
                if let Err(err) = handle_packet(
                    &buf[..n],
                    from,
                    &socket,
                    dst_addr,
                    &local_names,
                    local_address,
                    &queries,
                )
                .await
                {
                    log::trace!("failed to handle mDNS packet: {err}");
                }
            }
        });
        if let Ok(mut guard) = conn.recv_handle.try_lock() {
            *guard = Some(handle);
        }

        Ok(conn)
    }

    /// query multicasts a question for name until an A answer arrives or
    /// the timeout passes, re-sending every query_interval.
    pub async fn query(&self, name: &str, timeout: Duration) -> Result<(String, IpAddr)> {
        let name_with_suffix = ensure_suffix(name);

        let (result_tx, mut result_rx) = mpsc::channel(1);
        {
            let mut queries = self.queries.lock().await;
            queries.push(Query {
                name_with_suffix: name_with_suffix.clone(),
                query_result_chan: result_tx,
            });
        }

        let deadline = tokio::time::Instant::now() + timeout;
        let result = loop {
            self.send_question(&name_with_suffix).await?;

            let next_send = tokio::time::Instant::now() + self.query_interval;
            let wait_until = next_send.min(deadline);
            match tokio::time::timeout_at(wait_until, result_rx.recv()).await {
                Ok(Some(result)) => break Ok((result.answer, result.addr)),
                Ok(None) => break Err(Error::ErrConnectionClosed),
                Err(_) => {
                    if tokio::time::Instant::now() >= deadline {
                        break Err(Error::ErrContextElapsed);
                    }
                    // interval elapsed, re-send the question
                }
            }
        };

        let mut queries = self.queries.lock().await;
        queries.retain(|q| q.name_with_suffix != name_with_suffix);
        result
    }

    async fn send_question(&self, name: &str) -> Result<()> {
        let mut out = vec![];
        Header {
            questions: 1,
            ..Default::default()
        }
        .pack(&mut out);
        Question {
            name: name.to_owned(),
            typ: TYPE_A,
            class: CLASS_IN,
        }
        .pack(&mut out)?;

        self.socket.send_to(&out, self.dst_addr).await?;
        Ok(())
    }

    pub async fn close(&self) {
        if let Some(handle) = self.recv_handle.lock().await.take() {
            handle.abort();
        }
    }
}

async fn handle_packet(
    buf: &[u8],
    from: SocketAddr,
    socket: &UdpSocket,
    dst_addr: SocketAddr,
    local_names: &[String],
    local_address: Option<IpAddr>,
    queries: &Arc<Mutex<Vec<Query>>>,
) -> Result<()> {
    let header = Header::unpack(buf)?;
    let mut off = HEADER_SIZE;

    if !header.response {
        // a query: answer any question naming one of our local names
        for _ in 0..header.questions {
            let (question, next) = Question::unpack(buf, off)?;
            off = next;
            if question.typ != TYPE_A || question.class & CLASS_MASK != CLASS_IN {
                continue;
            }
            let matched = local_names.iter().any(|n| *n == question.name);
            if !matched {
                continue;
            }
            let Some(IpAddr::V4(addr)) = local_address else {
                continue;
            };

            let mut out = vec![];
            Header {
                response: true,
                authoritative: true,
                answers: 1,
                ..Default::default()
            }
            .pack(&mut out);
            AResource {
                name: question.name.clone(),
                ttl: RESPONSE_TTL,
                addr,
            }
            .pack(&mut out)?;
            socket.send_to(&out, dst_addr).await?;
            log::debug!("answered mDNS query for {} from {}", question.name, from);
        }
        return Ok(());
    }

    // a response: walk questions (usually zero), then match answers
    for _ in 0..header.questions {
        let (_, next) = Question::unpack(buf, off)?;
        off = next;
    }
    for _ in 0..header.answers {
        let (answer, next) = AResource::unpack(buf, off)?;
        off = next;
        let Some(answer) = answer else { continue };

        let mut queries = queries.lock().await;
        let mut matched = None;
        for (i, q) in queries.iter().enumerate() {
            if q.name_with_suffix == answer.name {
                matched = Some(i);
                break;
            }
        }
        if let Some(i) = matched {
            let q = queries.remove(i);
            let _ = q
                .query_result_chan
                .send(QueryResult {
                    answer: answer.name.clone(),
                    addr: IpAddr::V4(answer.addr),
                })
                .await;
        }
    }

    Ok(())
}

fn ensure_suffix(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}
