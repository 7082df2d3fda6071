#[cfg(test)]
mod client_test;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use util::Conn;

use crate::agent::*;
use crate::error::*;
use crate::message::*;

const DEFAULT_RTO: Duration = Duration::from_millis(500);
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);
const DEFAULT_MAX_ATTEMPTS: u32 = 7;
const MAX_MESSAGE_SIZE: usize = 1500;

/// ClientConfig configures a Client.
pub struct ClientConfig {
    pub conn: Arc<dyn Conn + Send + Sync>,
    /// Initial retransmission timeout; doubles on every attempt.
    pub rto: Duration,
    /// Overall per-transaction deadline.
    pub timeout: Duration,
    /// Retransmission cap.
    pub max_attempts: u32,
    /// Receives STUN indications (messages that are not responses).
    pub indication_tx: Option<mpsc::UnboundedSender<Message>>,
    /// Receives non-STUN datagrams read from the connection
    /// (e.g. TURN ChannelData).
    pub data_tx: Option<mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>>,
}

impl ClientConfig {
    pub fn new(conn: Arc<dyn Conn + Send + Sync>) -> Self {
        ClientConfig {
            conn,
            rto: DEFAULT_RTO,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            indication_tx: None,
            data_tx: None,
        }
    }
}

/// Client simulates "connection" to a STUN server: requests are sent over
/// the supplied Conn and responses matched back to callers by transaction
/// id, with RFC 5389 retransmissions in between.
pub struct Client {
    conn: Arc<dyn Conn + Send + Sync>,
    agent: Arc<Mutex<Agent>>,
    rto: Duration,
    timeout: Duration,
    max_attempts: u32,
    reader_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let agent = Arc::new(Mutex::new(Agent::new()));
        let client = Arc::new(Client {
            conn: Arc::clone(&config.conn),
            agent: Arc::clone(&agent),
            rto: config.rto,
            timeout: config.timeout,
            max_attempts: config.max_attempts,
            reader_handle: Mutex::new(None),
        });

        let conn = config.conn;
        let indication_tx = config.indication_tx;
        let data_tx = config.data_tx;
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
            loop {
                let (n, from) = match conn.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(_) => break,
                };
                if is_message(&buf[..n]) {
                    let mut msg = Message::new();
                    if msg.unmarshal_binary(&buf[..n]).is_err() {
                        continue;
                    }
                    match msg.typ.class {
                        CLASS_SUCCESS_RESPONSE | CLASS_ERROR_RESPONSE => {
                            let mut agent = agent.lock().await;
                            if agent.process(msg).is_err() {
                                log::trace!("response for unknown transaction");
                            }
                        }
                        _ => {
                            if let Some(tx) = &indication_tx {
                                let _ = tx.send(msg);
                            }
                        }
                    }
                } else if let Some(tx) = &data_tx {
                    let _ = tx.send((buf[..n].to_vec(), from));
                }
            }

            let mut agent = agent.lock().await;
            agent.close();
        });

        if let Ok(mut guard) = client.reader_handle.try_lock() {
            *guard = Some(handle);
        }

        client
    }

    /// send_request performs a transaction: transmit with retransmissions
    /// until a response with a matching transaction id arrives, the
    /// attempts are exhausted or the deadline passes. Error responses are
    /// returned as messages; the caller inspects the class.
    pub async fn send_request(&self, m: &Message) -> Result<Message> {
        let (tx, mut rx) = oneshot::channel();
        {
            let mut agent = self.agent.lock().await;
            agent.start(m.transaction_id, tx)?;
        }

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut rto = self.rto;
        let mut attempt = 0u32;
        loop {
            self.conn.send(&m.raw).await?;
            attempt += 1;

            let wait = tokio::time::Instant::now() + rto;
            let wait = wait.min(deadline);
            match tokio::time::timeout_at(wait, &mut rx).await {
                Ok(Ok(event)) => return event.result,
                Ok(Err(_)) => return Err(Error::ErrClientClosed),
                Err(_) => {
                    // retransmission timer fired
                    if attempt >= self.max_attempts || tokio::time::Instant::now() >= deadline {
                        let mut agent = self.agent.lock().await;
                        // unregister without signalling; the receiver side
                        // is dropped with rx
                        let _ = agent.stop(m.transaction_id);
                        return Err(Error::ErrTransactionTimeOut);
                    }
                    rto *= 2;
                }
            }
        }
    }

    /// send_indication transmits a message without expecting a response.
    pub async fn send_indication(&self, m: &Message) -> Result<()> {
        self.conn.send(&m.raw).await?;
        Ok(())
    }

    /// send_raw transmits arbitrary bytes over the client's connection.
    pub async fn send_raw(&self, data: &[u8]) -> Result<()> {
        self.conn.send(data).await?;
        Ok(())
    }

    pub fn conn(&self) -> Arc<dyn Conn + Send + Sync> {
        Arc::clone(&self.conn)
    }

    pub async fn close(&self) -> Result<()> {
        {
            let mut agent = self.agent.lock().await;
            agent.close();
        }
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        let _ = self.conn.close().await;
        Ok(())
    }
}
