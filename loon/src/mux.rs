#[cfg(test)]
mod mux_test;

pub mod endpoint;
pub mod mux_func;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use util::{Buffer, Conn};

use crate::error::Result;
use endpoint::Endpoint;
use mux_func::MatchFunc;

/// The amount of processes that can be queued on one endpoint buffer.
const MAX_BUFFER_COUNT: usize = 512;

/// Config collects the arguments to Mux construction into a single
/// structure.
pub struct Config {
    pub conn: Arc<dyn Conn + Send + Sync>,
    pub buffer_size: usize,
}

/// Mux allows multiplexing one datagram connection between many
/// consumers by inspecting each packet's first byte (RFC 7983-style
/// demultiplexing).
pub struct Mux {
    next_conn: Arc<dyn Conn + Send + Sync>,
    endpoints: Arc<Mutex<HashMap<usize, Arc<Endpoint>>>>,
    next_id: std::sync::atomic::AtomicUsize,
    pump: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Mux {
    pub fn new(config: Config) -> Arc<Self> {
        let mux = Arc::new(Mux {
            next_conn: Arc::clone(&config.conn),
            endpoints: Arc::new(Mutex::new(HashMap::new())),
            next_id: std::sync::atomic::AtomicUsize::new(0),
            pump: Mutex::new(None),
        });

        let next_conn = Arc::clone(&config.conn);
        let endpoints = Arc::clone(&mux.endpoints);
        let buffer_size = if config.buffer_size == 0 {
            crate::RECEIVE_MTU
        } else {
            config.buffer_size
        };
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; buffer_size];
            loop {
                let n = match next_conn.recv(&mut buf).await {
                    Ok(n) => n,
                    Err(err) => {
                        log::debug!("mux read loop exiting: {err}");
                        break;
                    }
                };
                Mux::dispatch(&endpoints, &buf[..n]).await;
            }

            // unblock all readers on shutdown
            let eps = endpoints.lock().await;
            for ep in eps.values() {
                ep.buffer.close().await;
            }
        });
        if let Ok(mut guard) = mux.pump.try_lock() {
            *guard = Some(handle);
        }

        mux
    }

    /// new_endpoint creates a new Endpoint that reads the packets
    /// matched by f.
    pub async fn new_endpoint(self: &Arc<Self>, match_fn: MatchFunc) -> Arc<Endpoint> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let endpoint = Arc::new(Endpoint {
            id,
            buffer: Buffer::new(MAX_BUFFER_COUNT),
            match_fn,
            next_conn: Arc::clone(&self.next_conn),
            endpoints: Arc::clone(&self.endpoints),
        });

        let mut endpoints = self.endpoints.lock().await;
        endpoints.insert(id, Arc::clone(&endpoint));
        endpoint
    }

    async fn dispatch(endpoints: &Arc<Mutex<HashMap<usize, Arc<Endpoint>>>>, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let eps = endpoints.lock().await;
        let mut handled = false;
        for ep in eps.values() {
            if (ep.match_fn)(data) {
                handled = true;
                if let Err(err) = ep.buffer.write(data).await {
                    log::debug!("mux: endpoint buffer write failed: {err}");
                }
            }
        }
        if !handled {
            log::trace!(
                "Warning: mux: no endpoint for packet starting with {}",
                data[0]
            );
        }
    }

    /// remove_endpoint removes an endpoint from the Mux.
    pub async fn remove_endpoint(&self, e: &Endpoint) {
        let mut endpoints = self.endpoints.lock().await;
        endpoints.remove(&e.id);
    }

    /// close closes the Mux and all associated Endpoints.
    pub async fn close(&self) -> Result<()> {
        {
            let mut endpoints = self.endpoints.lock().await;
            for ep in endpoints.values() {
                ep.buffer.close().await;
            }
            endpoints.clear();
        }
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}
