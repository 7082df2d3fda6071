pub mod data_channel_state;

use std::sync::atomic::{AtomicU16, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};

use bytes::Bytes;
use data::message::message_channel_open::ChannelType;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use data_channel_state::RTCDataChannelState;

/// DataChannelMessage is one message as delivered by on_message.
#[derive(Debug, Clone)]
pub struct DataChannelMessage {
    pub is_string: bool,
    pub data: Bytes,
}

pub type OnMessageHdlrFn = Box<dyn FnMut(DataChannelMessage) + Send + Sync>;
pub type OnOpenHdlrFn = Box<dyn FnMut() + Send + Sync>;
pub type OnCloseHdlrFn = Box<dyn FnMut() + Send + Sync>;
pub type OnBufferedAmountLowHdlrFn = Box<dyn Fn() + Send + Sync>;

/// RTCDataChannelInit mirrors the W3C dictionary of channel options.
#[derive(Default, Debug, Clone)]
pub struct RTCDataChannelInit {
    pub ordered: Option<bool>,
    pub max_packet_life_time: Option<u16>,
    pub max_retransmits: Option<u16>,
    pub protocol: Option<String>,
    pub negotiated: Option<u16>,
}

/// RTCDataChannel is a bidirectional message channel between two peers,
/// mapped onto one SCTP stream (RFC 8831).
pub struct RTCDataChannel {
    label: String,
    protocol: String,
    ordered: bool,
    max_packet_life_time: Option<u16>,
    max_retransmits: Option<u16>,
    negotiated: Option<u16>,

    id: AtomicU16,
    ready_state: AtomicU8,

    inner: Mutex<Option<Arc<data::data_channel::DataChannel>>>,

    on_message: Arc<SyncMutex<Option<OnMessageHdlrFn>>>,
    on_open: Arc<SyncMutex<Option<OnOpenHdlrFn>>>,
    on_close: Arc<SyncMutex<Option<OnCloseHdlrFn>>>,

    buffered_amount_low_threshold: AtomicUsize,
    pump_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl RTCDataChannel {
    pub(crate) fn new(label: String, init: RTCDataChannelInit) -> Arc<Self> {
        Arc::new(RTCDataChannel {
            label,
            protocol: init.protocol.clone().unwrap_or_default(),
            ordered: init.ordered.unwrap_or(true),
            max_packet_life_time: init.max_packet_life_time,
            max_retransmits: init.max_retransmits,
            negotiated: init.negotiated,
            id: AtomicU16::new(init.negotiated.unwrap_or(u16::MAX)),
            ready_state: AtomicU8::new(RTCDataChannelState::Connecting as u8),
            inner: Mutex::new(None),
            on_message: Arc::new(SyncMutex::new(None)),
            on_open: Arc::new(SyncMutex::new(None)),
            on_close: Arc::new(SyncMutex::new(None)),
            buffered_amount_low_threshold: AtomicUsize::new(0),
            pump_handles: Mutex::new(vec![]),
        })
    }

    /// from_accepted wraps an inbound, already-acknowledged channel.
    pub(crate) async fn from_accepted(inner: Arc<data::data_channel::DataChannel>) -> Arc<Self> {
        let channel = Arc::new(RTCDataChannel {
            label: inner.label().to_owned(),
            protocol: inner.protocol().to_owned(),
            ordered: !inner.config.channel_type.is_unordered(),
            max_packet_life_time: match inner.config.channel_type {
                ChannelType::PartialReliableTimed | ChannelType::PartialReliableTimedUnordered => {
                    Some(inner.config.reliability_parameter as u16)
                }
                _ => None,
            },
            max_retransmits: match inner.config.channel_type {
                ChannelType::PartialReliableRexmit
                | ChannelType::PartialReliableRexmitUnordered => {
                    Some(inner.config.reliability_parameter as u16)
                }
                _ => None,
            },
            negotiated: None,
            id: AtomicU16::new(inner.stream_identifier()),
            ready_state: AtomicU8::new(RTCDataChannelState::Connecting as u8),
            inner: Mutex::new(None),
            on_message: Arc::new(SyncMutex::new(None)),
            on_open: Arc::new(SyncMutex::new(None)),
            on_close: Arc::new(SyncMutex::new(None)),
            buffered_amount_low_threshold: AtomicUsize::new(0),
            pump_handles: Mutex::new(vec![]),
        });
        channel.attach(inner, true).await;
        channel
    }

    /// The DCEP parameters this channel dials with.
    pub(crate) fn dcep_config(&self) -> data::data_channel::Config {
        let channel_type = match (self.ordered, self.max_retransmits, self.max_packet_life_time)
        {
            (true, None, None) => ChannelType::Reliable,
            (false, None, None) => ChannelType::ReliableUnordered,
            (true, Some(_), _) => ChannelType::PartialReliableRexmit,
            (false, Some(_), _) => ChannelType::PartialReliableRexmitUnordered,
            (true, None, Some(_)) => ChannelType::PartialReliableTimed,
            (false, None, Some(_)) => ChannelType::PartialReliableTimedUnordered,
        };
        let reliability_parameter = self
            .max_retransmits
            .or(self.max_packet_life_time)
            .unwrap_or(0) as u32;

        data::data_channel::Config {
            channel_type,
            negotiated: self.negotiated.is_some(),
            priority: 0,
            reliability_parameter,
            label: self.label.clone(),
            protocol: self.protocol.clone(),
        }
    }

    /// attach binds the SCTP-backed channel and starts the event pumps.
    pub(crate) async fn attach(
        self: &Arc<Self>,
        inner: Arc<data::data_channel::DataChannel>,
        already_open: bool,
    ) {
        self.id.store(inner.stream_identifier(), Ordering::SeqCst);
        {
            let mut guard = self.inner.lock().await;
            *guard = Some(Arc::clone(&inner));
        }

        let mut handles = self.pump_handles.lock().await;

        if already_open {
            self.fire_open();
        } else {
            // the dialer opens when the ACK is consumed by the read pump
            let channel = Arc::clone(self);
            let open_inner = Arc::clone(&inner);
            handles.push(tokio::spawn(async move {
                open_inner.wait_open().await;
                channel.fire_open();
            }));
        }

        let channel = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut buf = vec![0u8; 65536];
            loop {
                match inner.read_data_channel(&mut buf).await {
                    Ok((n, is_string)) => {
                        let message = DataChannelMessage {
                            is_string,
                            data: Bytes::copy_from_slice(&buf[..n]),
                        };
                        let mut handler = channel.on_message.lock().unwrap();
                        if let Some(f) = &mut *handler {
                            f(message);
                        }
                    }
                    Err(err) => {
                        log::debug!("data channel read pump exiting: {err}");
                        channel.fire_close();
                        break;
                    }
                }
            }
        }));
    }

    fn fire_open(&self) {
        self.ready_state
            .store(RTCDataChannelState::Open as u8, Ordering::SeqCst);
        let mut handler = self.on_open.lock().unwrap();
        if let Some(f) = &mut *handler {
            f();
        }
    }

    fn fire_close(&self) {
        self.ready_state
            .store(RTCDataChannelState::Closed as u8, Ordering::SeqCst);
        let mut handler = self.on_close.lock().unwrap();
        if let Some(f) = &mut *handler {
            f();
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn id(&self) -> u16 {
        self.id.load(Ordering::SeqCst)
    }

    pub fn ready_state(&self) -> RTCDataChannelState {
        RTCDataChannelState::from(self.ready_state.load(Ordering::SeqCst))
    }

    pub fn on_message(&self, f: OnMessageHdlrFn) {
        let mut guard = self.on_message.lock().unwrap();
        *guard = Some(f);
    }

    pub fn on_open(&self, f: OnOpenHdlrFn) {
        // a channel that opened before the handler landed still fires
        let fire_now = self.ready_state() == RTCDataChannelState::Open;
        if fire_now {
            let mut f = f;
            f();
            return;
        }
        let mut guard = self.on_open.lock().unwrap();
        *guard = Some(f);
    }

    pub fn on_close(&self, f: OnCloseHdlrFn) {
        let mut guard = self.on_close.lock().unwrap();
        *guard = Some(f);
    }

    /// send transmits binary data.
    pub async fn send(&self, data: &Bytes) -> Result<usize> {
        let inner = self.require_open().await?;
        Ok(inner.write_data_channel(data, false).await?)
    }

    /// send_text transmits a UTF-8 string message.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<usize> {
        let inner = self.require_open().await?;
        let text = text.into();
        Ok(inner
            .write_data_channel(&Bytes::from(text.into_bytes()), true)
            .await?)
    }

    async fn require_open(&self) -> Result<Arc<data::data_channel::DataChannel>> {
        if self.ready_state() != RTCDataChannelState::Open {
            return Err(Error::ErrDataChannelNotOpen);
        }
        let guard = self.inner.lock().await;
        guard.clone().ok_or(Error::ErrDataChannelNotOpen)
    }

    pub async fn buffered_amount(&self) -> usize {
        let guard = self.inner.lock().await;
        guard.as_ref().map(|i| i.buffered_amount()).unwrap_or(0)
    }

    pub fn buffered_amount_low_threshold(&self) -> usize {
        self.buffered_amount_low_threshold.load(Ordering::SeqCst)
    }

    /// set_buffered_amount_low_threshold arms the low-watermark event.
    pub async fn set_buffered_amount_low_threshold(&self, th: usize) {
        self.buffered_amount_low_threshold.store(th, Ordering::SeqCst);
        let guard = self.inner.lock().await;
        if let Some(inner) = &*guard {
            inner.set_buffered_amount_low_threshold(th);
        }
    }

    pub async fn on_buffered_amount_low(&self, f: OnBufferedAmountLowHdlrFn) {
        let guard = self.inner.lock().await;
        if let Some(inner) = &*guard {
            inner.on_buffered_amount_low(f);
        }
    }

    /// close signals closure via SCTP stream reset; the channel leaves
    /// `open` only now.
    pub async fn close(&self) -> Result<()> {
        self.ready_state
            .store(RTCDataChannelState::Closing as u8, Ordering::SeqCst);
        let inner = {
            let guard = self.inner.lock().await;
            guard.clone()
        };
        if let Some(inner) = inner {
            inner.close().await?;
        }
        self.fire_close();
        Ok(())
    }
}
