#[cfg(test)]
mod data_channel_test;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use sctp::association::Association;
use sctp::chunk::chunk_payload_data::PayloadProtocolIdentifier;
use sctp::stream::{OnBufferedAmountLowFn, ReliabilityType, Stream};
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::message::message_channel_ack::DataChannelAck;
use crate::message::message_channel_open::{ChannelType, DataChannelOpen};
use crate::message::Message;

/// Config is used to configure a new DataChannel.
#[derive(Debug, Clone)]
pub struct Config {
    pub channel_type: ChannelType,
    pub negotiated: bool,
    pub priority: u16,
    pub reliability_parameter: u32,
    pub label: String,
    pub protocol: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel_type: ChannelType::Reliable,
            negotiated: false,
            priority: 0,
            reliability_parameter: 0,
            label: String::new(),
            protocol: String::new(),
        }
    }
}

/// DataChannel is one WebRTC data channel mapped onto an SCTP stream
/// (RFC 8831): DCEP negotiates it, then PPIDs tag string/binary frames.
pub struct DataChannel {
    pub(crate) stream: Arc<Stream>,
    pub config: Config,
    opened: AtomicBool,
    open_notify: Notify,
    messages_sent: AtomicUsize,
    messages_received: AtomicUsize,
}

impl DataChannel {
    fn new(stream: Arc<Stream>, config: Config, opened: bool) -> Self {
        DataChannel {
            stream,
            config,
            opened: AtomicBool::new(opened),
            open_notify: Notify::new(),
            messages_sent: AtomicUsize::new(0),
            messages_received: AtomicUsize::new(0),
        }
    }

    /// dial opens stream `identifier` and, unless the channel was
    /// negotiated out-of-band, sends DATA_CHANNEL_OPEN on it.
    pub async fn dial(
        association: &Arc<Association>,
        identifier: u16,
        config: Config,
    ) -> Result<Self> {
        let stream = association
            .open_stream(identifier, PayloadProtocolIdentifier::Dcep)
            .await?;

        apply_reliability(&stream, &config);

        if config.negotiated {
            return Ok(DataChannel::new(stream, config, true));
        }

        let open = Message::DataChannelOpen(DataChannelOpen {
            channel_type: config.channel_type,
            priority: config.priority,
            reliability_parameter: config.reliability_parameter,
            label: config.label.as_bytes().to_vec(),
            protocol: config.protocol.as_bytes().to_vec(),
        });

        // DCEP itself always rides reliable/ordered
        stream
            .write_sctp(&Bytes::from(open.marshal()), PayloadProtocolIdentifier::Dcep)
            .await?;

        Ok(DataChannel::new(stream, config, false))
    }

    /// accept takes the next inbound stream and performs the DCEP
    /// handshake on it, answering with DATA_CHANNEL_ACK.
    pub async fn accept(association: &Arc<Association>) -> Result<Self> {
        let Some(stream) = association.accept_stream().await else {
            return Err(Error::Sctp(sctp::Error::ErrAssociationClosed));
        };

        let mut buf = vec![0u8; 4096];
        let (n, ppid) = stream.read_sctp(&mut buf).await?;
        if ppid != PayloadProtocolIdentifier::Dcep {
            return Err(Error::UnexpectedDataChannelAck);
        }
        let Message::DataChannelOpen(open) = Message::unmarshal(&buf[..n])? else {
            return Err(Error::UnexpectedDataChannelAck);
        };

        let config = Config {
            channel_type: open.channel_type,
            negotiated: false,
            priority: open.priority,
            reliability_parameter: open.reliability_parameter,
            label: String::from_utf8_lossy(&open.label).into_owned(),
            protocol: String::from_utf8_lossy(&open.protocol).into_owned(),
        };
        apply_reliability(&stream, &config);

        let ack = Message::DataChannelAck(DataChannelAck);
        stream
            .write_sctp(&Bytes::from(ack.marshal()), PayloadProtocolIdentifier::Dcep)
            .await?;

        Ok(DataChannel::new(stream, config, true))
    }

    /// read_data_channel reads the next application message, skipping
    /// control traffic. Returns (len, is_string).
    pub async fn read_data_channel(&self, buf: &mut [u8]) -> Result<(usize, bool)> {
        loop {
            let (n, ppid) = self.stream.read_sctp(buf).await?;
            match ppid {
                PayloadProtocolIdentifier::Dcep => {
                    match Message::unmarshal(&buf[..n]) {
                        Ok(Message::DataChannelAck(_)) => {
                            self.opened.store(true, Ordering::SeqCst);
                            self.open_notify.notify_waiters();
                        }
                        Ok(Message::DataChannelOpen(_)) => {
                            // duplicate open (peer retransmit): re-ack
                            let ack = Message::DataChannelAck(DataChannelAck);
                            let _ = self
                                .stream
                                .write_sctp(
                                    &Bytes::from(ack.marshal()),
                                    PayloadProtocolIdentifier::Dcep,
                                )
                                .await;
                        }
                        Err(err) => log::warn!("malformed DCEP message: {err}"),
                    }
                    continue;
                }
                PayloadProtocolIdentifier::String => {
                    self.messages_received.fetch_add(1, Ordering::SeqCst);
                    return Ok((n, true));
                }
                PayloadProtocolIdentifier::Binary => {
                    self.messages_received.fetch_add(1, Ordering::SeqCst);
                    return Ok((n, false));
                }
                PayloadProtocolIdentifier::StringEmpty => {
                    self.messages_received.fetch_add(1, Ordering::SeqCst);
                    return Ok((0, true));
                }
                PayloadProtocolIdentifier::BinaryEmpty => {
                    self.messages_received.fetch_add(1, Ordering::SeqCst);
                    return Ok((0, false));
                }
                PayloadProtocolIdentifier::Unknown => {
                    log::warn!("dropping message with unknown PPID");
                    continue;
                }
            }
        }
    }

    /// write_data_channel sends one message. Empty messages use the
    /// dedicated empty PPIDs with a single placeholder byte (RFC 8831
    /// Section 6.6).
    pub async fn write_data_channel(&self, data: &Bytes, is_string: bool) -> Result<usize> {
        self.messages_sent.fetch_add(1, Ordering::SeqCst);

        let ppid = match (is_string, data.is_empty()) {
            (true, false) => PayloadProtocolIdentifier::String,
            (true, true) => PayloadProtocolIdentifier::StringEmpty,
            (false, false) => PayloadProtocolIdentifier::Binary,
            (false, true) => PayloadProtocolIdentifier::BinaryEmpty,
        };

        if data.is_empty() {
            self.stream
                .write_sctp(&Bytes::from_static(&[0]), ppid)
                .await?;
            Ok(0)
        } else {
            Ok(self.stream.write_sctp(data, ppid).await?)
        }
    }

    /// wait_open resolves once the remote side acknowledged the channel.
    pub async fn wait_open(&self) {
        while !self.opened.load(Ordering::SeqCst) {
            self.open_notify.notified().await;
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn stream_identifier(&self) -> u16 {
        self.stream.stream_identifier()
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn protocol(&self) -> &str {
        &self.config.protocol
    }

    pub fn buffered_amount(&self) -> usize {
        self.stream.buffered_amount()
    }

    pub fn set_buffered_amount_low_threshold(&self, th: usize) {
        self.stream.set_buffered_amount_low_threshold(th);
    }

    pub fn on_buffered_amount_low(&self, f: OnBufferedAmountLowFn) {
        self.stream.on_buffered_amount_low(f);
    }

    pub fn messages_sent(&self) -> usize {
        self.messages_sent.load(Ordering::SeqCst)
    }

    pub fn messages_received(&self) -> usize {
        self.messages_received.load(Ordering::SeqCst)
    }

    /// close signals closure via SCTP stream reset.
    pub async fn close(&self) -> Result<()> {
        Ok(self.stream.close().await?)
    }
}

fn apply_reliability(stream: &Arc<Stream>, config: &Config) {
    let (rel_type, rel_val) = match config.channel_type {
        ChannelType::Reliable | ChannelType::ReliableUnordered => (ReliabilityType::Reliable, 0),
        ChannelType::PartialReliableRexmit | ChannelType::PartialReliableRexmitUnordered => {
            (ReliabilityType::Rexmit, config.reliability_parameter)
        }
        ChannelType::PartialReliableTimed | ChannelType::PartialReliableTimedUnordered => {
            (ReliabilityType::Timed, config.reliability_parameter)
        }
    };
    stream.set_reliability_params(config.channel_type.is_unordered(), rel_type, rel_val);
}
