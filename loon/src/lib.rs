#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export sub-crates
pub use data;
pub use dtls;
pub use ice;
pub use mdns;
pub use rtcp;
pub use rtp;
pub use sctp;
pub use srtp;
pub use stun;
pub use turn;
pub use util;

pub mod configuration;
pub mod data_channel;
pub mod dtls_transport;
pub mod error;
pub mod media_config;
pub mod mux;
pub mod peer_connection;
pub mod rtp_transceiver;
pub mod sctp_transport;
pub mod sdp;

pub use error::Error;

pub(crate) const RECEIVE_MTU: usize = 8192;
pub(crate) const SIMULCAST_PROBE_COUNT: usize = 10;
