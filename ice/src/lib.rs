#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod agent;
pub mod candidate;
pub mod control;
pub mod error;
pub mod mdns_mode;
pub mod network_type;
pub mod priority;
pub mod rand;
pub mod state;
pub mod tcp_type;
pub mod url;
pub mod use_candidate;

pub use error::Error;
