#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod buffer;
pub mod conn;
pub mod error;
pub mod marshal;
pub mod replay_detector;

pub use buffer::Buffer;
pub use conn::Conn;
pub use error::Error;
pub use marshal::{exact_size_buf::ExactSizeBuf, Marshal, MarshalSize, Unmarshal};
