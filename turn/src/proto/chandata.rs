#[cfg(test)]
mod chandata_test;

use super::channum::*;
use crate::error::*;

pub(crate) const PADDING: usize = 4;
pub(crate) const CHANNEL_DATA_LENGTH_SIZE: usize = 2;
pub(crate) const CHANNEL_DATA_NUMBER_SIZE: usize = 2;
pub(crate) const CHANNEL_DATA_HEADER_SIZE: usize = CHANNEL_DATA_LENGTH_SIZE + CHANNEL_DATA_NUMBER_SIZE;

/// ChannelData represents the ChannelData Message defined in RFC 5766
/// Section 11.4: a 4-byte header carrying the channel number and length,
/// followed by the application data.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ChannelData {
    pub data: Vec<u8>,
    pub number: ChannelNumber,
    pub raw: Vec<u8>,
}

impl ChannelData {
    /// reset resets Length, Data and Raw length.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.data.clear();
    }

    /// encode encodes ChannelData Message to raw.
    pub fn encode(&mut self) {
        self.raw.clear();

        self.raw
            .extend_from_slice(&self.number.0.to_be_bytes());
        self.raw
            .extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        self.raw.extend_from_slice(&self.data);

        let padded = nearest_padded_value_length(self.raw.len());
        let bytes_to_add = padded - self.raw.len();
        if bytes_to_add > 0 {
            self.raw.extend_from_slice(&vec![0; bytes_to_add]);
        }
    }

    /// decode decodes raw to ChannelData.
    pub fn decode(&mut self) -> Result<()> {
        let buf = &self.raw;
        if buf.len() < CHANNEL_DATA_HEADER_SIZE {
            return Err(Error::ErrUnexpectedEof);
        }

        let num = ChannelNumber(u16::from_be_bytes([buf[0], buf[1]]));
        if !num.valid() {
            return Err(Error::ErrInvalidChannelNumber);
        }
        self.number = num;

        let l = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        if l > buf[CHANNEL_DATA_HEADER_SIZE..].len() {
            return Err(Error::ErrBadChannelDataLength);
        }
        self.data = buf[CHANNEL_DATA_HEADER_SIZE..CHANNEL_DATA_HEADER_SIZE + l].to_vec();
        Ok(())
    }
}

pub(crate) fn nearest_padded_value_length(l: usize) -> usize {
    let mut n = PADDING * (l / PADDING);
    if n < l {
        n += PADDING;
    }
    n
}

/// is_channel_data returns true if buf looks like the ChannelData Message.
pub fn is_channel_data(buf: &[u8]) -> bool {
    if buf.len() < CHANNEL_DATA_HEADER_SIZE {
        return false;
    }

    let num = ChannelNumber(u16::from_be_bytes([buf[0], buf[1]]));
    num.valid()
}
