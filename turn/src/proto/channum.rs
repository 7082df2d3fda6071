use std::fmt;

use stun::attributes::ATTR_CHANNEL_NUMBER;
use stun::checks::*;
use stun::message::*;

/// MIN_CHANNEL_NUMBER is the minimum allowed channel number (0x4000).
pub const MIN_CHANNEL_NUMBER: u16 = 0x4000;
/// MAX_CHANNEL_NUMBER is the maximum allowed channel number (0x7fff).
pub const MAX_CHANNEL_NUMBER: u16 = 0x7fff;

const CHANNEL_NUMBER_SIZE: usize = 4;

/// ChannelNumber represents CHANNEL-NUMBER attribute.
///
/// The CHANNEL-NUMBER attribute contains the number of the channel.
///
/// RFC 5766 Section 14.1
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct ChannelNumber(pub u16);

impl fmt::Display for ChannelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Setter for ChannelNumber {
    /// add_to adds CHANNEL-NUMBER to message.
    fn add_to(&self, m: &mut Message) -> Result<(), stun::Error> {
        let mut v = vec![0; CHANNEL_NUMBER_SIZE];
        v[..2].copy_from_slice(&self.0.to_be_bytes());
        // v[2:4] are zeroes (RFFU = Reserved For Future Use)
        m.add(ATTR_CHANNEL_NUMBER, &v);
        Ok(())
    }
}

impl Getter for ChannelNumber {
    /// get_from decodes CHANNEL-NUMBER from message.
    fn get_from(&mut self, m: &Message) -> Result<(), stun::Error> {
        let v = m.get(ATTR_CHANNEL_NUMBER)?;

        check_size(ATTR_CHANNEL_NUMBER, v.len(), CHANNEL_NUMBER_SIZE)?;

        self.0 = u16::from_be_bytes([v[0], v[1]]);
        // v[2:4] is RFFU and equals to 0.
        Ok(())
    }
}

impl ChannelNumber {
    /// valid returns true if the channel number is in the allowed range.
    pub fn valid(&self) -> bool {
        self.0 >= MIN_CHANNEL_NUMBER && self.0 <= MAX_CHANNEL_NUMBER
    }

    /// next_channel_number returns the channel number that follows this
    /// one, wrapping back to the minimum.
    pub fn next(&self) -> ChannelNumber {
        if self.0 >= MAX_CHANNEL_NUMBER {
            ChannelNumber(MIN_CHANNEL_NUMBER)
        } else {
            ChannelNumber(self.0 + 1)
        }
    }
}
