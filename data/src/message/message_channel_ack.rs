/// DATA_CHANNEL_ACK is a single type byte acknowledging a
/// DATA_CHANNEL_OPEN (RFC 8832 Section 5.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataChannelAck;
