use super::message_channel_open::*;
use super::*;

#[test]
fn test_channel_open_round_trip() -> Result<()> {
    let open = Message::DataChannelOpen(DataChannelOpen {
        channel_type: ChannelType::PartialReliableRexmit,
        priority: 256,
        reliability_parameter: 3,
        label: b"chat".to_vec(),
        protocol: b"proto".to_vec(),
    });

    let raw = open.marshal();
    assert_eq!(raw[0], 0x03);
    let decoded = Message::unmarshal(&raw)?;
    assert_eq!(decoded, open);
    Ok(())
}

#[test]
fn test_channel_ack_round_trip() -> Result<()> {
    let ack = Message::DataChannelAck(message_channel_ack::DataChannelAck);
    let raw = ack.marshal();
    assert_eq!(raw, vec![0x02]);
    let decoded = Message::unmarshal(&raw)?;
    assert_eq!(decoded, ack);
    Ok(())
}

#[test]
fn test_unknown_message_type_rejected() {
    let result = Message::unmarshal(&[0x07]);
    assert_eq!(result.err(), Some(Error::InvalidMessageType(0x07)));
}

#[test]
fn test_channel_type_unordered_flag() {
    assert!(ChannelType::ReliableUnordered.is_unordered());
    assert!(ChannelType::PartialReliableTimedUnordered.is_unordered());
    assert!(!ChannelType::Reliable.is_unordered());
}

#[test]
fn test_truncated_open_rejected() {
    let open = Message::DataChannelOpen(DataChannelOpen {
        channel_type: ChannelType::Reliable,
        priority: 0,
        reliability_parameter: 0,
        label: b"x".to_vec(),
        protocol: vec![],
    });
    let raw = open.marshal();
    let result = Message::unmarshal(&raw[..raw.len() - 1]);
    assert!(result.is_err());
}
