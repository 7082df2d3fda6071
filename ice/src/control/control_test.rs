use stun::message::{Message, TransactionId, BINDING_REQUEST};

use super::*;

#[test]
fn test_controlling_round_trip() -> Result<(), stun::Error> {
    let mut m = Message::new();
    m.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(AttrControlling(0x932f_f9b1_5126_3b36)),
    ])?;

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    let mut c = AttrControlling::default();
    c.get_from(&decoded)?;
    assert_eq!(c.0, 0x932f_f9b1_5126_3b36);
    Ok(())
}

#[test]
fn test_controlled_round_trip() -> Result<(), stun::Error> {
    let mut m = Message::new();
    m.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(AttrControlled(u64::MAX)),
    ])?;

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    let mut c = AttrControlled::default();
    c.get_from(&decoded)?;
    assert_eq!(c.0, u64::MAX, "tie breakers are full unsigned 64-bit values");
    Ok(())
}
