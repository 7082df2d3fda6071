use super::*;
use crate::textattrs::TextAttribute;

#[test]
fn test_message_integrity_add_get() -> Result<()> {
    let integrity = MessageIntegrity::new_short_term_integrity("password");

    let mut m = Message::new();
    m.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(TextAttribute::new(ATTR_SOFTWARE, "test".to_owned())),
        Box::new(integrity.clone()),
    ])?;

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    integrity.check(&mut decoded)?;
    Ok(())
}

#[test]
fn test_message_integrity_tampered_value() -> Result<()> {
    let integrity = MessageIntegrity::new_short_term_integrity("password");

    let mut m = Message::new();
    m.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(integrity.clone()),
    ])?;

    // flip a bit inside the HMAC value
    let last = m.raw.len() - 1;
    m.raw[last] ^= 0x01;
    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    assert_eq!(integrity.check(&mut decoded), Err(Error::ErrIntegrityMismatch));
    Ok(())
}

#[test]
fn test_long_term_credentials_key() {
    // RFC 5389 Section 15.4: key = MD5(username ":" realm ":" password)
    let i = MessageIntegrity::new_long_term_integrity("user", "realm", "pass");
    assert_eq!(i.0.len(), 16);
    // MD5("user:realm:pass") = 8493fbc53ba582fb4c044c456bdc40eb
    assert_eq!(
        i.0,
        vec![
            0x84, 0x93, 0xfb, 0xc5, 0x3b, 0xa5, 0x82, 0xfb, 0x4c, 0x04, 0x4c, 0x45, 0x6b, 0xdc,
            0x40, 0xeb
        ]
    );
}
