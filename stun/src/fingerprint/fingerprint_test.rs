use crate::textattrs::TextAttribute;

use super::*;

#[test]
fn fingerprint_uses_crc_32_of_input() {
    // CRC-32/ISO-HDLC("123456789") is 0xcbf43926; FINGERPRINT XORs in
    // 0x5354554e on top.
    assert_eq!(fingerprint_value(b"123456789"), 0xcbf43926 ^ 0x5354554e);
}

#[test]
fn test_fingerprint_check() -> Result<()> {
    let mut m = Message::new();
    let a = TextAttribute {
        attr: crate::attributes::ATTR_SOFTWARE,
        text: "software".to_owned(),
    };
    a.add_to(&mut m)?;
    m.write_header();

    FINGERPRINT.add_to(&mut m)?;
    m.write_header();

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    FINGERPRINT.check(&decoded)?;

    // corrupting the message breaks the fingerprint
    decoded.raw[3] += 1;
    let result = FINGERPRINT.check(&decoded);
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_fingerprint_check_missing() {
    let mut m = Message::new();
    m.write_header();
    let result = FINGERPRINT.check(&m);
    assert_eq!(result, Err(Error::ErrAttributeNotFound));
}
