use std::net::IpAddr;

use super::*;

#[test]
fn test_xor_safe() {
    let mut dst = vec![0; 8];
    let a = vec![1, 2, 3, 4, 5, 6, 7, 8];
    let b = vec![8, 7, 7, 6, 6, 3, 4, 1];
    safe_xor_bytes(&mut dst, &a, &b);
    let c = dst.clone();
    safe_xor_bytes(&mut dst, &c, &a);
    for i in 0..dst.len() {
        assert_eq!(b[i], dst[i], "{} != {}", b[i], dst[i]);
    }
}

#[test]
fn test_xor_mapped_address_round_trip() -> Result<()> {
    let mut m = Message::new();
    m.new_transaction_id()?;

    let addr = XorMappedAddress {
        ip: "122.12.34.5".parse::<IpAddr>().unwrap(),
        port: 5412,
    };
    addr.add_to(&mut m)?;
    m.write_header();

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    let mut got = XorMappedAddress::default();
    got.get_from(&decoded)?;
    assert_eq!(got, addr);
    Ok(())
}

#[test]
fn test_xor_mapped_address_golden() -> Result<()> {
    // Vector from RFC 5769 Section 2.2: address 192.0.2.1, port 32853.
    let mut m = Message::new();
    m.transaction_id.0.copy_from_slice(&[
        0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6, 0x86, 0xfa, 0x87, 0xdf, 0xae,
    ]);
    let addr_value = [0x00u8, 0x01, 0xa1, 0x47, 0xe1, 0x12, 0xa6, 0x43];
    m.add(ATTR_XORMAPPED_ADDRESS, &addr_value);

    let mut addr = XorMappedAddress::default();
    addr.get_from(&m)?;
    assert_eq!(addr.ip, "192.0.2.1".parse::<IpAddr>().unwrap());
    assert_eq!(addr.port, 32853);
    Ok(())
}
