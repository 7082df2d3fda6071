use super::*;
use crate::fingerprint::FINGERPRINT;
use crate::integrity::MessageIntegrity;
use crate::textattrs::TextAttribute;
use crate::xoraddr::XorMappedAddress;

/// RFC 5769 Section 2.1, a sample STUN Binding request.
const SAMPLE_REQUEST: [u8; 108] = [
    0x00, 0x01, 0x00, 0x58, // Request type and message length
    0x21, 0x12, 0xa4, 0x42, // Magic cookie
    0xb7, 0xe7, 0xa7, 0x01, // }
    0xbc, 0x34, 0xd6, 0x86, // } Transaction ID
    0xfa, 0x87, 0xdf, 0xae, // }
    0x80, 0x22, 0x00, 0x10, // SOFTWARE attribute header
    0x53, 0x54, 0x55, 0x4e, // }
    0x20, 0x74, 0x65, 0x73, // }
    0x74, 0x20, 0x63, 0x6c, // } User-agent...
    0x69, 0x65, 0x6e, 0x74, // } ...name
    0x00, 0x24, 0x00, 0x04, // PRIORITY attribute header
    0x6e, 0x00, 0x01, 0xff, // ICE priority value
    0x80, 0x29, 0x00, 0x08, // ICE-CONTROLLED attribute header
    0x93, 0x2f, 0xf9, 0xb1, // } Pseudo-random tie breaker...
    0x51, 0x26, 0x3b, 0x36, // } ...for ICE control
    0x00, 0x06, 0x00, 0x09, // USERNAME attribute header
    0x65, 0x76, 0x74, 0x6a, // }
    0x3a, 0x68, 0x36, 0x76, // } Username (9 bytes) and padding (3 bytes)
    0x59, 0x20, 0x20, 0x20, // }
    0x00, 0x08, 0x00, 0x14, // MESSAGE-INTEGRITY attribute header
    0x9a, 0xea, 0xa7, 0x0c, // }
    0xbf, 0xd8, 0xcb, 0x56, // }
    0x78, 0x1e, 0xf2, 0xb5, // } HMAC-SHA1 fingerprint
    0xb2, 0xd3, 0xf2, 0x49, // }
    0xc1, 0xb5, 0x71, 0xa2, // }
    0x80, 0x28, 0x00, 0x04, // FINGERPRINT attribute header
    0xe5, 0x7a, 0x3b, 0xcf, // CRC32 fingerprint
];

#[test]
fn test_message_type_value() {
    let tests = vec![
        (
            MessageType {
                method: METHOD_BINDING,
                class: CLASS_REQUEST,
            },
            0x0001,
        ),
        (
            MessageType {
                method: METHOD_BINDING,
                class: CLASS_SUCCESS_RESPONSE,
            },
            0x0101,
        ),
        (
            MessageType {
                method: METHOD_BINDING,
                class: CLASS_ERROR_RESPONSE,
            },
            0x0111,
        ),
        (
            MessageType {
                method: Method(0xb6d),
                class: MessageClass(0x3),
            },
            0x2ddd,
        ),
    ];
    for (input, output) in tests {
        assert_eq!(input.value(), output, "wrong encoding for {input}");
    }
}

#[test]
fn test_message_type_read_value() {
    let tests = vec![
        (
            0x0001,
            MessageType {
                method: METHOD_BINDING,
                class: CLASS_REQUEST,
            },
        ),
        (
            0x0101,
            MessageType {
                method: METHOD_BINDING,
                class: CLASS_SUCCESS_RESPONSE,
            },
        ),
    ];
    for (input, output) in tests {
        let mut mt = MessageType::default();
        mt.read_value(input);
        assert_eq!(mt, output, "wrong decoding for 0x{input:x}");
    }
}

#[test]
fn test_message_type_round_trip() {
    for method in [
        METHOD_BINDING,
        METHOD_ALLOCATE,
        METHOD_REFRESH,
        METHOD_SEND,
        METHOD_DATA,
        METHOD_CREATE_PERMISSION,
        METHOD_CHANNEL_BIND,
    ] {
        for class in [
            CLASS_REQUEST,
            CLASS_INDICATION,
            CLASS_SUCCESS_RESPONSE,
            CLASS_ERROR_RESPONSE,
        ] {
            let mt = MessageType { method, class };
            let mut got = MessageType::default();
            got.read_value(mt.value());
            assert_eq!(got, mt);
        }
    }
}

#[test]
fn test_message_decode_rfc5769_request() -> Result<()> {
    let mut m = Message::new();
    m.unmarshal_binary(&SAMPLE_REQUEST)?;

    assert_eq!(m.typ, BINDING_REQUEST);
    assert_eq!(
        m.transaction_id.0,
        [0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6, 0x86, 0xfa, 0x87, 0xdf, 0xae]
    );

    let software = TextAttribute::get_from_as(&m, ATTR_SOFTWARE)?;
    assert_eq!(software.text, "STUN test client");

    let username = TextAttribute::get_from_as(&m, ATTR_USERNAME)?;
    assert_eq!(username.text, "evtj:h6vY");

    let priority = m.get(ATTR_PRIORITY)?;
    assert_eq!(
        u32::from_be_bytes([priority[0], priority[1], priority[2], priority[3]]),
        0x6e0001ff
    );

    let controlled = m.get(ATTR_ICE_CONTROLLED)?;
    assert_eq!(
        u64::from_be_bytes([
            controlled[0],
            controlled[1],
            controlled[2],
            controlled[3],
            controlled[4],
            controlled[5],
            controlled[6],
            controlled[7]
        ]),
        0x932f_f9b1_5126_3b36
    );
    Ok(())
}

#[test]
fn test_message_rfc5769_integrity_and_fingerprint() -> Result<()> {
    let mut m = Message::new();
    m.unmarshal_binary(&SAMPLE_REQUEST)?;

    // the padding in the sample uses 0x20 bytes, which are part of the
    // HMAC input; verification must work straight off the raw buffer
    let integrity = MessageIntegrity::new_short_term_integrity("VOkJxbRl1RmTxUk/WvJxBt");
    integrity.check(&mut m)?;

    FINGERPRINT.check(&m)?;

    // the raw buffer survives a decode/encode cycle untouched
    let out = m.marshal_binary()?;
    assert_eq!(out, SAMPLE_REQUEST.to_vec());
    Ok(())
}

#[test]
fn test_message_rfc5769_integrity_rejects_wrong_password() -> Result<()> {
    let mut m = Message::new();
    m.unmarshal_binary(&SAMPLE_REQUEST)?;

    let integrity = MessageIntegrity::new_short_term_integrity("not-the-password");
    assert_eq!(integrity.check(&mut m), Err(Error::ErrIntegrityMismatch));
    Ok(())
}

#[test]
fn test_message_build_and_decode_round_trip() -> Result<()> {
    let mut m = Message::new();
    m.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(TextAttribute::new(ATTR_SOFTWARE, "loon".to_owned())),
        Box::new(XorMappedAddress {
            ip: "93.184.216.34".parse().unwrap(),
            port: 61000,
        }),
    ])?;

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;
    assert_eq!(decoded, m);

    let mut addr = XorMappedAddress::default();
    addr.get_from(&decoded)?;
    assert_eq!(addr.port, 61000);
    Ok(())
}

#[test]
fn test_message_integrity_then_fingerprint_ordering() -> Result<()> {
    let mut m = Message::new();
    m.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(MessageIntegrity::new_short_term_integrity("pass")),
        Box::new(FINGERPRINT),
    ])?;

    let mut decoded = Message::new();
    decoded.unmarshal_binary(&m.raw)?;

    let integrity = MessageIntegrity::new_short_term_integrity("pass");
    integrity.check(&mut decoded)?;
    FINGERPRINT.check(&decoded)?;

    // FINGERPRINT must refuse to be covered by MESSAGE-INTEGRITY
    let mut out_of_order = Message::new();
    let err = out_of_order.build(&[
        Box::new(TransactionId::new()),
        Box::new(BINDING_REQUEST),
        Box::new(FINGERPRINT),
        Box::new(MessageIntegrity::new_short_term_integrity("pass")),
    ]);
    assert_eq!(err, Err(Error::ErrFingerprintBeforeIntegrity));
    Ok(())
}

#[test]
fn test_is_message() {
    assert!(is_message(&SAMPLE_REQUEST));
    assert!(!is_message(&[0u8; 8]));
    // DTLS content types land outside the STUN first-byte range
    let mut not_stun = SAMPLE_REQUEST;
    not_stun[4] = 0;
    assert!(!is_message(&not_stun));
}
