use bytes::Bytes;

use super::*;

#[test]
fn test_set_extension_rejects_bad_one_byte_ids() {
    let mut header = Header {
        version: 2,
        extension: true,
        extension_profile: EXTENSION_PROFILE_ONE_BYTE,
        ..Default::default()
    };

    assert_eq!(
        header.set_extension(15, Bytes::from_static(&[0x01])),
        Err(Error::ErrRfc8285oneByteHeaderIdrange)
    );
    assert_eq!(
        header.set_extension(0, Bytes::from_static(&[0x01])),
        Err(Error::ErrRfc8285oneByteHeaderIdrange)
    );
    assert_eq!(
        header.set_extension(1, Bytes::from(vec![0u8; 17])),
        Err(Error::ErrRfc8285oneByteHeaderSize)
    );
}

#[test]
fn test_set_extension_updates_existing() -> Result<(), Error> {
    let mut header = Header {
        version: 2,
        ..Default::default()
    };
    header.set_extension(2, Bytes::from_static(&[0x01]))?;
    header.set_extension(2, Bytes::from_static(&[0x02]))?;
    assert_eq!(header.extensions.len(), 1);
    assert_eq!(header.get_extension(2), Some(Bytes::from_static(&[0x02])));

    header.del_extension(2)?;
    assert_eq!(header.get_extension(2), None);
    assert_eq!(header.del_extension(2), Err(Error::ErrHeaderExtensionNotFound));
    Ok(())
}

#[test]
fn test_csrc_round_trip() -> Result<(), util::Error> {
    let header = Header {
        version: 2,
        payload_type: 96,
        sequence_number: 5000,
        timestamp: 10,
        ssrc: 0x1234,
        csrc: vec![0x11, 0x22, 0x33],
        ..Default::default()
    };

    let raw = header.marshal()?;
    assert_eq!(raw.len(), 12 + 3 * 4);

    let mut buf = &raw[..];
    let decoded = Header::unmarshal(&mut buf)?;
    assert_eq!(decoded, header);
    Ok(())
}
