use bytes::{Bytes, BytesMut};
use util::marshal::Marshal;

use super::*;
use crate::protection_profile::ProtectionProfile;

fn build_rtp(ssrc: u32, seq: u16, payload: &[u8]) -> Bytes {
    let pkt = rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            payload_type: 96,
            sequence_number: seq,
            timestamp: 3653407706,
            ssrc,
            ..Default::default()
        },
        payload: Bytes::copy_from_slice(payload),
    };
    pkt.marshal().unwrap()
}

fn new_pair(profile: ProtectionProfile) -> (Context, Context) {
    let master_key = vec![
        0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, 0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE,
        0x41, 0x39,
    ];
    let master_salt = match profile {
        ProtectionProfile::Aes128CmHmacSha1_80 => vec![
            0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, 0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
        ],
        ProtectionProfile::AeadAes128Gcm => vec![
            0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, 0xEB, 0xB6, 0x96, 0x0B, 0x3A,
        ],
    };

    let send = Context::new(&master_key, &master_salt, profile, None, None).unwrap();
    let recv = Context::new(&master_key, &master_salt, profile, None, None).unwrap();
    (send, recv)
}

#[test]
fn test_rtp_round_trip_hmac_sha1() -> Result<()> {
    let (mut send, mut recv) = new_pair(ProtectionProfile::Aes128CmHmacSha1_80);
    let plaintext = build_rtp(0xcafebabe, 5000, b"hello srtp");

    let protected = send.encrypt_rtp(&plaintext)?;
    assert_ne!(protected, plaintext);
    assert_eq!(plaintext.len() + 10, protected.len());

    let decrypted = recv.decrypt_rtp(&protected)?;
    assert_eq!(decrypted, plaintext);
    Ok(())
}

#[test]
fn test_rtp_round_trip_aes_gcm() -> Result<()> {
    let (mut send, mut recv) = new_pair(ProtectionProfile::AeadAes128Gcm);
    let plaintext = build_rtp(0xcafebabe, 5000, b"hello srtp");

    let protected = send.encrypt_rtp(&plaintext)?;
    assert_eq!(plaintext.len() + 16, protected.len());

    let decrypted = recv.decrypt_rtp(&protected)?;
    assert_eq!(decrypted, plaintext);
    Ok(())
}

#[test]
fn test_rtp_replay_is_rejected() -> Result<()> {
    let (mut send, mut recv) = new_pair(ProtectionProfile::Aes128CmHmacSha1_80);
    let plaintext = build_rtp(1, 100, b"payload");

    let protected = send.encrypt_rtp(&plaintext)?;
    recv.decrypt_rtp(&protected)?;

    let result = recv.decrypt_rtp(&protected);
    assert_eq!(result, Err(Error::ErrSrtpSsrcDuplicated(1, 100)));
    Ok(())
}

#[test]
fn test_rtp_failed_auth_does_not_advance_window() -> Result<()> {
    let (mut send, mut recv) = new_pair(ProtectionProfile::Aes128CmHmacSha1_80);
    let plaintext = build_rtp(1, 100, b"payload");
    let protected = send.encrypt_rtp(&plaintext)?;

    // corrupt the auth tag
    let mut tampered = BytesMut::from(&protected[..]);
    let last = tampered.len() - 1;
    tampered[last] ^= 0xff;
    assert_eq!(
        recv.decrypt_rtp(&tampered),
        Err(Error::ErrFailedToVerifyAuthTag)
    );

    // the untampered packet must still decrypt: the forged packet did
    // not move the replay window
    let decrypted = recv.decrypt_rtp(&protected)?;
    assert_eq!(decrypted, plaintext);
    Ok(())
}

#[test]
fn test_rtp_roc_increments_on_wraparound() -> Result<()> {
    let (mut send, mut recv) = new_pair(ProtectionProfile::Aes128CmHmacSha1_80);

    let p1 = build_rtp(7, 65535, b"one");
    let p2 = build_rtp(7, 0, b"two");

    let e1 = send.encrypt_rtp(&p1)?;
    let e2 = send.encrypt_rtp(&p2)?;
    assert_eq!(send.roc(7), Some(1));

    assert_eq!(recv.decrypt_rtp(&e1)?, p1);
    assert_eq!(recv.decrypt_rtp(&e2)?, p2);
    assert_eq!(recv.roc(7), Some(1));
    Ok(())
}

#[test]
fn test_rtcp_round_trip() -> Result<()> {
    for profile in [
        ProtectionProfile::Aes128CmHmacSha1_80,
        ProtectionProfile::AeadAes128Gcm,
    ] {
        let (mut send, mut recv) = new_pair(profile);

        let pli = rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication {
            sender_ssrc: 0x902f9e2e,
            media_ssrc: 0x4bc4fcb4,
        };
        let plaintext = pli.marshal().unwrap();

        let protected = send.encrypt_rtcp(&plaintext)?;
        let decrypted = recv.decrypt_rtcp(&protected)?;
        assert_eq!(decrypted, plaintext);

        // replaying the packet must fail
        assert!(recv.decrypt_rtcp(&protected).is_err());
    }
    Ok(())
}

#[test]
fn test_context_rejects_short_keys() {
    let result = Context::new(
        &[0u8; 8],
        &[0u8; 14],
        ProtectionProfile::Aes128CmHmacSha1_80,
        None,
        None,
    );
    assert!(result.is_err());
}
