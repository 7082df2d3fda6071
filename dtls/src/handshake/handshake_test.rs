use super::*;
use crate::cipher_suite::default_cipher_suites;
use crate::crypto::signature_hash_algorithm::*;
use crate::curve::named_curve::{default_named_curves, NamedCurve};
use crate::extension::extension_supported_elliptic_curves::ExtensionSupportedEllipticCurves;
use crate::extension::extension_use_srtp::{ExtensionUseSrtp, SrtpProtectionProfile};
use crate::extension::Extension;
use crate::handshake::handshake_message_client_hello::HandshakeMessageClientHello;
use crate::handshake::handshake_message_server_key_exchange::HandshakeMessageServerKeyExchange;
use crate::handshake::handshake_random::HandshakeRandom;

#[test]
fn test_client_hello_round_trip() -> Result<()> {
    let hello = HandshakeMessageClientHello {
        random: HandshakeRandom::generate(),
        cookie: vec![0xaa; 20],
        cipher_suites: default_cipher_suites(),
        extensions: vec![
            Extension::SupportedEllipticCurves(ExtensionSupportedEllipticCurves {
                elliptic_curves: default_named_curves(),
            }),
            Extension::UseSrtp(ExtensionUseSrtp {
                protection_profiles: vec![
                    SrtpProtectionProfile::Srtp_Aead_Aes_128_Gcm,
                    SrtpProtectionProfile::Srtp_Aes128_Cm_Hmac_Sha1_80,
                ],
            }),
        ],
        ..Default::default()
    };

    let raw = hello.marshal()?;
    let decoded = HandshakeMessageClientHello::unmarshal(&raw)?;
    assert_eq!(decoded.cookie, hello.cookie);
    assert_eq!(decoded.cipher_suites, hello.cipher_suites);
    assert_eq!(decoded.extensions, hello.extensions);
    Ok(())
}

#[test]
fn test_server_key_exchange_round_trip() -> Result<()> {
    let ske = HandshakeMessageServerKeyExchange {
        named_curve: NamedCurve::X25519,
        public_key: vec![0x42; 32],
        algorithm: SignatureHashAlgorithm {
            hash: HashAlgorithm::Sha256,
            signature: SignatureAlgorithm::Ecdsa,
        },
        signature: vec![0x11; 70],
    };
    let raw = ske.marshal()?;
    let decoded = HandshakeMessageServerKeyExchange::unmarshal(&raw)?;
    assert_eq!(decoded, ske);
    Ok(())
}

#[test]
fn test_handshake_full_message_round_trip() -> Result<()> {
    let finished = HandshakeMessage::Finished(
        handshake_message_finished::HandshakeMessageFinished {
            verify_data: vec![0u8; 12],
        },
    );
    let handshake = Handshake::new(finished.clone(), 5)?;
    let raw = handshake.marshal()?;

    let header = handshake_header::HandshakeHeader::unmarshal(&raw)?;
    assert_eq!(header.handshake_type, HandshakeType::Finished);
    assert_eq!(header.message_sequence, 5);
    assert_eq!(header.length, 12);
    assert_eq!(header.fragment_length, 12);

    let body = &raw[handshake_header::HANDSHAKE_HEADER_LENGTH..];
    let decoded = HandshakeMessage::unmarshal(HandshakeType::Finished, body)?;
    assert_eq!(decoded, finished);
    Ok(())
}

#[test]
fn test_handshake_type_mapping() {
    assert_eq!(HandshakeType::from(1), HandshakeType::ClientHello);
    assert_eq!(HandshakeType::from(3), HandshakeType::HelloVerifyRequest);
    assert_eq!(HandshakeType::from(20), HandshakeType::Finished);
    assert_eq!(HandshakeType::from(99), HandshakeType::Invalid);
}
