#[cfg(test)]
mod handshake_test;

pub mod handshake_header;
pub mod handshake_message_certificate;
pub mod handshake_message_certificate_request;
pub mod handshake_message_certificate_verify;
pub mod handshake_message_client_hello;
pub mod handshake_message_client_key_exchange;
pub mod handshake_message_finished;
pub mod handshake_message_hello_verify_request;
pub mod handshake_message_server_hello;
pub mod handshake_message_server_hello_done;
pub mod handshake_message_server_key_exchange;
pub mod handshake_random;

use handshake_header::HandshakeHeader;
use handshake_message_certificate::HandshakeMessageCertificate;
use handshake_message_certificate_request::HandshakeMessageCertificateRequest;
use handshake_message_certificate_verify::HandshakeMessageCertificateVerify;
use handshake_message_client_hello::HandshakeMessageClientHello;
use handshake_message_client_key_exchange::HandshakeMessageClientKeyExchange;
use handshake_message_finished::HandshakeMessageFinished;
use handshake_message_hello_verify_request::HandshakeMessageHelloVerifyRequest;
use handshake_message_server_hello::HandshakeMessageServerHello;
use handshake_message_server_hello_done::HandshakeMessageServerHelloDone;
use handshake_message_server_key_exchange::HandshakeMessageServerKeyExchange;

use crate::error::*;

/// HandshakeType is the type of a DTLS handshake message.
///
/// https://tools.ietf.org/html/rfc4346#section-7.4
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    HelloVerifyRequest = 3,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
    Invalid = 255,
}

impl From<u8> for HandshakeType {
    fn from(val: u8) -> Self {
        match val {
            0 => HandshakeType::HelloRequest,
            1 => HandshakeType::ClientHello,
            2 => HandshakeType::ServerHello,
            3 => HandshakeType::HelloVerifyRequest,
            11 => HandshakeType::Certificate,
            12 => HandshakeType::ServerKeyExchange,
            13 => HandshakeType::CertificateRequest,
            14 => HandshakeType::ServerHelloDone,
            15 => HandshakeType::CertificateVerify,
            16 => HandshakeType::ClientKeyExchange,
            20 => HandshakeType::Finished,
            _ => HandshakeType::Invalid,
        }
    }
}

/// HandshakeMessage is the body of one handshake message.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeMessage {
    ClientHello(HandshakeMessageClientHello),
    ServerHello(HandshakeMessageServerHello),
    HelloVerifyRequest(HandshakeMessageHelloVerifyRequest),
    Certificate(HandshakeMessageCertificate),
    ServerKeyExchange(HandshakeMessageServerKeyExchange),
    CertificateRequest(HandshakeMessageCertificateRequest),
    ServerHelloDone(HandshakeMessageServerHelloDone),
    CertificateVerify(HandshakeMessageCertificateVerify),
    ClientKeyExchange(HandshakeMessageClientKeyExchange),
    Finished(HandshakeMessageFinished),
}

impl HandshakeMessage {
    pub fn handshake_type(&self) -> HandshakeType {
        match self {
            HandshakeMessage::ClientHello(_) => HandshakeType::ClientHello,
            HandshakeMessage::ServerHello(_) => HandshakeType::ServerHello,
            HandshakeMessage::HelloVerifyRequest(_) => HandshakeType::HelloVerifyRequest,
            HandshakeMessage::Certificate(_) => HandshakeType::Certificate,
            HandshakeMessage::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            HandshakeMessage::CertificateRequest(_) => HandshakeType::CertificateRequest,
            HandshakeMessage::ServerHelloDone(_) => HandshakeType::ServerHelloDone,
            HandshakeMessage::CertificateVerify(_) => HandshakeType::CertificateVerify,
            HandshakeMessage::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            HandshakeMessage::Finished(_) => HandshakeType::Finished,
        }
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        match self {
            HandshakeMessage::ClientHello(m) => m.marshal(),
            HandshakeMessage::ServerHello(m) => m.marshal(),
            HandshakeMessage::HelloVerifyRequest(m) => m.marshal(),
            HandshakeMessage::Certificate(m) => m.marshal(),
            HandshakeMessage::ServerKeyExchange(m) => m.marshal(),
            HandshakeMessage::CertificateRequest(m) => m.marshal(),
            HandshakeMessage::ServerHelloDone(m) => m.marshal(),
            HandshakeMessage::CertificateVerify(m) => m.marshal(),
            HandshakeMessage::ClientKeyExchange(m) => m.marshal(),
            HandshakeMessage::Finished(m) => m.marshal(),
        }
    }

    pub fn unmarshal(typ: HandshakeType, raw: &[u8]) -> Result<Self> {
        Ok(match typ {
            HandshakeType::ClientHello => {
                HandshakeMessage::ClientHello(HandshakeMessageClientHello::unmarshal(raw)?)
            }
            HandshakeType::ServerHello => {
                HandshakeMessage::ServerHello(HandshakeMessageServerHello::unmarshal(raw)?)
            }
            HandshakeType::HelloVerifyRequest => HandshakeMessage::HelloVerifyRequest(
                HandshakeMessageHelloVerifyRequest::unmarshal(raw)?,
            ),
            HandshakeType::Certificate => {
                HandshakeMessage::Certificate(HandshakeMessageCertificate::unmarshal(raw)?)
            }
            HandshakeType::ServerKeyExchange => HandshakeMessage::ServerKeyExchange(
                HandshakeMessageServerKeyExchange::unmarshal(raw)?,
            ),
            HandshakeType::CertificateRequest => HandshakeMessage::CertificateRequest(
                HandshakeMessageCertificateRequest::unmarshal(raw)?,
            ),
            HandshakeType::ServerHelloDone => {
                HandshakeMessage::ServerHelloDone(HandshakeMessageServerHelloDone::unmarshal(raw)?)
            }
            HandshakeType::CertificateVerify => HandshakeMessage::CertificateVerify(
                HandshakeMessageCertificateVerify::unmarshal(raw)?,
            ),
            HandshakeType::ClientKeyExchange => HandshakeMessage::ClientKeyExchange(
                HandshakeMessageClientKeyExchange::unmarshal(raw)?,
            ),
            HandshakeType::Finished => {
                HandshakeMessage::Finished(HandshakeMessageFinished::unmarshal(raw)?)
            }
            _ => return Err(Error::ErrUnhandledContextType),
        })
    }
}

/// Handshake is one complete handshake message: header plus body.
///
/// The header carries fragmentation bookkeeping; a Handshake value always
/// describes a whole (defragmented) message.
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub handshake_header: HandshakeHeader,
    pub handshake_message: HandshakeMessage,
}

impl Handshake {
    pub fn new(handshake_message: HandshakeMessage, message_sequence: u16) -> Result<Self> {
        let payload = handshake_message.marshal()?;
        Ok(Handshake {
            handshake_header: HandshakeHeader {
                handshake_type: handshake_message.handshake_type(),
                length: payload.len() as u32,
                message_sequence,
                fragment_offset: 0,
                fragment_length: payload.len() as u32,
            },
            handshake_message,
        })
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let payload = self.handshake_message.marshal()?;
        let mut out = self.handshake_header.marshal()?;
        out.extend_from_slice(&payload);
        Ok(out)
    }
}
