pub mod extension_supported_elliptic_curves;
pub mod extension_supported_point_formats;
pub mod extension_supported_signature_algorithms;
pub mod extension_use_extended_master_secret;
pub mod extension_use_srtp;
pub mod renegotiation_info;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use extension_supported_elliptic_curves::*;
use extension_supported_point_formats::*;
use extension_supported_signature_algorithms::*;
use extension_use_extended_master_secret::*;
use extension_use_srtp::*;
use renegotiation_info::*;

use crate::error::*;

/// https://www.iana.org/assignments/tls-extensiontype-values/tls-extensiontype-values.xhtml
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ExtensionValue {
    SupportedEllipticCurves = 10,
    SupportedPointFormats = 11,
    SupportedSignatureAlgorithms = 13,
    UseSrtp = 14,
    UseExtendedMasterSecret = 23,
    RenegotiationInfo = 65281,
    Unsupported = 0,
}

impl From<u16> for ExtensionValue {
    fn from(val: u16) -> Self {
        match val {
            10 => ExtensionValue::SupportedEllipticCurves,
            11 => ExtensionValue::SupportedPointFormats,
            13 => ExtensionValue::SupportedSignatureAlgorithms,
            14 => ExtensionValue::UseSrtp,
            23 => ExtensionValue::UseExtendedMasterSecret,
            65281 => ExtensionValue::RenegotiationInfo,
            _ => ExtensionValue::Unsupported,
        }
    }
}

/// Extension represents a single TLS hello extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    SupportedEllipticCurves(ExtensionSupportedEllipticCurves),
    SupportedPointFormats(ExtensionSupportedPointFormats),
    SupportedSignatureAlgorithms(ExtensionSupportedSignatureAlgorithms),
    UseSrtp(ExtensionUseSrtp),
    UseExtendedMasterSecret(ExtensionUseExtendedMasterSecret),
    RenegotiationInfo(ExtensionRenegotiationInfo),
    Unknown { typ: u16, data: Vec<u8> },
}

impl Extension {
    pub fn extension_value(&self) -> u16 {
        match self {
            Extension::SupportedEllipticCurves(_) => ExtensionValue::SupportedEllipticCurves as u16,
            Extension::SupportedPointFormats(_) => ExtensionValue::SupportedPointFormats as u16,
            Extension::SupportedSignatureAlgorithms(_) => {
                ExtensionValue::SupportedSignatureAlgorithms as u16
            }
            Extension::UseSrtp(_) => ExtensionValue::UseSrtp as u16,
            Extension::UseExtendedMasterSecret(_) => ExtensionValue::UseExtendedMasterSecret as u16,
            Extension::RenegotiationInfo(_) => ExtensionValue::RenegotiationInfo as u16,
            Extension::Unknown { typ, .. } => *typ,
        }
    }

    pub fn marshal(&self, out: &mut Vec<u8>) -> Result<()> {
        let body = match self {
            Extension::SupportedEllipticCurves(e) => e.marshal()?,
            Extension::SupportedPointFormats(e) => e.marshal()?,
            Extension::SupportedSignatureAlgorithms(e) => e.marshal()?,
            Extension::UseSrtp(e) => e.marshal()?,
            Extension::UseExtendedMasterSecret(e) => e.marshal()?,
            Extension::RenegotiationInfo(e) => e.marshal()?,
            Extension::Unknown { data, .. } => data.clone(),
        };

        out.write_u16::<BigEndian>(self.extension_value())?;
        out.write_u16::<BigEndian>(body.len() as u16)?;
        out.extend_from_slice(&body);
        Ok(())
    }

    pub fn unmarshal(reader: &mut &[u8]) -> Result<Self> {
        let typ = reader.read_u16::<BigEndian>()?;
        let len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < len {
            return Err(Error::ErrBufferTooSmall);
        }
        let body = &reader[..len];
        *reader = &reader[len..];

        Ok(match ExtensionValue::from(typ) {
            ExtensionValue::SupportedEllipticCurves => Extension::SupportedEllipticCurves(
                ExtensionSupportedEllipticCurves::unmarshal(body)?,
            ),
            ExtensionValue::SupportedPointFormats => {
                Extension::SupportedPointFormats(ExtensionSupportedPointFormats::unmarshal(body)?)
            }
            ExtensionValue::SupportedSignatureAlgorithms => {
                Extension::SupportedSignatureAlgorithms(
                    ExtensionSupportedSignatureAlgorithms::unmarshal(body)?,
                )
            }
            ExtensionValue::UseSrtp => Extension::UseSrtp(ExtensionUseSrtp::unmarshal(body)?),
            ExtensionValue::UseExtendedMasterSecret => Extension::UseExtendedMasterSecret(
                ExtensionUseExtendedMasterSecret::unmarshal(body)?,
            ),
            ExtensionValue::RenegotiationInfo => {
                Extension::RenegotiationInfo(ExtensionRenegotiationInfo::unmarshal(body)?)
            }
            ExtensionValue::Unsupported => Extension::Unknown {
                typ,
                data: body.to_vec(),
            },
        })
    }
}
