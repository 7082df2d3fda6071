use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::*;

/// SRTP protection profile ids carried by use_srtp.
///
/// https://www.iana.org/assignments/srtp-protection/srtp-protection.xhtml
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SrtpProtectionProfile {
    Srtp_Aes128_Cm_Hmac_Sha1_80 = 0x0001,
    Srtp_Aead_Aes_128_Gcm = 0x0007,
    Unsupported = 0,
}

impl From<u16> for SrtpProtectionProfile {
    fn from(val: u16) -> Self {
        match val {
            0x0001 => SrtpProtectionProfile::Srtp_Aes128_Cm_Hmac_Sha1_80,
            0x0007 => SrtpProtectionProfile::Srtp_Aead_Aes_128_Gcm,
            _ => SrtpProtectionProfile::Unsupported,
        }
    }
}

/// use_srtp, the DTLS-SRTP negotiation extension.
///
/// https://tools.ietf.org/html/rfc5764#section-4.1.1
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionUseSrtp {
    pub protection_profiles: Vec<SrtpProtectionProfile>,
}

impl Default for SrtpProtectionProfile {
    fn default() -> Self {
        SrtpProtectionProfile::Unsupported
    }
}

impl ExtensionUseSrtp {
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = vec![];
        out.write_u16::<BigEndian>((self.protection_profiles.len() * 2) as u16)?;
        for profile in &self.protection_profiles {
            out.write_u16::<BigEndian>(*profile as u16)?;
        }
        // no MKI
        out.write_u8(0)?;
        Ok(out)
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let mut reader = raw;
        let list_len = reader.read_u16::<BigEndian>()? as usize;
        if reader.len() < list_len || list_len % 2 != 0 {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut protection_profiles = Vec::with_capacity(list_len / 2);
        for _ in 0..list_len / 2 {
            protection_profiles.push(SrtpProtectionProfile::from(
                reader.read_u16::<BigEndian>()?,
            ));
        }
        // trailing MKI is ignored
        Ok(ExtensionUseSrtp {
            protection_profiles,
        })
    }
}
