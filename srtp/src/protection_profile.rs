/// ProtectionProfile specifies the SRTP protection profile negotiated in
/// the DTLS use_srtp extension.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ProtectionProfile {
    /// AES-128 in counter mode with HMAC-SHA1 80-bit tags (RFC 5764).
    #[default]
    Aes128CmHmacSha1_80 = 0x0001,
    /// AEAD AES-128-GCM (RFC 7714).
    AeadAes128Gcm = 0x0007,
}

impl ProtectionProfile {
    pub fn key_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::AeadAes128Gcm => 16,
        }
    }

    pub fn salt_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 14,
            ProtectionProfile::AeadAes128Gcm => 12,
        }
    }

    pub fn auth_tag_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 10,
            ProtectionProfile::AeadAes128Gcm => 0,
        }
    }

    pub fn aead_auth_tag_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 0,
            ProtectionProfile::AeadAes128Gcm => 16,
        }
    }

    pub fn auth_key_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 20,
            ProtectionProfile::AeadAes128Gcm => 0,
        }
    }

    /// Total keying material per direction: key + salt.
    pub fn key_material_len(&self) -> usize {
        self.key_len() + self.salt_len()
    }
}
