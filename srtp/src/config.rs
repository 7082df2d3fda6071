use crate::protection_profile::ProtectionProfile;

/// SessionKeys bundles the keying material for one direction, as carved
/// out of the DTLS exported key block.
#[derive(Default, Debug, Clone)]
pub struct SessionKeys {
    pub local_master_key: Vec<u8>,
    pub local_master_salt: Vec<u8>,
    pub remote_master_key: Vec<u8>,
    pub remote_master_salt: Vec<u8>,
}

/// Config is used to configure a session's encryption contexts.
#[derive(Default, Debug, Clone)]
pub struct Config {
    pub keys: SessionKeys,
    pub profile: ProtectionProfile,
    /// SRTP anti-replay window size; 64 when zero.
    pub srtp_replay_window: u64,
    /// SRTCP anti-replay window size; 64 when zero.
    pub srtcp_replay_window: u64,
}

/// extract_session_keys splits the RFC 5764 exporter output
/// (client key | server key | client salt | server salt) into the two
/// directions.
pub fn extract_session_keys(
    material: &[u8],
    profile: ProtectionProfile,
    is_client: bool,
) -> Option<SessionKeys> {
    let key_len = profile.key_len();
    let salt_len = profile.salt_len();
    if material.len() < 2 * (key_len + salt_len) {
        return None;
    }

    let mut offset = 0;
    let client_key = material[offset..offset + key_len].to_vec();
    offset += key_len;
    let server_key = material[offset..offset + key_len].to_vec();
    offset += key_len;
    let client_salt = material[offset..offset + salt_len].to_vec();
    offset += salt_len;
    let server_salt = material[offset..offset + salt_len].to_vec();

    Some(if is_client {
        SessionKeys {
            local_master_key: client_key,
            local_master_salt: client_salt,
            remote_master_key: server_key,
            remote_master_salt: server_salt,
        }
    } else {
        SessionKeys {
            local_master_key: server_key,
            local_master_salt: server_salt,
            remote_master_key: client_key,
            remote_master_salt: client_salt,
        }
    })
}
