use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use tokio::time::Instant;

/// Permissions live for 5 minutes on the server (RFC 5766 Section 8);
/// refresh them comfortably before that.
pub(crate) const PERMISSION_LIFETIME: Duration = Duration::from_secs(5 * 60);
pub(crate) const PERMISSION_REFRESH_AFTER: Duration = Duration::from_secs(4 * 60);

/// PermissionMap tracks which peer IPs currently hold an installed
/// permission and when it was installed.
#[derive(Default)]
pub(crate) struct PermissionMap {
    perms: HashMap<IpAddr, Instant>,
}

impl PermissionMap {
    pub(crate) fn new() -> Self {
        PermissionMap::default()
    }

    /// needs_install returns true when a CreatePermission request must be
    /// sent before data can flow to this peer.
    pub(crate) fn needs_install(&self, ip: &IpAddr) -> bool {
        match self.perms.get(ip) {
            Some(at) => at.elapsed() >= PERMISSION_REFRESH_AFTER,
            None => true,
        }
    }

    pub(crate) fn installed(&mut self, ip: IpAddr) {
        self.perms.insert(ip, Instant::now());
    }

    pub(crate) fn remove(&mut self, ip: &IpAddr) {
        self.perms.remove(ip);
    }
}
