/// MulticastDnsMode determines if and how the agent uses mDNS
/// (RFC 8828).
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum MulticastDnsMode {
    /// Remote mDNS candidates are resolved; host candidates keep their
    /// literal addresses.
    QueryOnly,
    /// Remote mDNS candidates are resolved and host candidates are
    /// obfuscated behind a random `<uuid>.local` name.
    QueryAndGather,
    /// mDNS is not used at all; remote `.local` candidates are dropped.
    Disabled,
}

impl Default for MulticastDnsMode {
    fn default() -> Self {
        MulticastDnsMode::QueryOnly
    }
}

/// generate_multicast_dns_name returns the random obfuscation hostname
/// for this agent.
pub fn generate_multicast_dns_name() -> String {
    format!("{}.local", uuid::Uuid::new_v4())
}
