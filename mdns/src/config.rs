use std::net::IpAddr;
use std::time::Duration;

/// Config is used to configure a mDNS endpoint.
#[derive(Default, Debug, Clone)]
pub struct Config {
    /// query_interval controls how often a repeated query is re-sent while
    /// unanswered. Defaults to 1s.
    pub query_interval: Duration,

    /// local_names are the names this endpoint answers A queries for.
    pub local_names: Vec<String>,

    /// local_address is the address written into answers for local_names.
    /// Required when local_names is non-empty.
    pub local_address: Option<IpAddr>,
}
