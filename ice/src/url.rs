#[cfg(test)]
mod url_test;

use std::fmt;

use crate::error::*;

/// SchemeType indicates the type of server used.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum SchemeType {
    Stun,
    Stuns,
    Turn,
    Turns,
    Unknown,
}

impl Default for SchemeType {
    fn default() -> Self {
        SchemeType::Unknown
    }
}

impl From<&str> for SchemeType {
    fn from(raw: &str) -> Self {
        match raw {
            "stun" => SchemeType::Stun,
            "stuns" => SchemeType::Stuns,
            "turn" => SchemeType::Turn,
            "turns" => SchemeType::Turns,
            _ => SchemeType::Unknown,
        }
    }
}

impl fmt::Display for SchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemeType::Stun => "stun",
            SchemeType::Stuns => "stuns",
            SchemeType::Turn => "turn",
            SchemeType::Turns => "turns",
            SchemeType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// ProtoType indicates the transport protocol type.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ProtoType {
    Udp,
    Tcp,
    Unknown,
}

impl Default for ProtoType {
    fn default() -> Self {
        ProtoType::Udp
    }
}

impl fmt::Display for ProtoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtoType::Udp => "udp",
            ProtoType::Tcp => "tcp",
            ProtoType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Url represents a STUN (RFC 7064) or TURN (RFC 7065) URI, plus the
/// credentials the ICE configuration attached to it.
#[derive(Default, Debug, Clone)]
pub struct Url {
    pub scheme: SchemeType,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub proto: ProtoType,
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scheme, self.host, self.port)
    }
}

impl Url {
    /// parse_url parses a STUN or TURN urls following the ABNF syntax
    /// described in RFC 7064 and RFC 7065.
    pub fn parse_url(raw: &str) -> Result<Url> {
        let (scheme_str, rest) = raw
            .split_once(':')
            .ok_or(Error::ErrInvalidUrl)?;
        let scheme = SchemeType::from(scheme_str);
        if scheme == SchemeType::Unknown {
            return Err(Error::ErrSchemeType);
        }

        let (hostport, query) = match rest.split_once('?') {
            Some((hp, q)) => (hp, Some(q)),
            None => (rest, None),
        };

        let (host, port) = if let Some(stripped) = hostport.strip_prefix('[') {
            // bracketed IPv6
            let (host, rest) = stripped
                .split_once(']')
                .ok_or(Error::ErrInvalidUrl)?;
            let port = match rest.strip_prefix(':') {
                Some(p) => p.parse().map_err(|_| Error::ErrParsePort)?,
                None => default_port(scheme),
            };
            (host.to_owned(), port)
        } else {
            match hostport.split_once(':') {
                Some((host, port)) => (
                    host.to_owned(),
                    port.parse().map_err(|_| Error::ErrParsePort)?,
                ),
                None => (hostport.to_owned(), default_port(scheme)),
            }
        };
        if host.is_empty() {
            return Err(Error::ErrInvalidUrl);
        }

        let mut proto = match scheme {
            SchemeType::Stun | SchemeType::Turn => ProtoType::Udp,
            _ => ProtoType::Tcp,
        };
        if let Some(query) = query {
            if scheme != SchemeType::Turn && scheme != SchemeType::Turns {
                return Err(Error::ErrInvalidQuery);
            }
            match query.strip_prefix("transport=") {
                Some("udp") => proto = ProtoType::Udp,
                Some("tcp") => proto = ProtoType::Tcp,
                _ => return Err(Error::ErrInvalidQuery),
            }
        }

        Ok(Url {
            scheme,
            host,
            port,
            username: String::new(),
            password: String::new(),
            proto,
        })
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == SchemeType::Stuns || self.scheme == SchemeType::Turns
    }
}

fn default_port(scheme: SchemeType) -> u16 {
    match scheme {
        SchemeType::Stun | SchemeType::Turn => 3478,
        SchemeType::Stuns | SchemeType::Turns => 5349,
        SchemeType::Unknown => 0,
    }
}
