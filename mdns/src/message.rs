#[cfg(test)]
mod message_test;

use std::net::Ipv4Addr;

use crate::error::*;

/// DNS resource type A (host address).
pub const TYPE_A: u16 = 1;
/// DNS class IN. mDNS reuses the top bit for cache-flush/unicast-response.
pub const CLASS_IN: u16 = 1;
pub const CLASS_MASK: u16 = 0x7fff;

pub const HEADER_SIZE: usize = 12;
const MAX_COMPRESSION_POINTERS: usize = 10;

/// Header is the wire header of a DNS message.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub authoritative: bool,
    pub questions: u16,
    pub answers: u16,
}

impl Header {
    pub fn pack(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_be_bytes());
        let mut flags = 0u16;
        if self.response {
            flags |= 0x8000;
        }
        if self.authoritative {
            flags |= 0x0400;
        }
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&self.questions.to_be_bytes());
        out.extend_from_slice(&self.answers.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // authority
        out.extend_from_slice(&0u16.to_be_bytes()); // additional
    }

    pub fn unpack(buf: &[u8]) -> Result<Header> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::ErrShortPacket);
        }
        let flags = u16::from_be_bytes([buf[2], buf[3]]);
        Ok(Header {
            id: u16::from_be_bytes([buf[0], buf[1]]),
            response: flags & 0x8000 != 0,
            authoritative: flags & 0x0400 != 0,
            questions: u16::from_be_bytes([buf[4], buf[5]]),
            answers: u16::from_be_bytes([buf[6], buf[7]]),
        })
    }
}

/// pack_name encodes a dotted name into DNS label format (no compression).
pub fn pack_name(name: &str, out: &mut Vec<u8>) -> Result<()> {
    let name = name.trim_end_matches('.');
    for label in name.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(Error::ErrInvalidName);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

/// unpack_name decodes a possibly-compressed name starting at off,
/// returning the dotted name (with trailing dot) and the offset just past
/// the name in the original buffer.
pub fn unpack_name(buf: &[u8], off: usize) -> Result<(String, usize)> {
    let mut name = String::new();
    let mut off = off;
    let mut jumped_to = None;
    let mut jumps = 0;

    loop {
        if off >= buf.len() {
            return Err(Error::ErrShortPacket);
        }
        let len = buf[off] as usize;
        if len == 0 {
            off += 1;
            break;
        }
        if len & 0xc0 == 0xc0 {
            // compression pointer
            if off + 1 >= buf.len() {
                return Err(Error::ErrShortPacket);
            }
            jumps += 1;
            if jumps > MAX_COMPRESSION_POINTERS {
                return Err(Error::ErrPointerLoop);
            }
            let ptr = ((len & 0x3f) << 8) | buf[off + 1] as usize;
            if jumped_to.is_none() {
                jumped_to = Some(off + 2);
            }
            off = ptr;
            continue;
        }
        if len & 0xc0 != 0 {
            return Err(Error::ErrInvalidName);
        }
        if off + 1 + len > buf.len() {
            return Err(Error::ErrShortPacket);
        }
        match std::str::from_utf8(&buf[off + 1..off + 1 + len]) {
            Ok(label) => {
                name.push_str(label);
                name.push('.');
            }
            Err(_) => return Err(Error::ErrInvalidName),
        }
        off += 1 + len;
    }

    Ok((name, jumped_to.unwrap_or(off)))
}

/// Question is a single DNS question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub typ: u16,
    pub class: u16,
}

impl Question {
    pub fn pack(&self, out: &mut Vec<u8>) -> Result<()> {
        pack_name(&self.name, out)?;
        out.extend_from_slice(&self.typ.to_be_bytes());
        out.extend_from_slice(&self.class.to_be_bytes());
        Ok(())
    }

    pub fn unpack(buf: &[u8], off: usize) -> Result<(Question, usize)> {
        let (name, off) = unpack_name(buf, off)?;
        if off + 4 > buf.len() {
            return Err(Error::ErrShortPacket);
        }
        Ok((
            Question {
                name,
                typ: u16::from_be_bytes([buf[off], buf[off + 1]]),
                class: u16::from_be_bytes([buf[off + 2], buf[off + 3]]),
            },
            off + 4,
        ))
    }
}

/// AResource is an A answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AResource {
    pub name: String,
    pub ttl: u32,
    pub addr: Ipv4Addr,
}

impl AResource {
    pub fn pack(&self, out: &mut Vec<u8>) -> Result<()> {
        pack_name(&self.name, out)?;
        out.extend_from_slice(&TYPE_A.to_be_bytes());
        // set the cache-flush bit as responders do for unique names
        out.extend_from_slice(&(CLASS_IN | 0x8000).to_be_bytes());
        out.extend_from_slice(&self.ttl.to_be_bytes());
        out.extend_from_slice(&4u16.to_be_bytes());
        out.extend_from_slice(&self.addr.octets());
        Ok(())
    }

    pub fn unpack(buf: &[u8], off: usize) -> Result<(Option<AResource>, usize)> {
        let (name, off) = unpack_name(buf, off)?;
        if off + 10 > buf.len() {
            return Err(Error::ErrShortPacket);
        }
        let typ = u16::from_be_bytes([buf[off], buf[off + 1]]);
        let ttl = u32::from_be_bytes([buf[off + 4], buf[off + 5], buf[off + 6], buf[off + 7]]);
        let rdlength = u16::from_be_bytes([buf[off + 8], buf[off + 9]]) as usize;
        let rdata_off = off + 10;
        if rdata_off + rdlength > buf.len() {
            return Err(Error::ErrShortPacket);
        }
        let next = rdata_off + rdlength;

        if typ != TYPE_A || rdlength != 4 {
            // skip non-A records
            return Ok((None, next));
        }
        let addr = Ipv4Addr::new(
            buf[rdata_off],
            buf[rdata_off + 1],
            buf[rdata_off + 2],
            buf[rdata_off + 3],
        );
        Ok((Some(AResource { name, ttl, addr }), next))
    }
}
