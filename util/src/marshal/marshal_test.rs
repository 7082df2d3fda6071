use bytes::{Buf, BufMut};

use super::*;

struct Pair(u16, u16);

impl MarshalSize for Pair {
    fn marshal_size(&self) -> usize {
        4
    }
}

impl Marshal for Pair {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if buf.len() < 4 {
            return Err(Error::ErrBufferTooSmall);
        }
        buf.put_u16(self.0);
        buf.put_u16(self.1);
        Ok(4)
    }
}

impl Unmarshal for Pair {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < 4 {
            return Err(Error::ErrBufferShort);
        }
        Ok(Pair(buf.get_u16(), buf.get_u16()))
    }
}

#[test]
fn test_marshal_round_trip() -> Result<()> {
    let p = Pair(0x0102, 0x0304);
    let raw = p.marshal()?;
    assert_eq!(&raw[..], &[1u8, 2, 3, 4]);

    let mut buf = &raw[..];
    let q = Pair::unmarshal(&mut buf)?;
    assert_eq!(q.0, p.0);
    assert_eq!(q.1, p.1);
    Ok(())
}
