use bytes::{Buf, Bytes};

/// A Buf that remembers its initial size, so codecs can compute
/// how many bytes a nested unmarshal consumed.
pub struct ExactSizeBuf {
    buf: Bytes,
    initial: usize,
}

impl ExactSizeBuf {
    pub fn new(buf: Bytes) -> Self {
        let initial = buf.len();
        ExactSizeBuf { buf, initial }
    }

    pub fn consumed(&self) -> usize {
        self.initial - self.buf.len()
    }
}

impl Buf for ExactSizeBuf {
    fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn chunk(&self) -> &[u8] {
        self.buf.chunk()
    }

    fn advance(&mut self, cnt: usize) {
        self.buf.advance(cnt);
    }
}
