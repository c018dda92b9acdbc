// Read-ahead buffer for socket-like channels. Serves buffered bytes first;
// on an empty buffer issues exactly one raw read to refill, then serves.
// Total-bytes-read semantics of the wrapped channel are preserved exactly.
use crate::traits::Channel;
use std::io::Result;

pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

pub struct ReadBuffer {
    buf: Vec<u8>,
    start: usize,
    end: usize,
}

impl ReadBuffer {
    pub fn new(capacity: usize) -> Self {
        ReadBuffer {
            buf: vec![0u8; capacity.max(1)],
            start: 0,
            end: 0,
        }
    }

    pub fn buffered(&self) -> usize {
        self.end - self.start
    }

    pub fn read(&mut self, channel: &mut dyn Channel, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.start == self.end {
            // One raw read per refill; 0 here is end of stream
            let n = channel.read(&mut self.buf)?;
            if n == 0 {
                return Ok(0);
            }
            self.start = 0;
            self.end = n;
        }
        let n = self.buffered().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::testing::ScriptedChannel;

    #[test]
    fn serves_small_reads_from_one_refill() {
        let mut raw = ScriptedChannel::new(&[b"abcdefgh"]);
        let mut rb = ReadBuffer::new(64);

        let mut buf = [0u8; 3];
        assert_eq!(rb.read(&mut raw, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(rb.read(&mut raw, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"def");
        assert_eq!(rb.read(&mut raw, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"gh");

        // All eight bytes came from a single raw read
        assert_eq!(raw.raw_reads, 1);
    }

    #[test]
    fn never_loses_bytes_across_refills() {
        let mut raw = ScriptedChannel::new(&[b"one", b"two", b"three"]);
        let mut rb = ReadBuffer::new(4);

        let mut collected = Vec::new();
        let mut buf = [0u8; 2];
        loop {
            let n = rb.read(&mut raw, &mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"onetwothree");
    }

    #[test]
    fn never_returns_more_than_requested() {
        let mut raw = ScriptedChannel::new(&[b"0123456789"]);
        let mut rb = ReadBuffer::new(64);

        let mut buf = [0u8; 4];
        let n = rb.read(&mut raw, &mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(rb.buffered(), 6);
    }

    #[test]
    fn end_of_stream_reports_zero() {
        let mut raw = ScriptedChannel::new(&[]);
        let mut rb = ReadBuffer::new(8);
        let mut buf = [0u8; 8];
        assert_eq!(rb.read(&mut raw, &mut buf).unwrap(), 0);
    }
}
