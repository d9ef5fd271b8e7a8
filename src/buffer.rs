//! The append-only subnegotiation buffer.
//!
//! Capacity climbs a fixed geometric ladder and hard-caps at 16384 bytes;
//! once the last rung is full, further appends fail with `Overflow` and the
//! caller is expected to discard the in-progress subnegotiation.

use bytes::Bytes;

use crate::error::CodecError;

const RUNGS: [usize; 5] = [0, 512, 2048, 8192, 16384];

/// Growable, reusable buffer for a single in-progress subnegotiation.
///
/// Backed by `Vec<u8>` rather than `bytes::BytesMut` so that growth can go
/// through `try_reserve` and surface `CodecError::NoMemory` on allocation
/// failure instead of panicking, matching `NegotiationQueue`'s grow-only
/// queue.
#[derive(Debug, Default)]
pub struct SubnegotiationBuffer {
    inner: Vec<u8>,
    rung: usize,
}

impl SubnegotiationBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Vec::new(),
            rung: 0,
        }
    }

    /// Reset the buffer to empty. Called on every fresh `SB` byte, not on `SE`.
    pub fn reset(&mut self) {
        self.inner.clear();
        self.rung = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Append a single byte, growing along the rung ladder as needed.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Overflow` once the buffer has filled the final
    /// rung (16384 bytes) and cannot grow further, or `CodecError::NoMemory`
    /// if growing to the next rung fails to allocate.
    pub fn push(&mut self, byte: u8) -> Result<(), CodecError> {
        if self.inner.len() == RUNGS[self.rung] {
            if self.rung + 1 >= RUNGS.len() {
                return Err(CodecError::Overflow);
            }
            self.rung += 1;
            self.inner
                .try_reserve(RUNGS[self.rung] - self.inner.len())
                .map_err(|_| CodecError::NoMemory)?;
        }
        self.inner.push(byte);
        Ok(())
    }

    /// Take ownership of the buffered contents, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Bytes {
        let out = Bytes::from(std::mem::take(&mut self.inner));
        self.rung = 0;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_along_the_ladder_and_overflows_at_the_cap() {
        let mut buf = SubnegotiationBuffer::new();
        for _ in 0..RUNGS[RUNGS.len() - 1] {
            buf.push(0xAB).unwrap();
        }
        assert_eq!(buf.len(), RUNGS[RUNGS.len() - 1]);
        assert_eq!(buf.push(0xAB), Err(CodecError::Overflow));
    }

    #[test]
    fn reset_clears_length_but_not_on_se() {
        let mut buf = SubnegotiationBuffer::new();
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        assert_eq!(buf.len(), 2);
        buf.reset();
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn take_empties_and_returns_contents() {
        let mut buf = SubnegotiationBuffer::new();
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        let out = buf.take();
        assert_eq!(&out[..], &[1, 2]);
        assert_eq!(buf.len(), 0);
    }
}
