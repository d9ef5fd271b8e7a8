//! The compression bridge: an optional inflate/deflate stage sitting in
//! front of the byte decoder (inbound) or behind the encoder (outbound). At
//! most one direction is active per instance at a time.
//!
//! Uses `flate2`'s buffer-in/buffer-out `Compress`/`Decompress` types rather
//! than its `Read`/`Write` wrappers: the codec never performs I/O of its
//! own, so the stream objects must be driven by hand, one fixed-size chunk
//! at a time, exactly as the original's raw zlib `z_stream` usage does.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::CodecError;

const INFLATE_CHUNK: usize = 4096;
const DEFLATE_CHUNK: usize = 1024;

/// Which direction (if any) is currently bridged through (de)compression.
enum Direction {
    Idle,
    Inflate(Box<Decompress>),
    Deflate(Box<Compress>),
}

/// Outcome of feeding a chunk through an active inflate/deflate stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TornDown {
    /// The stream is still active; no teardown occurred.
    No,
    /// The stream ended cleanly (`Status::StreamEnd`). The caller should
    /// emit `Event::Compress(false)` but not a fatal-class error.
    CleanEnd,
    /// The stream failed (`Status::BufError` is not a failure and does not
    /// reach this state). Mirrors the original's `_error(..., ECOMPRESS, 1,
    /// ...)` fatal path: the caller should emit both `Event::Error` and
    /// `Event::Compress(false)`.
    Error,
}

impl TornDown {
    #[must_use]
    pub fn is_torn_down(self) -> bool {
        !matches!(self, Self::No)
    }
}

pub struct CompressionBridge {
    direction: Direction,
}

impl Default for CompressionBridge {
    fn default() -> Self {
        Self {
            direction: Direction::Idle,
        }
    }
}

impl CompressionBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self.direction, Direction::Idle)
    }

    #[must_use]
    pub fn is_inflating(&self) -> bool {
        matches!(self.direction, Direction::Inflate(_))
    }

    #[must_use]
    pub fn is_deflating(&self) -> bool {
        matches!(self.direction, Direction::Deflate(_))
    }

    /// Install an inflate (decompression) stream. Errors if either
    /// direction is already active.
    ///
    /// # Errors
    ///
    /// `CodecError::BadValue` if compression is already initialized.
    pub fn install_inflate(&mut self) -> Result<(), CodecError> {
        if self.is_active() {
            return Err(CodecError::BadValue);
        }
        self.direction = Direction::Inflate(Box::new(Decompress::new(true)));
        Ok(())
    }

    /// Install a deflate (compression) stream. Errors if either direction is
    /// already active.
    ///
    /// # Errors
    ///
    /// `CodecError::BadValue` if compression is already initialized.
    pub fn install_deflate(&mut self) -> Result<(), CodecError> {
        if self.is_active() {
            return Err(CodecError::BadValue);
        }
        self.direction = Direction::Deflate(Box::new(Compress::new(Compression::default(), true)));
        Ok(())
    }

    /// Feed `input` through the installed inflate stream, invoking `sink`
    /// with each ≤4 KiB chunk of decompressed bytes. Returns whether (and
    /// how) the stream tore itself down; on anything but `TornDown::No` the
    /// caller must emit `Event::Compress(false)` and resume treating input
    /// as cleartext, additionally emitting `Event::Error` for
    /// `TornDown::Error`.
    ///
    /// No-op (returns `TornDown::No`) if inflate isn't the active direction.
    pub fn inflate(&mut self, input: &[u8], mut sink: impl FnMut(&[u8])) -> TornDown {
        let Direction::Inflate(z) = &mut self.direction else {
            return TornDown::No;
        };
        let mut offset = 0usize;
        let mut torn_down = TornDown::No;

        loop {
            let mut out = [0u8; INFLATE_CHUNK];
            let before_in = z.total_in();
            let before_out = z.total_out();
            let result = z.decompress(&input[offset..], &mut out, FlushDecompress::Sync);
            let consumed = (z.total_in() - before_in) as usize;
            let produced = (z.total_out() - before_out) as usize;
            offset += consumed;
            if produced > 0 {
                sink(&out[..produced]);
            }

            let status = match result {
                Ok(status) => status,
                Err(_) => {
                    torn_down = TornDown::Error;
                    break;
                }
            };
            match status {
                Status::StreamEnd => {
                    torn_down = TornDown::CleanEnd;
                    break;
                }
                Status::BufError => break,
                Status::Ok => {
                    let more_input = offset < input.len();
                    let filled_output = produced == out.len();
                    if !more_input && !filled_output {
                        break;
                    }
                }
            }
        }

        if torn_down.is_torn_down() {
            self.direction = Direction::Idle;
        }
        torn_down
    }

    /// Feed `input` through the installed deflate stream with sync-flush
    /// semantics, invoking `sink` with each ≤1 KiB chunk of compressed
    /// output. Returns whether (and how) the stream tore itself down; see
    /// `inflate`.
    ///
    /// No-op (returns `TornDown::No`) if deflate isn't the active direction.
    pub fn deflate(&mut self, input: &[u8], mut sink: impl FnMut(&[u8])) -> TornDown {
        let Direction::Deflate(z) = &mut self.direction else {
            return TornDown::No;
        };
        let mut offset = 0usize;
        let mut torn_down = TornDown::No;

        loop {
            let mut out = [0u8; DEFLATE_CHUNK];
            let before_in = z.total_in();
            let before_out = z.total_out();
            let result = z.compress(&input[offset..], &mut out, FlushCompress::Sync);
            let consumed = (z.total_in() - before_in) as usize;
            let produced = (z.total_out() - before_out) as usize;
            offset += consumed;
            if produced > 0 {
                sink(&out[..produced]);
            }

            let status = match result {
                Ok(status) => status,
                Err(_) => {
                    torn_down = TornDown::Error;
                    break;
                }
            };
            match status {
                Status::StreamEnd => {
                    torn_down = TornDown::CleanEnd;
                    break;
                }
                Status::BufError => break,
                Status::Ok => {
                    let more_input = offset < input.len();
                    let filled_output = produced == out.len();
                    if !more_input && !filled_output {
                        break;
                    }
                }
            }
        }

        if torn_down.is_torn_down() {
            self.direction = Direction::Idle;
        }
        torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_deflate_then_inflate() {
        let mut sender = CompressionBridge::new();
        sender.install_deflate().unwrap();
        let mut compressed = std::vec::Vec::new();
        sender.deflate(b"hello, world! hello, world!", |chunk| {
            compressed.extend_from_slice(chunk);
        });
        assert!(!compressed.is_empty());

        let mut receiver = CompressionBridge::new();
        receiver.install_inflate().unwrap();
        let mut decompressed = std::vec::Vec::new();
        let torn_down = receiver.inflate(&compressed, |chunk| {
            decompressed.extend_from_slice(chunk);
        });
        assert_eq!(torn_down, TornDown::No);
        assert_eq!(decompressed, b"hello, world! hello, world!");
    }

    #[test]
    fn double_initialization_is_rejected() {
        let mut bridge = CompressionBridge::new();
        bridge.install_deflate().unwrap();
        assert_eq!(bridge.install_deflate(), Err(CodecError::BadValue));
        assert_eq!(bridge.install_inflate(), Err(CodecError::BadValue));
    }

    #[test]
    fn garbage_input_tears_down_inflate() {
        let mut bridge = CompressionBridge::new();
        bridge.install_inflate().unwrap();
        let torn_down = bridge.inflate(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11], |_| {});
        assert_eq!(torn_down, TornDown::Error);
        assert!(!bridge.is_active());
    }
}
