//! The single event surface through which the codec reports decoded
//! protocol activity and hands back bytes the caller must put on the wire.

use bytes::Bytes;

use crate::error::CodecError;
use crate::telnet::op_command::{IAC, SB, SE};

/// A parsed subnegotiation: the option it was for, the raw (unescaped)
/// payload, and — for the structured option families the codec understands —
/// the decoded argument list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subnegotiation {
    pub option: u8,
    pub buffer: Bytes,
    /// Populated for ZMP and the TTYPE/ENVIRON/NEW-ENVIRON/MSSP family.
    /// `None` for options with no structured parser (the generic case).
    pub argv: Option<Vec<Bytes>>,
}

impl Subnegotiation {
    #[must_use]
    pub fn generic(option: u8, buffer: Bytes) -> Self {
        Self {
            option,
            buffer,
            argv: None,
        }
    }

    #[must_use]
    pub fn argc(&self) -> usize {
        self.argv.as_ref().map_or(0, Vec::len)
    }
}

impl From<&Subnegotiation> for Bytes {
    fn from(sub: &Subnegotiation) -> Self {
        let escaped = crate::escape_iac(&sub.buffer[..]);
        let mut out = Vec::with_capacity(3 + escaped.len() + 2);
        out.push(IAC);
        out.push(SB);
        out.push(sub.option);
        out.extend_from_slice(&escaped);
        out.push(IAC);
        out.push(SE);
        Bytes::from(out)
    }
}

/// Every event the codec can emit through the caller-supplied sink.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Decoded application payload.
    Data(Bytes),
    /// Raw bytes the caller must write to the transport.
    Send(Bytes),
    /// A one-byte IAC command (GA, NOP, AYT, ...) that is not a
    /// negotiation or subnegotiation framing byte.
    Command(u8),
    /// Peer offered (WILL) or confirmed enabling an option.
    Will(u8),
    /// Peer refused (WONT) or disabled an option.
    Wont(u8),
    /// Peer asked us to enable (DO) an option.
    Do(u8),
    /// Peer asked us to disable (DONT) an option.
    Dont(u8),
    /// A full subnegotiation payload.
    Subnegotiation(Subnegotiation),
    /// Compression direction turned on (`true`) or off (`false`).
    Compress(bool),
    /// Non-fatal diagnostic; decoding continues.
    Warning(CodecError, String),
    /// Fatal-class diagnostic for the operation that triggered it. The
    /// codec instance itself is never torn down by this.
    Error(CodecError, String),
}
