//! Structured subnegotiation parsers: ZMP's NUL-separated argv, and the
//! "type byte + data" family shared by TTYPE, ENVIRON, NEW-ENVIRON, and
//! MSSP.

use bytes::Bytes;

use crate::events::Subnegotiation;
use crate::telnet::op_option::{ENVIRON, MSSP, NEW_ENVIRON, TTYPE, ZMP};

/// Parse a ZMP buffer (NUL-separated argv, NUL-terminated). Returns `None`
/// if the buffer isn't NUL-terminated — the caller should fall back to a
/// generic subnegotiation event and raise a protocol warning.
fn parse_zmp(buffer: &Bytes) -> Option<Vec<Bytes>> {
    if buffer.is_empty() || *buffer.last().unwrap() != 0 {
        return None;
    }
    let mut argv = Vec::new();
    let mut start = 0usize;
    for (i, &b) in buffer.iter().enumerate() {
        if b == 0 {
            argv.push(buffer.slice(start..i));
            start = i + 1;
        }
    }
    Some(argv)
}

/// Parse a TTYPE/ENVIRON/NEW-ENVIRON/MSSP-shaped buffer: the first byte
/// must be one of `{0,1,2,3}`, and every subsequent byte in that range
/// begins a fresh argument (each argument keeps its own leading marker
/// byte). Returns `None` if the first byte
/// is out of range — the caller should fall back to a generic event and
/// raise a protocol warning. An empty buffer is not an error: callers
/// should emit a generic (empty-argv) event for it without parsing.
fn parse_type_and_data(buffer: &Bytes) -> Option<Vec<Bytes>> {
    if buffer[0] > 3 {
        return None;
    }
    let mut argv = Vec::new();
    let mut start = 0usize;
    for i in 1..buffer.len() {
        if buffer[i] <= 3 {
            argv.push(buffer.slice(start..i));
            start = i;
        }
    }
    argv.push(buffer.slice(start..));
    Some(argv)
}

/// Outcome of dispatching a completed subnegotiation buffer to its parser.
pub struct Parsed {
    pub event: Subnegotiation,
    /// Set when the buffer was malformed for its option's parser and the
    /// caller should also raise a protocol warning.
    pub warning: Option<&'static str>,
}

/// Dispatch on the captured option code. COMPRESS2 is handled by the codec
/// directly (it has side effects beyond producing an event) and is not
/// parsed here.
#[must_use]
pub fn parse(option: u8, buffer: Bytes) -> Parsed {
    match option {
        ZMP => match parse_zmp(&buffer) {
            Some(argv) => Parsed {
                event: Subnegotiation {
                    option,
                    buffer,
                    argv: Some(argv),
                },
                warning: None,
            },
            None => Parsed {
                event: Subnegotiation::generic(option, buffer),
                warning: Some("incomplete ZMP frame: missing NUL terminator"),
            },
        },
        TTYPE | ENVIRON | NEW_ENVIRON | MSSP => {
            if buffer.is_empty() {
                return Parsed {
                    event: Subnegotiation::generic(option, buffer),
                    warning: None,
                };
            }
            match parse_type_and_data(&buffer) {
                Some(argv) => Parsed {
                    event: Subnegotiation {
                        option,
                        buffer,
                        argv: Some(argv),
                    },
                    warning: None,
                },
                None => Parsed {
                    event: Subnegotiation::generic(option, buffer),
                    warning: Some("type-and-data subnegotiation has invalid leading byte"),
                },
            }
        }
        _ => Parsed {
            event: Subnegotiation::generic(option, buffer),
            warning: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zmp_splits_on_nul_and_requires_terminator() {
        let buf = Bytes::from_static(b"zmp.ping\x0042\x00");
        let parsed = parse(ZMP, buf);
        assert!(parsed.warning.is_none());
        let argv = parsed.event.argv.unwrap();
        assert_eq!(argv, vec![Bytes::from_static(b"zmp.ping"), Bytes::from_static(b"42")]);
    }

    #[test]
    fn zmp_without_terminator_falls_back_to_generic() {
        let buf = Bytes::from_static(b"zmp.ping\x0042");
        let parsed = parse(ZMP, buf.clone());
        assert!(parsed.warning.is_some());
        assert!(parsed.event.argv.is_none());
        assert_eq!(parsed.event.buffer, buf);
    }

    #[test]
    fn ttype_send_is_a_single_marker_byte_argument() {
        let buf = Bytes::from_static(&[1]);
        let parsed = parse(TTYPE, buf);
        let argv = parsed.event.argv.unwrap();
        assert_eq!(argv, vec![Bytes::from_static(&[1])]);
    }

    #[test]
    fn ttype_is_response_splits_marker_and_name() {
        let mut buf = vec![0u8];
        buf.extend_from_slice(b"ANSI");
        let parsed = parse(TTYPE, Bytes::from(buf));
        let argv = parsed.event.argv.unwrap();
        assert_eq!(argv.len(), 1);
        assert_eq!(&argv[0][..], b"\0ANSI");
    }

    #[test]
    fn environ_var_value_pairs_split_per_marker() {
        let mut buf = vec![0u8];
        buf.extend_from_slice(b"USER");
        buf.push(1);
        buf.extend_from_slice(b"bob");
        let parsed = parse(ENVIRON, Bytes::from(buf));
        let argv = parsed.event.argv.unwrap();
        assert_eq!(argv.len(), 2);
        assert_eq!(&argv[0][..], b"\0USER");
        assert_eq!(&argv[1][..], b"\x01bob");
    }

    #[test]
    fn invalid_leading_byte_falls_back_to_generic_with_warning() {
        let buf = Bytes::from_static(b"\x09garbage");
        let parsed = parse(MSSP, buf.clone());
        assert!(parsed.warning.is_some());
        assert!(parsed.event.argv.is_none());
        assert_eq!(parsed.event.buffer, buf);
    }

    #[test]
    fn empty_buffer_is_generic_without_warning() {
        let parsed = parse(TTYPE, Bytes::new());
        assert!(parsed.warning.is_none());
        assert!(parsed.event.argv.is_none());
    }

    #[test]
    fn unknown_option_is_always_generic() {
        let buf = Bytes::from_static(b"\x01\x02\x03");
        let parsed = parse(200, buf.clone());
        assert!(parsed.warning.is_none());
        assert!(parsed.event.argv.is_none());
        assert_eq!(parsed.event.buffer, buf);
    }
}
