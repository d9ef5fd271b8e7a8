//! A pure, event-driven codec for the TELNET application-layer protocol.
//!
//! [`Codec`] turns a bidirectional byte stream into semantically meaningful
//! [`Event`]s (application payload, option negotiation, subnegotiation
//! payloads, terminal commands) and, symmetrically, serializes caller
//! intents back into a well-formed TELNET byte stream — including correct
//! IAC escaping, RFC 1143 ("Q method") option negotiation, and an optional
//! COMPRESS2 (MCCP2) compressed substream.
//!
//! The codec performs no I/O of its own: it is fed bytes already read from
//! a transport and hands back bytes (as [`Event::Send`]) for the caller to
//! write. An instance is owned by a single caller and is not `Sync`.

pub mod buffer;
pub mod compress;
pub mod error;
pub mod events;
pub mod negotiation;
pub mod subneg;
pub mod telnet;

#[cfg(feature = "tokio-util")]
use std::io;

use bytes::Bytes;
#[cfg(feature = "tokio-util")]
use bytes::BytesMut;
#[cfg(feature = "tokio-util")]
use tokio_util::codec::Decoder;

use buffer::SubnegotiationBuffer;
use compress::CompressionBridge;
use error::CodecError;
use events::{Event, Subnegotiation};
use negotiation::{Command, NegotiationQueue, QState, TelOpt, TelOptTable};
use telnet::op_command::{IAC, SB, SE};
use telnet::op_option::COMPRESS2;

/// The decoder's current position in the byte state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DecoderState {
    Data,
    Iac,
    /// Saw `IAC WILL/WONT/DO/DONT`; waiting for the option byte.
    Negotiating(Command),
    Sb,
    SbData,
    SbDataIac,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::Data
    }
}

/// Feature flags accepted at construction time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    /// Disable Q-method state tracking on receive; negotiations are
    /// surfaced as events and must be forwarded verbatim by the caller.
    pub proxy: bool,
}

/// Escape IAC (0xFF) bytes in application data bound for the wire.
///
/// `[0xFF, 1, 6, 2]` becomes `[0xFF, 0xFF, 1, 6, 2]`.
#[must_use]
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Reverse IAC escaping: collapse `IAC IAC` pairs back to a single 0xFF.
#[must_use]
pub fn unescape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut saw_iac = false;
    for &byte in data {
        if !saw_iac && byte == IAC {
            saw_iac = true;
            out.push(byte);
        } else if saw_iac && byte == IAC {
            saw_iac = false;
        } else {
            saw_iac = false;
            out.push(byte);
        }
    }
    out
}

/// Diagnostic text for a failed `SubnegotiationBuffer::push`, worded for
/// whichever of `Overflow`/`NoMemory` actually occurred.
fn subnegotiation_buffer_error_message(e: CodecError, option: u8) -> String {
    match e {
        CodecError::NoMemory => {
            format!("failed to grow subnegotiation buffer for option {option}")
        }
        _ => format!("subnegotiation buffer overflow for option {option}"),
    }
}

/// The codec instance.
///
/// Owns the negotiation queue, the subnegotiation buffer, the current
/// decoder state, and an optional compression stream. Borrows the
/// caller-supplied option-support table.
pub struct Codec<'a> {
    telopts: &'a [TelOpt],
    flags: Flags,
    queue: NegotiationQueue,
    sb_buffer: SubnegotiationBuffer,
    state: DecoderState,
    sb_option: u8,
    compression: CompressionBridge,
}

impl<'a> Codec<'a> {
    /// Construct a codec with no options declared as supported.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(&[], Flags::default())
    }

    /// Construct a codec with the given option-support table.
    #[must_use]
    pub fn with_options(telopts: &'a [TelOpt], flags: Flags) -> Self {
        Self {
            telopts,
            flags,
            queue: NegotiationQueue::new(),
            sb_buffer: SubnegotiationBuffer::new(),
            state: DecoderState::Data,
            sb_option: 0,
            compression: CompressionBridge::new(),
        }
    }

    fn telopts(&self) -> TelOptTable<'a> {
        TelOptTable(self.telopts)
    }

    /// Whether the peer currently has `option` enabled on their end.
    #[must_use]
    pub fn remote_enabled(&self, option: u8) -> bool {
        self.queue.him(option) == QState::Yes
    }

    /// Whether we currently have `option` enabled locally.
    #[must_use]
    pub fn local_enabled(&self, option: u8) -> bool {
        self.queue.us(option) == QState::Yes
    }

    // ---- receive path ---------------------------------------------------

    /// Feed newly read bytes into the codec, returning the events they
    /// produced. If inbound compression is active, `data` is first passed
    /// through inflate.
    pub fn receive(&mut self, data: &[u8]) -> Vec<Event> {
        if self.compression.is_inflating() {
            let mut decompressed = Vec::new();
            let torn_down = self
                .compression
                .inflate(data, |chunk| decompressed.extend_from_slice(chunk));
            let mut events = self.process_bytes(&decompressed);
            match torn_down {
                compress::TornDown::No => {}
                compress::TornDown::CleanEnd => events.push(Event::Compress(false)),
                compress::TornDown::Error => {
                    events.push(Event::Error(
                        CodecError::Compress,
                        String::from("inflate() failed"),
                    ));
                    events.push(Event::Compress(false));
                }
            }
            events
        } else {
            self.process_bytes(data)
        }
    }

    /// Route any `Event::Send` entries produced internally through the
    /// single compression sink, so negotiation replies get deflated the same
    /// way explicit sends do.
    fn route_sends(&mut self, events: Vec<Event>) -> Vec<Event> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            if let Event::Send(bytes) = event {
                out.extend(self.emit_send(&bytes));
            } else {
                out.push(event);
            }
        }
        out
    }

    /// The per-byte decoder state machine, oblivious to compression —
    /// `receive` is responsible for inflating first.
    fn process_bytes(&mut self, buf: &[u8]) -> Vec<Event> {
        let mut events = Vec::with_capacity(4);
        let mut start = 0usize;
        let mut i = 0usize;

        while i < buf.len() {
            let byte = buf[i];
            match self.state {
                DecoderState::Data => {
                    if byte == IAC {
                        if i != start {
                            events.push(Event::Data(Bytes::copy_from_slice(&buf[start..i])));
                        }
                        self.state = DecoderState::Iac;
                    }
                }
                DecoderState::Iac => match byte {
                    SB => self.state = DecoderState::Sb,
                    IAC => {
                        events.push(Event::Data(Bytes::copy_from_slice(&[IAC])));
                        start = i + 1;
                        self.state = DecoderState::Data;
                    }
                    other => {
                        if let Some(cmd) = Command::from_byte(other) {
                            self.state = DecoderState::Negotiating(cmd);
                        } else {
                            events.push(Event::Command(other));
                            start = i + 1;
                            self.state = DecoderState::Data;
                        }
                    }
                },
                DecoderState::Negotiating(cmd) => {
                    let raw = self
                        .queue
                        .receive(cmd, byte, self.telopts(), self.flags.proxy);
                    let routed = self.route_sends(raw);
                    events.extend(routed);
                    start = i + 1;
                    self.state = DecoderState::Data;
                }
                DecoderState::Sb => {
                    self.sb_option = byte;
                    self.sb_buffer.reset();
                    self.state = DecoderState::SbData;
                }
                DecoderState::SbData => {
                    if byte == IAC {
                        self.state = DecoderState::SbDataIac;
                    } else if let Err(e) = self.sb_buffer.push(byte) {
                        events.push(Event::Warning(
                            e,
                            subnegotiation_buffer_error_message(e, self.sb_option),
                        ));
                        start = i + 1;
                        self.state = DecoderState::Data;
                    }
                }
                DecoderState::SbDataIac => match byte {
                    SE => {
                        start = i + 1;
                        self.state = DecoderState::Data;
                        let finished = self.finish_subnegotiation();
                        events.extend(finished.events);
                        if finished.activated_compression {
                            let tail = &buf[start..];
                            events.extend(self.receive(tail));
                            return events;
                        }
                    }
                    IAC => {
                        if let Err(e) = self.sb_buffer.push(IAC) {
                            events.push(Event::Warning(
                                e,
                                subnegotiation_buffer_error_message(e, self.sb_option),
                            ));
                            start = i + 1;
                            self.state = DecoderState::Data;
                        } else {
                            self.state = DecoderState::SbData;
                        }
                    }
                    other => {
                        events.push(Event::Warning(
                            CodecError::Protocol,
                            format!("unexpected byte {other} after IAC inside subnegotiation"),
                        ));
                        start = i + 1;
                        self.state = DecoderState::Iac;

                        let finished = self.finish_subnegotiation();
                        events.extend(finished.events);
                        if finished.activated_compression {
                            let tail = &buf[start..];
                            events.extend(self.receive(tail));
                            return events;
                        }
                        // Reinterpret `other` as the byte following IAC,
                        // continuing from the Iac state set above.
                        let continuation = self.process_bytes(&[other]);
                        events.extend(continuation);
                    }
                },
            }
            i += 1;
        }

        if matches!(self.state, DecoderState::Data) && i != start {
            events.push(Event::Data(Bytes::copy_from_slice(&buf[start..i])));
        }

        events
    }

    /// Drains the subnegotiation buffer, dispatches it to the appropriate
    /// parser (or compression activation), and returns the resulting
    /// events plus whether inbound compression was just installed.
    fn finish_subnegotiation(&mut self) -> FinishedSubnegotiation {
        let option = self.sb_option;
        let payload = self.sb_buffer.take();

        if option == COMPRESS2 {
            let mut events = vec![Event::Subnegotiation(Subnegotiation::generic(
                option,
                payload,
            ))];
            match self.compression.install_inflate() {
                Ok(()) => {
                    events.push(Event::Compress(true));
                    return FinishedSubnegotiation {
                        events,
                        activated_compression: true,
                    };
                }
                Err(e) => {
                    // A peer-initiated COMPRESS2 we can't honor leaves the
                    // stream in a state the caller can't negotiate around,
                    // unlike a local double-init attempt (see
                    // `begin_compress2`) — fatal-class, not a warning.
                    events.push(Event::Error(
                        e,
                        String::from("COMPRESS2 activation failed: compression already active"),
                    ));
                }
            }
            return FinishedSubnegotiation {
                events,
                activated_compression: false,
            };
        }

        let parsed = subneg::parse(option, payload);
        let mut events = Vec::with_capacity(2);
        if let Some(msg) = parsed.warning {
            events.push(Event::Warning(CodecError::Protocol, String::from(msg)));
        }
        events.push(Event::Subnegotiation(parsed.event));
        FinishedSubnegotiation {
            events,
            activated_compression: false,
        }
    }

    // ---- send path --------------------------------------------------------

    /// Push raw bytes through the single private sink: deflated and emitted
    /// in chunks if outbound compression is active, otherwise emitted
    /// directly as one `Send` event.
    fn emit_send(&mut self, bytes: &[u8]) -> Vec<Event> {
        if self.compression.is_deflating() {
            let mut out = Vec::new();
            let torn_down = self
                .compression
                .deflate(bytes, |chunk| out.push(Event::Send(Bytes::copy_from_slice(chunk))));
            match torn_down {
                compress::TornDown::No => {}
                compress::TornDown::CleanEnd => out.push(Event::Compress(false)),
                compress::TornDown::Error => {
                    out.push(Event::Error(
                        CodecError::Compress,
                        String::from("deflate() failed"),
                    ));
                    out.push(Event::Compress(false));
                }
            }
            out
        } else {
            vec![Event::Send(Bytes::copy_from_slice(bytes))]
        }
    }

    /// Send a raw IAC command (e.g. `NOP`, `AYT`, `GA`).
    pub fn send_command(&mut self, cmd: u8) -> Vec<Event> {
        self.emit_send(&[IAC, cmd])
    }

    /// Request that `option` be negotiated via `cmd` (WILL/WONT/DO/DONT),
    /// routed through the Q-method so redundant negotiations are
    /// suppressed. In proxy mode, sends the command verbatim.
    pub fn negotiate(&mut self, cmd: Command, option: u8) -> Vec<Event> {
        let raw = self.queue.request(cmd, option, self.flags.proxy);
        self.route_sends(raw)
    }

    /// Send application data, with IAC bytes escaped.
    pub fn send_data(&mut self, data: &[u8]) -> Vec<Event> {
        let escaped = escape_iac(data);
        self.emit_send(&escaped)
    }

    /// Begin a subnegotiation: `IAC SB <option>`.
    pub fn begin_subnegotiation(&mut self, option: u8) -> Vec<Event> {
        self.emit_send(&[IAC, SB, option])
    }

    /// Send IAC-escaped data inside an in-progress subnegotiation.
    pub fn send_subnegotiation_data(&mut self, data: &[u8]) -> Vec<Event> {
        self.send_data(data)
    }

    /// Finish a subnegotiation: `IAC SE`.
    pub fn finish_subnegotiation_send(&mut self) -> Vec<Event> {
        self.emit_send(&[IAC, SE])
    }

    /// One-shot: a complete subnegotiation framed and IAC-escaped in a
    /// single pass, via `Subnegotiation`'s `Bytes` conversion, rather than
    /// three separate begin/data/finish sends.
    pub fn subnegotiation(&mut self, option: u8, data: &[u8]) -> Vec<Event> {
        let sub = Subnegotiation::generic(option, Bytes::copy_from_slice(data));
        let framed: Bytes = (&sub).into();
        self.emit_send(&framed)
    }

    /// Begin COMPRESS2: emit `IAC SB COMPRESS2 IAC SE` in the clear
    /// (bypassing deflate, which isn't installed yet), then install an
    /// outbound deflate stream.
    ///
    /// Does not return `Result`: on failure (compression already active) an
    /// `Event::Warning` is emitted and the codec continues uncompressed.
    pub fn begin_compress2(&mut self) -> Vec<Event> {
        let marker = [IAC, SB, COMPRESS2, IAC, SE];
        let mut events = vec![Event::Send(Bytes::copy_from_slice(&marker))];
        match self.compression.install_deflate() {
            Ok(()) => events.push(Event::Compress(true)),
            Err(e) => events.push(Event::Warning(
                e,
                String::from("cannot initialize compression twice"),
            )),
        }
        events
    }

    // ---- formatted output -------------------------------------------------

    /// Send `text`, translating `\n` to CR LF and `\r` to CR NUL in
    /// addition to IAC escaping — for non-binary telopts.
    pub fn format_data(&mut self, text: &str) -> Vec<Event> {
        const CRLF: [u8; 2] = [b'\r', b'\n'];
        const CRNUL: [u8; 2] = [b'\r', 0];

        let bytes = text.as_bytes();
        let mut events = Vec::new();
        let mut start = 0usize;
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                IAC => {
                    if i != start {
                        events.extend(self.emit_send(&bytes[start..i]));
                    }
                    events.extend(self.emit_send(&[IAC, IAC]));
                    start = i + 1;
                }
                b'\r' => {
                    if i != start {
                        events.extend(self.emit_send(&bytes[start..i]));
                    }
                    events.extend(self.emit_send(&CRNUL));
                    start = i + 1;
                }
                b'\n' => {
                    if i != start {
                        events.extend(self.emit_send(&bytes[start..i]));
                    }
                    events.extend(self.emit_send(&CRLF));
                    start = i + 1;
                }
                _ => {}
            }
        }
        if start != bytes.len() {
            events.extend(self.emit_send(&bytes[start..]));
        }
        events
    }

    /// Send `text` with only IAC escaping applied, no CR/LF translation.
    pub fn format_data_raw(&mut self, text: &str) -> Vec<Event> {
        self.send_data(text.as_bytes())
    }

    /// Send a type-and-data shaped subnegotiation (TTYPE/ENVIRON/
    /// NEW-ENVIRON/MSSP-style): each `(marker, data)` pair becomes `marker`
    /// followed by `data` in the payload. The non-variadic substitute for
    /// varargs-style subnegotiation formatting.
    pub fn format_subnegotiation(&mut self, option: u8, parts: &[(u8, &[u8])]) -> Vec<Event> {
        let mut payload = Vec::new();
        for (marker, data) in parts {
            payload.push(*marker);
            payload.extend_from_slice(data);
        }
        self.subnegotiation(option, &payload)
    }

    /// Send a ZMP command: each argument NUL-terminated and concatenated
    /// into the ZMP subnegotiation payload.
    pub fn send_zmp(&mut self, args: &[&str]) -> Vec<Event> {
        let mut payload = Vec::new();
        for arg in args {
            payload.extend_from_slice(arg.as_bytes());
            payload.push(0);
        }
        self.subnegotiation(telnet::op_option::ZMP, &payload)
    }
}

impl Default for Codec<'_> {
    fn default() -> Self {
        Self::new()
    }
}

struct FinishedSubnegotiation {
    events: Vec<Event>,
    activated_compression: bool,
}

#[cfg(feature = "tokio-util")]
impl Decoder for Codec<'_> {
    type Item = Vec<Event>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let events = self.receive(&src.split_off(0));
        Ok(if events.is_empty() { None } else { Some(events) })
    }
}
