//! Per-option negotiation state and the RFC 1143 "Q method" automaton.

use bytes::Bytes;

use crate::error::CodecError;
use crate::events::Event;
use crate::telnet::op_command::{DO, DONT, IAC, WILL, WONT};

/// One side's negotiation state for a single option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QState {
    No,
    Yes,
    WantNo,
    WantYes,
    WantNoOp,
    WantYesOp,
}

impl Default for QState {
    fn default() -> Self {
        Self::No
    }
}

/// The four-byte wire command this negotiation step is about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Will,
    Wont,
    Do,
    Dont,
}

impl Command {
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            WILL => Some(Self::Will),
            WONT => Some(Self::Wont),
            DO => Some(Self::Do),
            DONT => Some(Self::Dont),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Will => WILL,
            Self::Wont => WONT,
            Self::Do => DO,
            Self::Dont => DONT,
        }
    }
}

/// `{ option, us, him }` — absence from the queue is equivalent to `(No, No)`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct OptionState {
    option: u8,
    us: QState,
    him: QState,
}

/// One static table entry declaring what we offer (`us`) and accept (`him`)
/// for a given option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TelOpt {
    pub option: u8,
    /// We are willing to `WILL` this option when the peer `DO`s it.
    pub us: bool,
    /// We accept the peer's `WILL` (i.e. we'd send `DO`) for this option.
    pub him: bool,
}

impl TelOpt {
    #[must_use]
    pub const fn new(option: u8, us: bool, him: bool) -> Self {
        Self { option, us, him }
    }
}

/// A linear-search support table; these are small in practice (≤16 entries).
#[derive(Clone, Copy, Debug)]
pub struct TelOptTable<'a>(pub &'a [TelOpt]);

impl TelOptTable<'_> {
    fn find(&self, option: u8) -> Option<&TelOpt> {
        self.0.iter().find(|e| e.option == option)
    }

    #[must_use]
    pub fn supports_local(&self, option: u8) -> bool {
        self.find(option).is_some_and(|e| e.us)
    }

    #[must_use]
    pub fn supports_remote(&self, option: u8) -> bool {
        self.find(option).is_some_and(|e| e.him)
    }
}

impl Default for TelOptTable<'_> {
    fn default() -> Self {
        Self(&[])
    }
}

fn send_negotiate(cmd: u8, option: u8) -> Event {
    Event::Send(Bytes::copy_from_slice(&[IAC, cmd, option]))
}

/// The grow-only queue of per-option negotiation state, plus the Q-method
/// transition logic that operates on it.
#[derive(Clone, Debug, Default)]
pub struct NegotiationQueue {
    entries: Vec<OptionState>,
}

impl NegotiationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, option: u8) -> OptionState {
        self.entries
            .iter()
            .find(|e| e.option == option)
            .copied()
            .unwrap_or(OptionState {
                option,
                ..OptionState::default()
            })
    }

    /// Insert-or-update; grows the queue on first mention of an option.
    /// Mirrors the original's "grow-only, never removed" invariant.
    fn set(&mut self, option: u8, us: QState, him: QState) -> Result<(), CodecError> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.option == option) {
            entry.us = us;
            entry.him = him;
            return Ok(());
        }
        self.entries.try_reserve(1).map_err(|_| CodecError::NoMemory)?;
        self.entries.push(OptionState { option, us, him });
        Ok(())
    }

    #[must_use]
    pub fn us(&self, option: u8) -> QState {
        self.get(option).us
    }

    #[must_use]
    pub fn him(&self, option: u8) -> QState {
        self.get(option).him
    }

    /// Handle a WILL/WONT/DO/DONT byte received from the peer, per the
    /// receiver-side Q-method tables.
    pub fn receive(
        &mut self,
        cmd: Command,
        option: u8,
        telopts: TelOptTable<'_>,
        proxy: bool,
    ) -> Vec<Event> {
        if proxy {
            return vec![match cmd {
                Command::Will => Event::Will(option),
                Command::Wont => Event::Wont(option),
                Command::Do => Event::Do(option),
                Command::Dont => Event::Dont(option),
            }];
        }

        let q = self.get(option);
        let mut out = Vec::with_capacity(2);

        macro_rules! set {
            ($us:expr, $him:expr) => {
                if let Err(e) = self.set(option, $us, $him) {
                    out.push(Event::Warning(e, format!(
                        "failed to persist negotiation state for option {option}"
                    )));
                }
            };
        }

        match cmd {
            Command::Will => match q.him {
                QState::No => {
                    if telopts.supports_remote(option) {
                        set!(q.us, QState::Yes);
                        out.push(send_negotiate(DO, option));
                        out.push(Event::Will(option));
                    } else {
                        out.push(send_negotiate(DONT, option));
                    }
                }
                QState::Yes => {}
                QState::WantNo => {
                    set!(q.us, QState::No);
                    out.push(Event::Wont(option));
                    out.push(Event::Warning(
                        CodecError::Protocol,
                        String::from("DONT answered by WILL"),
                    ));
                }
                QState::WantNoOp => {
                    set!(q.us, QState::Yes);
                    out.push(Event::Will(option));
                    out.push(Event::Warning(
                        CodecError::Protocol,
                        String::from("DONT answered by WILL"),
                    ));
                }
                QState::WantYes => {
                    set!(q.us, QState::Yes);
                    out.push(Event::Will(option));
                }
                QState::WantYesOp => {
                    set!(q.us, QState::WantNo);
                    out.push(send_negotiate(DONT, option));
                    out.push(Event::Will(option));
                }
            },
            Command::Wont => match q.him {
                QState::Yes => {
                    set!(q.us, QState::No);
                    out.push(send_negotiate(DONT, option));
                    out.push(Event::Wont(option));
                }
                QState::WantNo => {
                    set!(q.us, QState::No);
                    out.push(Event::Wont(option));
                }
                QState::WantNoOp => {
                    set!(q.us, QState::WantYes);
                    out.push(Event::Do(option));
                }
                QState::WantYes | QState::WantYesOp => {
                    set!(q.us, QState::No);
                }
                QState::No => {}
            },
            Command::Do => match q.us {
                QState::No => {
                    if telopts.supports_local(option) {
                        set!(QState::Yes, q.him);
                        out.push(send_negotiate(WILL, option));
                        out.push(Event::Do(option));
                    } else {
                        out.push(send_negotiate(WONT, option));
                    }
                }
                QState::Yes => {}
                QState::WantNo => {
                    set!(QState::No, q.him);
                    out.push(Event::Dont(option));
                    out.push(Event::Warning(
                        CodecError::Protocol,
                        String::from("WONT answered by DO"),
                    ));
                }
                QState::WantNoOp => {
                    set!(QState::Yes, q.him);
                    out.push(Event::Do(option));
                    out.push(Event::Warning(
                        CodecError::Protocol,
                        String::from("WONT answered by DO"),
                    ));
                }
                QState::WantYes => {
                    set!(QState::Yes, q.him);
                    out.push(Event::Do(option));
                }
                QState::WantYesOp => {
                    set!(QState::WantNo, q.him);
                    out.push(send_negotiate(WONT, option));
                    out.push(Event::Do(option));
                }
            },
            Command::Dont => match q.us {
                QState::Yes => {
                    set!(QState::No, q.him);
                    out.push(send_negotiate(WONT, option));
                    out.push(Event::Dont(option));
                }
                QState::WantNo => {
                    set!(QState::No, q.him);
                    out.push(Event::Wont(option));
                }
                QState::WantNoOp => {
                    set!(QState::WantYes, q.him);
                    out.push(Event::Will(option));
                }
                QState::WantYes | QState::WantYesOp => {
                    set!(QState::No, q.him);
                }
                QState::No => {}
            },
        }

        out
    }

    /// Caller-initiated "please enable/disable" request. Returns the bytes
    /// (if any) that must be sent.
    pub fn request(&mut self, cmd: Command, option: u8, proxy: bool) -> Vec<Event> {
        if proxy {
            return vec![send_negotiate(cmd.as_byte(), option)];
        }

        let q = self.get(option);
        let mut out = Vec::new();

        macro_rules! set {
            ($us:expr, $him:expr) => {
                if let Err(e) = self.set(option, $us, $him) {
                    out.push(Event::Warning(e, format!(
                        "failed to persist negotiation state for option {option}"
                    )));
                }
            };
        }

        match cmd {
            Command::Will => match q.us {
                QState::No => {
                    set!(QState::WantYes, q.him);
                    out.push(send_negotiate(WILL, option));
                }
                QState::WantNo => set!(QState::WantNoOp, q.him),
                QState::WantYesOp => set!(QState::WantYes, q.him),
                QState::Yes | QState::WantYes | QState::WantNoOp => {}
            },
            Command::Wont => match q.us {
                QState::Yes => {
                    set!(QState::WantNo, q.him);
                    out.push(send_negotiate(WONT, option));
                }
                QState::WantYes => set!(QState::WantYesOp, q.him),
                QState::WantNoOp => set!(QState::WantNo, q.him),
                QState::No | QState::WantNo | QState::WantYesOp => {}
            },
            Command::Do => match q.him {
                QState::No => {
                    set!(q.us, QState::WantYes);
                    out.push(send_negotiate(DO, option));
                }
                QState::WantNo => set!(q.us, QState::WantNoOp),
                QState::WantYesOp => set!(q.us, QState::WantYes),
                QState::Yes | QState::WantYes | QState::WantNoOp => {}
            },
            Command::Dont => match q.him {
                QState::Yes => {
                    set!(q.us, QState::WantNo);
                    out.push(send_negotiate(DONT, option));
                }
                QState::WantYes => set!(q.us, QState::WantYesOp),
                QState::WantNoOp => set!(q.us, QState::WantNo),
                QState::No | QState::WantNo | QState::WantYesOp => {}
            },
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: u8 = crate::telnet::op_option::ECHO;
    const TTYPE: u8 = crate::telnet::op_option::TTYPE;

    #[test]
    fn supported_will_is_accepted_and_do_is_sent() {
        let table = [TelOpt::new(ECHO, false, true)];
        let mut q = NegotiationQueue::new();
        let events = q.receive(Command::Will, ECHO, TelOptTable(&table), false);
        assert_eq!(q.him(ECHO), QState::Yes);
        assert!(events.contains(&Event::Will(ECHO)));
        assert!(events.contains(&Event::Send(Bytes::copy_from_slice(&[IAC, DO, ECHO]))));
    }

    #[test]
    fn unsupported_do_is_refused_with_wont() {
        let table: [TelOpt; 0] = [];
        let mut q = NegotiationQueue::new();
        let events = q.receive(Command::Do, TTYPE, TelOptTable(&table), false);
        assert_eq!(q.us(TTYPE), QState::No);
        assert_eq!(events, vec![Event::Send(Bytes::copy_from_slice(&[
            IAC, WONT, TTYPE
        ]))]);
        assert!(!events.iter().any(|e| matches!(e, Event::Do(_))));
    }

    #[test]
    fn q_method_liveness_single_round_trip() {
        // caller asks to enable locally (WILL); peer is known to DO it.
        let mut q = NegotiationQueue::new();
        let req = q.request(Command::Will, ECHO, false);
        assert_eq!(q.us(ECHO), QState::WantYes);
        assert_eq!(req, vec![Event::Send(Bytes::copy_from_slice(&[
            IAC, WILL, ECHO
        ]))]);

        // peer replies DO.
        let table = [TelOpt::new(ECHO, true, false)];
        let events = q.receive(Command::Do, ECHO, TelOptTable(&table), false);
        assert_eq!(q.us(ECHO), QState::Yes);
        assert!(events.contains(&Event::Do(ECHO)));
        // no further WILL/DO should be sent in reply to an expected answer.
        assert!(!events.iter().any(|e| matches!(e, Event::Send(_))));
    }

    #[test]
    fn wantno_answered_by_will_is_a_protocol_warning_and_resolves_to_yes() {
        let mut q = NegotiationQueue::new();
        // Force into WANTNO by requesting disable first.
        q.receive(Command::Will, ECHO, TelOptTable(&[TelOpt::new(ECHO, false, true)]), false);
        q.request(Command::Dont, ECHO, false);
        assert_eq!(q.him(ECHO), QState::WantNo);

        let events = q.receive(Command::Will, ECHO, TelOptTable(&[]), false);
        assert_eq!(q.him(ECHO), QState::No);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Warning(CodecError::Protocol, _))));
    }

    #[test]
    fn proxy_mode_bypasses_state_tracking() {
        let mut q = NegotiationQueue::new();
        let events = q.receive(Command::Will, ECHO, TelOptTable(&[]), true);
        assert_eq!(events, vec![Event::Will(ECHO)]);
        assert_eq!(q.him(ECHO), QState::No);
    }
}
