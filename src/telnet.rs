//! Wire-level constants: IAC commands and telnet option (telopt) numbers.

/// IAC commands and the framing bytes that surround them.
pub mod op_command {
    /// "Interpret As Command" — the sentinel that begins every control sequence.
    pub const IAC: u8 = 255;
    pub const DONT: u8 = 254;
    pub const DO: u8 = 253;
    pub const WONT: u8 = 252;
    pub const WILL: u8 = 251;
    /// Subnegotiation begin.
    pub const SB: u8 = 250;
    pub const GA: u8 = 249;
    pub const EL: u8 = 248;
    pub const EC: u8 = 247;
    pub const AYT: u8 = 246;
    pub const AO: u8 = 245;
    pub const IP: u8 = 244;
    pub const BREAK: u8 = 243;
    pub const DM: u8 = 242;
    pub const NOP: u8 = 241;
    /// Subnegotiation end.
    pub const SE: u8 = 240;
    pub const EOR: u8 = 239;
    pub const ABORT: u8 = 238;
    pub const SUSP: u8 = 237;
    pub const XEOF: u8 = 236;
}

/// Telnet option ("telopt") numbers.
pub mod op_option {
    pub const BINARY: u8 = 0;
    pub const ECHO: u8 = 1;
    pub const RCP: u8 = 2;
    pub const SGA: u8 = 3;
    pub const NAMS: u8 = 4;
    pub const STATUS: u8 = 5;
    pub const TM: u8 = 6;
    pub const TTYPE: u8 = 24;
    pub const EOR: u8 = 25;
    pub const NAWS: u8 = 31;
    pub const TSPEED: u8 = 32;
    pub const LFLOW: u8 = 33;
    pub const LINEMODE: u8 = 34;
    pub const XDISPLOC: u8 = 35;
    pub const ENVIRON: u8 = 36;
    pub const AUTHENTICATION: u8 = 37;
    pub const ENCRYPT: u8 = 38;
    pub const NEW_ENVIRON: u8 = 39;
    pub const MSSP: u8 = 70;
    /// MCCP1, superseded by COMPRESS2; kept only as a named constant, not
    /// structurally decoded.
    pub const COMPRESS: u8 = 85;
    /// MCCP2.
    pub const COMPRESS2: u8 = 86;
    pub const ZMP: u8 = 93;
    pub const EXOPL: u8 = 255;
}

/// Sub-codes used within the type-and-data subnegotiation family
/// (TTYPE, ENVIRON, NEW-ENVIRON, MSSP).
pub mod op_sub {
    pub const IS: u8 = 0;
    pub const SEND: u8 = 1;
    pub const INFO: u8 = 2;
    pub const VAR: u8 = 0;
    pub const VALUE: u8 = 1;
    pub const ESC: u8 = 2;
    pub const USERVAR: u8 = 3;
}
