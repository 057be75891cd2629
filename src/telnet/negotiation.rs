//! Per-mode Telnet option negotiation state machine.
//!
//! Each connection owns one [`Negotiation`]. It emits the initial option
//! vector on construction, then folds inbound [`TelnetCommand`]s one at a
//! time, producing the bytes to write back (if any) and, on the one-shot
//! acked-everything transition, the ready banner.

use super::codec::{encode_command, encode_subnegotiation, TelnetCommand};
use super::options::{iac, linemode, option};

/// Which of the two servers this negotiation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Char,
    LineBinary,
}

/// Negotiation state for one connection.
///
/// Ack flags only ever transition `false -> true` and never reset, matching
/// the session's data model. `ready_sent` follows the same rule and gates
/// the one-shot ready banner.
#[derive(Debug, Clone)]
pub struct Negotiation {
    mode: Mode,
    echo_acked: bool,
    sga_acked: bool,
    binary_acked: bool,
    linemode_acked: bool,
    ready_sent: bool,
}

const READY_CHAR: &[u8] = b"\r\n*** READY! ***\r\n\r\n";
const READY_LINE: &[u8] = b"\r\n*** READY! (BINARY mode active) ***\r\n\r\n";

impl Negotiation {
    /// Construct a fresh negotiation for `mode` and return the initial
    /// option vector to write to the peer before anything else.
    pub fn start(mode: Mode) -> (Self, Vec<u8>) {
        let mut state = Self {
            mode,
            echo_acked: false,
            sga_acked: false,
            binary_acked: false,
            linemode_acked: false,
            ready_sent: false,
        };

        let mut out = Vec::new();
        match mode {
            Mode::Char => {
                out.extend_from_slice(&encode_command(iac::DONT, option::LINEMODE));
                out.extend_from_slice(&encode_command(iac::WILL, option::ECHO));
                state.echo_acked = true;
                out.extend_from_slice(&encode_command(iac::WILL, option::SGA));
                out.extend_from_slice(&encode_command(iac::DO, option::SGA));
            }
            Mode::LineBinary => {
                out.extend_from_slice(&encode_command(iac::DO, option::BINARY));
                out.extend_from_slice(&encode_command(iac::WILL, option::BINARY));
                state.binary_acked = true;
                out.extend_from_slice(&encode_command(iac::DO, option::LINEMODE));
                out.extend_from_slice(&encode_command(iac::WONT, option::ECHO));
                state.echo_acked = true;
                out.extend_from_slice(&encode_command(iac::WILL, option::SGA));
                out.extend_from_slice(&encode_command(iac::DO, option::SGA));
                out.extend_from_slice(&encode_subnegotiation(
                    option::LINEMODE,
                    &[linemode::LM_MODE, linemode::MODE_EDIT],
                ));
            }
        }

        out.extend_from_slice(&state.maybe_ready());
        (state, out)
    }

    /// True once every option this mode tracks has been acknowledged.
    fn all_acked(&self) -> bool {
        match self.mode {
            Mode::Char => self.echo_acked && self.sga_acked,
            Mode::LineBinary => {
                self.binary_acked && self.linemode_acked && self.echo_acked && self.sga_acked
            }
        }
    }

    fn maybe_ready(&mut self) -> Vec<u8> {
        if !self.ready_sent && self.all_acked() {
            self.ready_sent = true;
            match self.mode {
                Mode::Char => READY_CHAR.to_vec(),
                Mode::LineBinary => READY_LINE.to_vec(),
            }
        } else {
            Vec::new()
        }
    }

    /// Fold one decoded Telnet command into the state machine. Returns the
    /// bytes to write back (possibly empty), including the ready banner if
    /// this event is the one that completes negotiation.
    pub fn handle(&mut self, cmd: &TelnetCommand) -> Vec<u8> {
        let mut out = match cmd {
            TelnetCommand::Do(opt) => self.handle_do(*opt),
            TelnetCommand::Dont(opt) => self.handle_dont(*opt),
            TelnetCommand::Will(opt) => self.handle_will(*opt),
            TelnetCommand::Wont(opt) => self.handle_wont(*opt),
            _ => Vec::new(),
        };
        out.extend_from_slice(&self.maybe_ready());
        out
    }

    fn handle_do(&mut self, opt: u8) -> Vec<u8> {
        match (self.mode, opt) {
            (Mode::Char, o) if o == option::ECHO => {
                self.ack_once_then(!self.echo_acked, |s| s.echo_acked = true, iac::WILL, opt)
            }
            (Mode::LineBinary, o) if o == option::ECHO => {
                self.ack_once_then(!self.echo_acked, |s| s.echo_acked = true, iac::WONT, opt)
            }
            (_, o) if o == option::SGA => {
                self.ack_once_then(!self.sga_acked, |s| s.sga_acked = true, iac::WILL, opt)
            }
            (Mode::LineBinary, o) if o == option::BINARY => self.ack_once_then(
                !self.binary_acked,
                |s| s.binary_acked = true,
                iac::WILL,
                opt,
            ),
            _ => encode_command(iac::WONT, opt).to_vec(),
        }
    }

    fn handle_dont(&mut self, opt: u8) -> Vec<u8> {
        if opt == option::ECHO {
            self.echo_acked = true;
        } else if opt == option::BINARY {
            self.binary_acked = true;
        }
        encode_command(iac::WONT, opt).to_vec()
    }

    fn handle_will(&mut self, opt: u8) -> Vec<u8> {
        match (self.mode, opt) {
            (_, o) if o == option::SGA => {
                self.ack_once_then(!self.sga_acked, |s| s.sga_acked = true, iac::DO, opt)
            }
            (Mode::LineBinary, o) if o == option::BINARY => {
                self.ack_once_then(!self.binary_acked, |s| s.binary_acked = true, iac::DO, opt)
            }
            (Mode::LineBinary, o) if o == option::LINEMODE => self.ack_once_then(
                !self.linemode_acked,
                |s| s.linemode_acked = true,
                iac::DO,
                opt,
            ),
            (Mode::LineBinary, o) if o == option::ECHO => {
                self.ack_once_then(!self.echo_acked, |s| s.echo_acked = true, iac::DO, opt)
            }
            _ => encode_command(iac::DONT, opt).to_vec(),
        }
    }

    fn handle_wont(&mut self, opt: u8) -> Vec<u8> {
        if opt == option::LINEMODE {
            self.linemode_acked = true;
        } else if opt == option::BINARY {
            self.binary_acked = true;
        }
        encode_command(iac::DONT, opt).to_vec()
    }

    /// Emit `encode_command(reply_cmd, opt)` and run `set_ack` only the
    /// first time this option is acknowledged; a peer that keeps re-sending
    /// the same acknowledgment gets no further replies, which is what keeps
    /// a mirroring peer from looping forever.
    fn ack_once_then(
        &mut self,
        first_time: bool,
        set_ack: impl FnOnce(&mut Self),
        reply_cmd: u8,
        opt: u8,
    ) -> Vec<u8> {
        if first_time {
            set_ack(self);
            encode_command(reply_cmd, opt).to_vec()
        } else {
            Vec::new()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready_sent
    }
}
