//! The Telnet byte-stream decoder and encoder.
//!
//! The decoder is stream-resumable: a partial IAC sequence or subnegotiation
//! split across two reads is held in `TelnetDecoder`'s own fields rather than
//! dropped, unlike the reference C implementation this server replaces.

use super::options::iac;

/// A decoded Telnet command (anything following a lone IAC byte other than
/// another IAC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetCommand {
    Will(u8),
    Wont(u8),
    Do(u8),
    Dont(u8),
    Subnegotiation { option: u8, data: Vec<u8> },
    Nop,
    GoAhead,
    /// Any other single-byte IAC command not otherwise modeled.
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    SawIac,
    SawCommand(u8),
    InSubneg,
    InSubnegSawIac,
}

/// Resumable Telnet stream decoder.
///
/// One instance per connection. Feed it bytes as they arrive via [`decode`];
/// it returns the application data bytes extracted (with `IAC IAC` collapsed
/// to a single `0xFF`) and the Telnet commands recognized, in the order each
/// class of event completed parsing.
#[derive(Debug, Clone)]
pub struct TelnetDecoder {
    state: State,
    subneg_option: u8,
    subneg_option_set: bool,
    subneg_data: Vec<u8>,
}

impl Default for TelnetDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Data,
            subneg_option: 0,
            subneg_option_set: false,
            subneg_data: Vec::new(),
        }
    }

    /// Feed a chunk of inbound bytes. Returns the application data bytes and
    /// the Telnet commands decoded from this chunk, continuing whatever
    /// sequence was left in progress from a prior call.
    pub fn decode(&mut self, input: &[u8]) -> (Vec<u8>, Vec<TelnetCommand>) {
        let mut data = Vec::new();
        let mut commands = Vec::new();

        for &byte in input {
            match self.state {
                State::Data => {
                    if byte == iac::IAC {
                        self.state = State::SawIac;
                    } else {
                        data.push(byte);
                    }
                }
                State::SawIac => match byte {
                    iac::IAC => {
                        data.push(iac::IAC);
                        self.state = State::Data;
                    }
                    iac::WILL | iac::WONT | iac::DO | iac::DONT => {
                        self.state = State::SawCommand(byte);
                    }
                    iac::SB => {
                        self.subneg_option = 0;
                        self.subneg_option_set = false;
                        self.subneg_data.clear();
                        self.state = State::InSubneg;
                    }
                    iac::NOP => {
                        commands.push(TelnetCommand::Nop);
                        self.state = State::Data;
                    }
                    iac::GA => {
                        commands.push(TelnetCommand::GoAhead);
                        self.state = State::Data;
                    }
                    other => {
                        commands.push(TelnetCommand::Other(other));
                        self.state = State::Data;
                    }
                },
                State::SawCommand(cmd) => {
                    let option = byte;
                    commands.push(match cmd {
                        iac::WILL => TelnetCommand::Will(option),
                        iac::WONT => TelnetCommand::Wont(option),
                        iac::DO => TelnetCommand::Do(option),
                        iac::DONT => TelnetCommand::Dont(option),
                        _ => unreachable!("SawCommand only entered for option commands"),
                    });
                    self.state = State::Data;
                }
                State::InSubneg => {
                    if !self.subneg_option_set && byte != iac::IAC {
                        self.subneg_option = byte;
                        self.subneg_option_set = true;
                    } else if byte == iac::IAC {
                        self.state = State::InSubnegSawIac;
                    } else {
                        self.subneg_data.push(byte);
                    }
                }
                State::InSubnegSawIac => {
                    if byte == iac::IAC {
                        self.subneg_data.push(iac::IAC);
                        self.state = State::InSubneg;
                    } else if byte == iac::SE {
                        commands.push(TelnetCommand::Subnegotiation {
                            option: self.subneg_option,
                            data: std::mem::take(&mut self.subneg_data),
                        });
                        self.subneg_option = 0;
                        self.state = State::Data;
                    } else {
                        // Malformed: IAC followed by neither IAC nor SE inside a
                        // subnegotiation. Treat as the start of a fresh command
                        // rather than hanging forever in InSubneg.
                        self.subneg_data.clear();
                        self.subneg_option = 0;
                        match byte {
                            iac::WILL | iac::WONT | iac::DO | iac::DONT => {
                                self.state = State::SawCommand(byte);
                            }
                            _ => self.state = State::Data,
                        }
                    }
                }
            }
        }

        (data, commands)
    }
}

/// Encode a single 3-byte option command: `IAC cmd opt`.
pub fn encode_command(cmd: u8, option: u8) -> [u8; 3] {
    [iac::IAC, cmd, option]
}

/// Encode a subnegotiation frame, escaping any `IAC` byte in `payload`.
pub fn encode_subnegotiation(option: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 5);
    out.push(iac::IAC);
    out.push(iac::SB);
    out.push(option);
    for &b in payload {
        if b == iac::IAC {
            out.push(iac::IAC);
        }
        out.push(b);
    }
    out.push(iac::IAC);
    out.push(iac::SE);
    out
}
