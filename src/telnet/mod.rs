//! RFC 854 / RFC 1184 Telnet protocol core: byte-stream codec and option
//! negotiation state machine.

pub mod codec;
pub mod negotiation;
pub mod options;

pub use codec::{TelnetCommand, TelnetDecoder};
pub use negotiation::{Mode, Negotiation};
