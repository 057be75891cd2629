//! Character-mode input processing: bytewise edit buffer with server-side
//! echo and line editing.

use crate::telnet::options::control;

const CAPACITY: usize = 1023;

/// Outcome of feeding one byte to [`EditBuffer::process_byte`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharOutcome {
    /// Bytes to write back to the peer (may be empty).
    Echo(Vec<u8>),
    /// A completed line, already stripped of its terminator. `is_quit` is
    /// true when the line matched the exact literal `quit`.
    Line { text: Vec<u8>, is_quit: bool, echo: Vec<u8> },
    /// Ctrl+D: the session should close after writing `echo`.
    Eof { echo: Vec<u8> },
}

/// Bytewise edit buffer for the character-mode server.
///
/// Capacity 1023 bytes. The cursor always equals the buffer length: this
/// server has no interior-insert editing, only trailing backspace.
#[derive(Debug, Default)]
pub struct EditBuffer {
    buf: Vec<u8>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn reset(&mut self) {
        self.buf.clear();
    }

    /// Feed one application byte, returning the resulting outcome.
    pub fn process_byte(&mut self, byte: u8) -> CharOutcome {
        match byte {
            control::EOT => CharOutcome::Eof {
                echo: b"\r\nGoodbye!\r\n".to_vec(),
            },
            control::ETX => {
                self.reset();
                CharOutcome::Echo(b"\r\n".to_vec())
            }
            control::BS | control::DEL => {
                if self.buf.pop().is_some() {
                    CharOutcome::Echo(b"\x08 \x08".to_vec())
                } else {
                    CharOutcome::Echo(Vec::new())
                }
            }
            control::CR => self.finish_line(b"\r\n".to_vec()),
            control::LF => self.finish_line(Vec::new()),
            b if b >= 32 => {
                if self.buf.len() < CAPACITY {
                    self.buf.push(b);
                    CharOutcome::Echo(vec![b])
                } else {
                    CharOutcome::Echo(Vec::new())
                }
            }
            _ => CharOutcome::Echo(Vec::new()),
        }
    }

    fn finish_line(&mut self, mut echo: Vec<u8>) -> CharOutcome {
        let is_quit = self.buf == b"quit";
        let text = std::mem::take(&mut self.buf);
        if is_quit {
            echo.extend_from_slice(b"Goodbye!\r\n");
        } else if !text.is_empty() {
            echo.extend_from_slice(b"ECHO: ");
            echo.extend_from_slice(&text);
            echo.extend_from_slice(b"\r\n");
        }
        CharOutcome::Line {
            text,
            is_quit,
            echo,
        }
    }
}
