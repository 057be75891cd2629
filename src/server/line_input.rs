//! Line-binary mode input processing: an accumulation buffer with
//! multi-terminator line detection and UTF-8 boundary preservation across
//! read boundaries.

const CAPACITY: usize = 2047;

/// A completed line extracted from a [`LineBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub text: Vec<u8>,
    pub is_quit: bool,
    pub echo: Vec<u8>,
}

/// Accumulation buffer for the line-binary server.
///
/// Capacity 2047 bytes of application data. Holds out an incomplete UTF-8
/// tail (up to 3 bytes) from terminator scanning so a multi-byte codepoint
/// split across two reads isn't cleaved mid-sequence.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append newly read application bytes and extract as many complete
    /// lines as the buffer now contains. The second return value is `true`
    /// if the retained, still-incomplete remainder overflowed capacity and
    /// was discarded; complete lines found before that point are still
    /// returned, since overflow only applies to a line without a terminator.
    pub fn process(&mut self, bytes: &[u8]) -> (Vec<LineOutcome>, bool) {
        self.buf.extend_from_slice(bytes);

        let mut outcomes = Vec::new();
        loop {
            let hold = incomplete_utf8_len(&self.buf);
            let scan_len = self.buf.len() - hold;
            let found = find_terminator(&self.buf[..scan_len]);
            match found {
                Some((line_end, consumed)) => {
                    let text = self.buf[..line_end].to_vec();
                    let is_quit = text == b"quit";
                    let mut echo = Vec::new();
                    if is_quit {
                        echo.extend_from_slice(b"Goodbye!\r\n");
                    } else if !text.is_empty() {
                        echo.extend_from_slice(b"ECHO: ");
                        echo.extend_from_slice(&text);
                        echo.extend_from_slice(b"\r\n");
                    }
                    outcomes.push(LineOutcome { text, is_quit, echo });
                    self.buf.drain(0..consumed);
                }
                None => break,
            }
        }

        if self.buf.len() > CAPACITY {
            self.buf.clear();
            return (outcomes, true);
        }

        (outcomes, false)
    }
}

/// Returns `(line_end, consumed)` for the earliest terminator in `buf`, where
/// `line_end` is the index content stops at (terminator bytes excluded) and
/// `consumed` is the total byte count (content plus terminator) to remove
/// from the front of the buffer. Returns `None` if no terminator is found,
/// including the "bare CR at end of buffer, wait for more" case.
fn find_terminator(buf: &[u8]) -> Option<(usize, usize)> {
    for (i, &b) in buf.iter().enumerate() {
        match b {
            b'\n' => return Some((i, i + 1)),
            b'\r' => {
                return match buf.get(i + 1) {
                    None => None,
                    Some(b'\n') | Some(0) => Some((i, i + 2)),
                    Some(_) => Some((i, i + 1)),
                };
            }
            _ => {}
        }
    }
    None
}

fn utf8_seq_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        0
    }
}

/// Scan backward from the end of `buf` (up to 4 bytes) for an incomplete
/// UTF-8 sequence and return how many trailing bytes belong to it. Returns 0
/// if the tail is ASCII, a complete multi-byte sequence, or not UTF-8-like.
fn incomplete_utf8_len(buf: &[u8]) -> usize {
    let len = buf.len();
    let max_back = 4.min(len);
    for back in 1..=max_back {
        let b = buf[len - back];
        if b & 0xC0 == 0x80 {
            continue; // continuation byte, keep looking backward for its lead
        }
        let expected = utf8_seq_len(b);
        if expected == 0 {
            return 0;
        }
        return if back < expected { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_terminator() {
        let mut buf = LineBuffer::new();
        let (outcomes, overflow) = buf.process(b"abc\r\n");
        assert!(!overflow);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].text, b"abc");
        assert_eq!(outcomes[0].echo, b"ECHO: abc\r\n");
    }

    #[test]
    fn test_cr_nul_terminator() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"abc\r\0");
        assert_eq!(outcomes[0].text, b"abc");
    }

    #[test]
    fn test_lf_alone_terminator() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"abc\n");
        assert_eq!(outcomes[0].text, b"abc");
    }

    #[test]
    fn test_bare_cr_followed_by_other_byte() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"abc\rdef\n");
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].text, b"abc");
        assert_eq!(outcomes[1].text, b"def");
    }

    #[test]
    fn test_bare_cr_at_end_of_buffer_waits() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"abc\r");
        assert!(outcomes.is_empty());
        let (outcomes2, _) = buf.process(b"\ndef\n");
        assert_eq!(outcomes2.len(), 1);
        assert_eq!(outcomes2[0].text, b"abc");
    }

    #[test]
    fn test_quit_recognized() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"quit\n");
        assert!(outcomes[0].is_quit);
        assert_eq!(outcomes[0].echo, b"Goodbye!\r\n");
    }

    #[test]
    fn test_multiple_lines_in_one_read() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"one\ntwo\nthree\n");
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].text, b"one");
        assert_eq!(outcomes[1].text, b"two");
        assert_eq!(outcomes[2].text, b"three");
    }

    #[test]
    fn test_utf8_split_across_two_reads() {
        let mut buf = LineBuffer::new();
        // U+AC00 (가) = EA B0 80 in UTF-8, split after 2 bytes.
        let (outcomes1, _) = buf.process(&[0xEA, 0xB0]);
        assert!(outcomes1.is_empty());
        let (outcomes2, _) = buf.process(&[0x80, b'\n']);
        assert_eq!(outcomes2.len(), 1);
        assert_eq!(outcomes2[0].text, vec![0xEA, 0xB0, 0x80]);
    }

    #[test]
    fn test_utf8_split_after_one_byte() {
        let mut buf = LineBuffer::new();
        let (outcomes1, _) = buf.process(&[0xEA]);
        assert!(outcomes1.is_empty());
        let (outcomes2, _) = buf.process(&[0xB0, 0x80, b'\n']);
        assert_eq!(outcomes2[0].text, vec![0xEA, 0xB0, 0x80]);
    }

    #[test]
    fn test_ascii_not_held_out() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"ab");
        assert!(outcomes.is_empty());
        assert_eq!(buf.buf, b"ab");
    }

    #[test]
    fn test_overflow_discards_buffer() {
        let mut buf = LineBuffer::new();
        let big = vec![b'x'; CAPACITY + 1];
        let (outcomes, overflow) = buf.process(&big);
        assert!(overflow);
        assert!(outcomes.is_empty());
        assert!(buf.buf.is_empty());
    }

    #[test]
    fn test_overflow_does_not_discard_a_completed_line_first() {
        // 2040 bytes with no terminator, then a read that both completes
        // that line and pushes total buffered length past capacity.
        let mut buf = LineBuffer::new();
        let (outcomes, overflow) = buf.process(&vec![b'x'; 2040]);
        assert!(!overflow);
        assert!(outcomes.is_empty());

        let (outcomes, overflow) = buf.process(b"\nhelloo\n");
        assert!(!overflow);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].text, vec![b'x'; 2040]);
        assert_eq!(outcomes[1].text, b"helloo");
    }

    #[test]
    fn test_empty_line_produces_no_echo_text() {
        let mut buf = LineBuffer::new();
        let (outcomes, _) = buf.process(b"\n");
        assert_eq!(outcomes[0].text, Vec::<u8>::new());
        assert_eq!(outcomes[0].echo, Vec::<u8>::new());
    }
}
