//! End-to-end Telnet protocol tests driving the real servers over loopback
//! TCP, covering the negotiation handshake and both input processors.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use telnetd::server::run_session;
use telnetd::telnet::options::{iac, linemode, option};
use telnetd::Mode;

async fn spawn_session(mode: Mode) -> TcpStream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (stream, peer) = listener.accept().await.unwrap();
    tokio::spawn(run_session(stream, peer, mode, Duration::from_secs(3600)));
    client
}

async fn read_until(client: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
    let mut collected = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .expect("timed out waiting for data")
            .unwrap();
        assert_ne!(n, 0, "peer closed before {needle:?} was seen");
        collected.extend_from_slice(&buf[..n]);
        if collected.windows(needle.len()).any(|w| w == needle) {
            return collected;
        }
    }
}

// Scenario 1: connect to the character server, send "hi\r", observe the
// per-keystroke echo followed by the ECHO: line.
#[tokio::test]
async fn test_char_mode_echoes_keystrokes_then_line() {
    let mut client = spawn_session(Mode::Char).await;
    // drain negotiation + banner + ready banner before sending input.
    read_until(&mut client, b"*** READY! ***").await;

    client.write_all(b"hi\r").await.unwrap();
    let collected = read_until(&mut client, b"ECHO: hi\r\n").await;
    assert!(collected.windows(2).any(|w| w == b"hi"));
}

// Scenario 2: backspace erases the prior keystroke before the line is sent.
#[tokio::test]
async fn test_char_mode_backspace_erases_prior_byte() {
    let mut client = spawn_session(Mode::Char).await;
    read_until(&mut client, b"*** READY! ***").await;

    client.write_all(b"ab").await.unwrap();
    client.write_all(&[8]).await.unwrap(); // backspace
    client.write_all(b"c\r").await.unwrap();

    let collected = read_until(&mut client, b"ECHO: ac\r\n").await;
    assert!(collected.windows(3).any(|w| w == b"\x08 \x08"));
}

// Scenario 3: Ctrl+D says goodbye and the server closes its half of the
// connection.
#[tokio::test]
async fn test_char_mode_ctrl_d_says_goodbye_and_closes() {
    let mut client = spawn_session(Mode::Char).await;
    read_until(&mut client, b"*** READY! ***").await;

    client.write_all(&[4]).await.unwrap();
    read_until(&mut client, b"Goodbye!\r\n").await;

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0, "server should close its write half after Goodbye!");
}

// Scenario 4: the line-binary server's initial negotiation vector and
// single LINEMODE subnegotiation, and a mirroring peer reaching ready.
#[tokio::test]
async fn test_line_binary_negotiation_reaches_ready_once() {
    let mut client = spawn_session(Mode::LineBinary).await;

    let mut collected = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        collected.extend_from_slice(&buf[..n]);
        if collected
            .windows(b"*** READY! (BINARY mode active) ***".len())
            .any(|w| w == b"*** READY! (BINARY mode active) ***")
        {
            break;
        }
    }

    assert!(collected
        .windows(3)
        .any(|w| w == [iac::IAC, iac::DO, option::BINARY]));
    assert!(collected
        .windows(3)
        .any(|w| w == [iac::IAC, iac::DO, option::LINEMODE]));
    assert!(collected
        .windows(3)
        .any(|w| w == [iac::IAC, iac::WONT, option::ECHO]));
    assert!(collected.windows(7).any(|w| w
        == [
            iac::IAC,
            iac::SB,
            option::LINEMODE,
            linemode::LM_MODE,
            linemode::MODE_EDIT,
            iac::IAC,
            iac::SE,
        ]));

    // Only one ready banner even if the peer mirrors every WILL with DO.
    let ready_count = collected
        .windows(b"*** READY!".len())
        .filter(|w| *w == b"*** READY!")
        .count();
    assert_eq!(ready_count, 1);
}

// Scenario 5: a UTF-8 line is echoed back intact once its terminator
// arrives, even when the multi-byte codepoint is not split by our writes.
#[tokio::test]
async fn test_line_binary_echoes_utf8_line() {
    let mut client = spawn_session(Mode::LineBinary).await;
    read_until(&mut client, b"*** READY!").await;

    client.write_all("café\n".as_bytes()).await.unwrap();
    let collected = read_until(&mut client, "ECHO: café\r\n".as_bytes()).await;
    assert!(collected
        .windows("café".len())
        .any(|w| w == "café".as_bytes()));
}

// The input itself is split across two writes to exercise the UTF-8
// boundary hold-out across separate socket reads.
#[tokio::test]
async fn test_line_binary_echoes_utf8_split_across_reads() {
    let mut client = spawn_session(Mode::LineBinary).await;
    read_until(&mut client, b"*** READY!").await;

    // U+AC00 (가) = EA B0 80, split after two bytes.
    client.write_all(&[0xEA, 0xB0]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.write_all(&[0x80, b'\n']).await.unwrap();

    let needle = [0xEA, 0xB0, 0x80, b'\r', b'\n'];
    let collected = read_until(&mut client, &needle).await;
    assert!(collected.windows(3).any(|w| w == [0xEA, 0xB0, 0x80]));
}

// Quit over the line-binary server closes the session after saying goodbye.
#[tokio::test]
async fn test_line_binary_quit_closes_session() {
    let mut client = spawn_session(Mode::LineBinary).await;
    read_until(&mut client, b"*** READY!").await;

    client.write_all(b"quit\r\n").await.unwrap();
    read_until(&mut client, b"Goodbye!\r\n").await;

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

// Line terminator equivalence: CRLF, LF, CR-NUL, and bare CR all resolve to
// the same echoed line.
#[tokio::test]
async fn test_line_binary_terminator_variants_all_echo_same_line() {
    for terminator in [&b"\r\n"[..], b"\n", b"\r\0"] {
        let mut client = spawn_session(Mode::LineBinary).await;
        read_until(&mut client, b"*** READY!").await;

        let mut line = b"abc".to_vec();
        line.extend_from_slice(terminator);
        client.write_all(&line).await.unwrap();

        let collected = read_until(&mut client, b"ECHO: abc\r\n").await;
        assert!(collected.windows(9).any(|w| w == b"ECHO: abc"));
    }
}
