//! Session controller: glues the codec, negotiation state machine, input
//! processor, and timestamp emitter together for one connection.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{info, warn};
use uuid::Uuid;

use super::char_input::{CharOutcome, EditBuffer};
use super::line_input::LineBuffer;
use super::timestamp;
use super::writer::Writer;
use crate::telnet::codec::TelnetDecoder;
use crate::telnet::negotiation::{Mode, Negotiation};

const READ_CHUNK: usize = 1024;

const CHAR_BANNER: &str = "Welcome to Character Mode Echo Server (Port 9092)\r\n\
Each character is echoed immediately as you type.\r\n\
Press Ctrl+D or type 'quit' and Enter to disconnect.\r\n\
A timestamp will be sent every 10 seconds.\r\n\
Negotiating telnet options...\r\n\r\n";

const LINE_BANNER: &str = "Welcome to Line Mode Binary Echo Server (Port 9093)\r\n\
BINARY mode enabled for UTF-8 support.\r\n\
Type a line and press Enter to send it.\r\n\
Type 'quit' and Enter to disconnect.\r\n\
A timestamp will be sent every 10 seconds.\r\n\
Negotiating telnet options...\r\n\r\n";

/// Drive one connection end-to-end: negotiation, banner, timestamp task,
/// and the mode-specific input loop. Returns when the session ends, for any
/// reason (peer close, quit, Ctrl+D, or a fatal I/O error).
pub async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    mode: Mode,
    timestamp_interval: Duration,
) {
    let id = Uuid::new_v4();
    info!(session_id = %id, peer = %peer, mode = ?mode, "session started");

    let (mut read_half, write_half) = stream.into_split();
    let writer = Writer::new(write_half);

    let (mut negotiation, initial) = Negotiation::start(mode);
    if writer.write_all(&initial).await.is_err() {
        warn!(session_id = %id, "failed to write initial negotiation, closing session");
        return;
    }

    let banner = match mode {
        Mode::Char => CHAR_BANNER,
        Mode::LineBinary => LINE_BANNER,
    };
    if writer.write_all(banner.as_bytes()).await.is_err() {
        return;
    }

    let stop = timestamp::StopFlag::new();
    let ts_handle = timestamp::spawn(writer.clone(), stop.clone(), timestamp_interval);

    let mut decoder = TelnetDecoder::new();
    let mut char_buf = EditBuffer::new();
    let mut line_buf = LineBuffer::new();
    let mut read_buf = [0u8; READ_CHUNK];

    'session: loop {
        let n = match read_half.read(&mut read_buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(session_id = %id, error = %e, "read error, closing session");
                break;
            }
        };

        let (data, commands) = decoder.decode(&read_buf[..n]);

        for cmd in &commands {
            let reply = negotiation.handle(cmd);
            if !reply.is_empty() && writer.write_all(&reply).await.is_err() {
                break 'session;
            }
        }

        match mode {
            Mode::Char => {
                for byte in data {
                    match char_buf.process_byte(byte) {
                        CharOutcome::Echo(bytes) => {
                            if !bytes.is_empty() && writer.write_all(&bytes).await.is_err() {
                                break 'session;
                            }
                        }
                        CharOutcome::Line { echo, is_quit, .. } => {
                            if !echo.is_empty() && writer.write_all(&echo).await.is_err() {
                                break 'session;
                            }
                            if is_quit {
                                break 'session;
                            }
                        }
                        CharOutcome::Eof { echo } => {
                            let _ = writer.write_all(&echo).await;
                            break 'session;
                        }
                    }
                }
            }
            Mode::LineBinary => {
                let (outcomes, overflow) = line_buf.process(&data);
                if overflow {
                    warn!(session_id = %id, "line buffer overflow, discarding");
                }
                for outcome in outcomes {
                    if !outcome.echo.is_empty() && writer.write_all(&outcome.echo).await.is_err() {
                        break 'session;
                    }
                    if outcome.is_quit {
                        break 'session;
                    }
                }
            }
        }
    }

    stop.stop();
    let _ = ts_handle.await;
    info!(session_id = %id, peer = %peer, "session ended");
}
