//! Periodic timestamp emitter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use super::writer::Writer;
use crate::datetime::format_now;

/// One-shot, monotonic stop signal shared between a session's reader and
/// its timestamp emitter.
#[derive(Default)]
pub struct StopFlag {
    flag: AtomicBool,
    notify: Notify,
}

impl StopFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set the flag and wake any task waiting in [`StopFlag::wait`].
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve immediately if already stopped, otherwise wait for [`stop`].
    pub async fn wait(&self) {
        if self.is_stopped() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Spawn the periodic timestamp task for one connection. It checks the stop
/// flag before and after each sleep and exits promptly on a stop signal or a
/// write failure, rather than only at the next scheduled tick.
pub fn spawn(writer: Arc<Writer>, stop: Arc<StopFlag>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if stop.is_stopped() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.wait() => break,
            }

            if stop.is_stopped() {
                break;
            }

            let line = format!("\r\n[TIMESTAMP] {}\r\n", format_now());
            if writer.write_all(line.as_bytes()).await.is_err() {
                debug!("timestamp emitter exiting: write failed");
                break;
            }
        }
    })
}
