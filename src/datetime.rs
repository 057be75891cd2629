//! Timestamp formatting for telnetd.

use chrono::Local;

/// Format the current local time as `YYYY-MM-DD HH:MM:SS`, matching the
/// bracketed prefix used both in the in-band timestamp banner and in
/// console log lines.
pub fn format_now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
