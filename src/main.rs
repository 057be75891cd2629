//! telnetd binary entrypoint.
//!
//! Binds the character-mode and line-binary listeners from [`Config`] and
//! runs their accept loops concurrently until a shutdown signal arrives.
//! Process supervision, signal plumbing, and log formatting live here,
//! outside the session engine in `telnetd::server`/`telnetd::telnet`.

use std::time::Duration;

use tokio::signal;
use tracing::{debug, error, info};

use telnetd::server::{run_session, TelnetServer};
use telnetd::telnet::Mode;
use telnetd::{accept_client, Config};

#[tokio::main]
async fn main() {
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config.toml: {e}");
            eprintln!("using default configuration");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    }

    if let Err(e) = telnetd::logging::init(&config.logging) {
        eprintln!("failed to initialize logging: {e}");
        telnetd::logging::init_console_only(&config.logging.level);
    }

    info!("telnetd starting");

    let char_server = match TelnetServer::bind(
        &config.server.host,
        config.server.char_port,
        config.server.max_connections,
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind character-mode server: {e}");
            std::process::exit(1);
        }
    };

    let line_server = match TelnetServer::bind(
        &config.server.host,
        config.server.line_port,
        config.server.max_connections,
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind line-binary server: {e}");
            std::process::exit(1);
        }
    };

    let timestamp_interval = Duration::from_secs(config.server.timestamp_interval_secs);

    let char_task = tokio::spawn(accept_loop(
        char_server,
        Mode::Char,
        config.server.char_port,
        timestamp_interval,
    ));
    let line_task = tokio::spawn(accept_loop(
        line_server,
        Mode::LineBinary,
        config.server.line_port,
        timestamp_interval,
    ));

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
        }
        res = char_task => {
            if let Err(e) = res {
                error!("character-mode accept loop terminated: {e}");
            }
        }
        res = line_task => {
            if let Err(e) = res {
                error!("line-binary accept loop terminated: {e}");
            }
        }
    }
}

/// Accept loop for one listener: admits or rejects each peer via
/// [`accept_client`], then spawns an isolated session task per connection.
async fn accept_loop(server: TelnetServer, mode: Mode, port: u16, timestamp_interval: Duration) {
    loop {
        match server.accept().await {
            Ok((stream, addr, permit)) => {
                if !accept_client(addr.ip(), port) {
                    debug!(peer = %addr, port, "connection refused by access-control hook");
                    continue;
                }
                info!(peer = %addr, mode = ?mode, "connection accepted");
                tokio::spawn(async move {
                    run_session(stream, addr, mode, timestamp_interval).await;
                    drop(permit);
                });
            }
            Err(e) => {
                error!("accept error on port {port}: {e}");
            }
        }
    }
}
