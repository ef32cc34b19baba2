//! # Directory Runtime
//!
//! Serves newline-delimited JSON requests from stdin, one response line per
//! request on stdout. Logs go to stderr.
//!
//! Set `PKD_PRODUCTION=1` to refuse to start with an insecure configuration.

use anyhow::{Context, Result};
use pkd_runtime::container::{DirectoryConfig, DirectoryContainer};
use pkd_runtime::handler::RequestHandler;
use pkd_runtime::telemetry::init_logging;
use std::io::{BufRead, Write};
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = DirectoryConfig::from_env().context("loading configuration")?;
    init_logging(&config.log)?;

    match config.validate_for_production() {
        Ok(()) => {}
        Err(e) if std::env::var_os("PKD_PRODUCTION").is_some() => {
            return Err(e).context("production configuration check");
        }
        Err(e) => warn!(error = %e, "[runtime] configuration is not production-ready"),
    }

    info!("===========================================");
    info!("  Public Key Directory v{}", env!("CARGO_PKG_VERSION"));
    info!("  Hostname: {}", config.hostname);
    info!("===========================================");

    let container = DirectoryContainer::new(config).context("building subsystems")?;
    let handler = RequestHandler::new(&container);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handler.handle(&line);
        writeln!(stdout, "{response}").context("writing response")?;
        stdout.flush()?;
    }

    info!("[runtime] input closed, shutting down");
    Ok(())
}
