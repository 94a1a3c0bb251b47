//! Tracing setup shared by the binaries
//!
//! Warnings and errors go to stderr, everything else to stdout.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Install the global subscriber
pub fn init(level: Level) -> Result<()> {
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
