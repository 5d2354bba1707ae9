//! Face-Verified Voting Service
//!
//! Voters log in with name + national ID (aadhar), submit a live capture, and
//! the vote is recorded only when the capture matches the reference photo
//! enrolled at startup. One vote per ID, held in memory.

pub mod admin;
pub mod api;
pub mod ballot;
pub mod config;
pub mod enrollment;
pub mod errors;
pub mod face;
pub mod registry;
pub mod server;
pub mod types;
pub mod verification;

// Re-export commonly used types
pub use errors::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the voting service
///
/// `RUST_LOG` takes precedence; otherwise the configured level applies to
/// this crate and the HTTP trace layer.
pub fn init(logging: &config::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("face_vote={0},tower_http={0}", logging.level).into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if logging.format == "compact" {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::internal(format!("Logging init failed: {e}")))?;

    tracing::info!("🗳️  Voting service v{} initialized", VERSION);
    Ok(())
}
