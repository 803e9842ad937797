//! Command-line arguments for the server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use turbo_coordination::TurboConfig;

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// TOML file with turbo tunables (TURBO_* environment variables override it)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to RocksDB state directory for durable sessions (requires heavy-state)
    #[arg(long)]
    pub state_path: Option<PathBuf>,

    /// Leave timed transitions to clients instead of the built-in scheduler
    #[arg(long, default_value_t = false)]
    pub no_scheduler: bool,

    /// Sprint length in seconds (overrides TURBO_SPRINT_DURATION_SECS)
    #[arg(long)]
    pub sprint_secs: Option<u64>,

    /// Briefing countdown in seconds (overrides TURBO_BRIEFING_DELAY_SECS)
    #[arg(long)]
    pub briefing_secs: Option<u64>,
}

impl ServerArgs {
    /// Resolve the turbo config: file, then environment, then flags
    pub fn turbo_config(&self) -> Result<TurboConfig> {
        let base = match &self.config {
            Some(path) => TurboConfig::load(path)?,
            None => TurboConfig::default(),
        };
        let mut config = base.with_env_overrides();

        if let Some(secs) = self.sprint_secs {
            config.sprint_duration_secs = secs;
        }
        if let Some(secs) = self.briefing_secs {
            config.briefing_delay_secs = secs;
        }
        if self.no_scheduler {
            config.auto_advance = false;
        }

        config.validate()?;
        Ok(config)
    }
}
