//! Tunables for turbo sessions
//!
//! Defaults match the production rules. Values may be loaded from a TOML
//! file and overridden by `TURBO_*` environment variables.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use super::benchmark::QuorumRule;

/// Configuration shared by the coordinator, session actors and scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboConfig {
    /// Countdown between briefing and sprint
    pub briefing_delay_secs: u64,
    /// Length of the swiping sprint
    pub sprint_duration_secs: u64,
    /// Swipes a member needs before counting toward quorum and majority
    pub quorum_min_swipes: u32,
    /// Counted members needed before the benchmark can fire
    pub quorum_min_members: u32,
    /// Benchmark threshold as a whole percentage
    pub benchmark_percent: u32,
    /// Reload-and-retry attempts when a commit loses a revision race
    pub max_commit_retries: u32,
    /// Idle time before a session actor shuts down
    pub actor_idle_timeout_secs: u64,
    /// Let the phase scheduler drive timed transitions
    pub auto_advance: bool,
}

impl Default for TurboConfig {
    fn default() -> Self {
        Self {
            briefing_delay_secs: 15,
            sprint_duration_secs: 120,
            quorum_min_swipes: 3,
            quorum_min_members: 2,
            benchmark_percent: 80,
            max_commit_retries: 5,
            actor_idle_timeout_secs: 300,
            auto_advance: true,
        }
    }
}

impl TurboConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load from a TOML file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse turbo config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TurboConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TURBO_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = env_parse("TURBO_BRIEFING_DELAY_SECS") {
            self.briefing_delay_secs = n;
        }
        if let Some(n) = env_parse("TURBO_SPRINT_DURATION_SECS") {
            self.sprint_duration_secs = n;
        }
        if let Some(n) = env_parse("TURBO_QUORUM_MIN_SWIPES") {
            self.quorum_min_swipes = n;
        }
        if let Some(n) = env_parse("TURBO_QUORUM_MIN_MEMBERS") {
            self.quorum_min_members = n;
        }
        if let Some(n) = env_parse("TURBO_BENCHMARK_PERCENT") {
            self.benchmark_percent = n;
        }
        if let Some(n) = env_parse("TURBO_MAX_COMMIT_RETRIES") {
            self.max_commit_retries = n;
        }
        if let Some(n) = env_parse("TURBO_ACTOR_IDLE_TIMEOUT_SECS") {
            self.actor_idle_timeout_secs = n;
        }
        if let Ok(val) = std::env::var("TURBO_AUTO_ADVANCE") {
            self.auto_advance = val.to_lowercase() == "true" || val == "1";
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=100).contains(&self.benchmark_percent),
            "benchmark_percent must be within 1..=100, got {}",
            self.benchmark_percent
        );
        ensure!(
            self.quorum_min_members >= 1,
            "quorum_min_members must be at least 1"
        );
        ensure!(
            self.actor_idle_timeout_secs >= 1,
            "actor_idle_timeout_secs must be at least 1"
        );
        Ok(())
    }

    pub fn briefing_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(clamp_secs(self.briefing_delay_secs))
    }

    pub fn sprint_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(clamp_secs(self.sprint_duration_secs))
    }

    pub fn actor_idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.actor_idle_timeout_secs)
    }

    /// The quorum rule the benchmark monitor evaluates
    pub fn quorum_rule(&self) -> QuorumRule {
        QuorumRule {
            min_swipes: self.quorum_min_swipes,
            min_members: self.quorum_min_members,
            percent: self.benchmark_percent,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Phase timers are capped at a year so deadline arithmetic cannot overflow
const MAX_PHASE_SECS: u64 = 365 * 24 * 60 * 60;

fn clamp_secs(secs: u64) -> i64 {
    secs.min(MAX_PHASE_SECS) as i64
}
