//! On-disk form of an exchange: TOML configuration in, JSON snapshot of
//! configuration plus pool state kept between invocations.

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use lotswap::{Exchange, ExchangeConfig, ExchangeState, RecordingLedger};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: ExchangeConfig,
    #[serde(default)]
    pub state: ExchangeState,
}

impl Snapshot {
    pub fn new(config: ExchangeConfig) -> Self {
        Self { config, state: ExchangeState::default() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| {
            format!(
                "Cannot read snapshot '{}'.\n  Run `lotswap init --config <TOML>` to create one.",
                path.display()
            )
        })?;
        serde_json::from_str(&raw).with_context(|| format!("Snapshot '{}' is not valid", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("Cannot write snapshot '{}'", path.display()))?;
        debug!(path = %path.display(), pools = self.state.pools().count(), "Snapshot written");
        Ok(())
    }

    /// Open the exchange this snapshot describes, settling through an
    /// in-memory ledger.
    pub fn open(self, ledger: RecordingLedger) -> Result<Exchange<RecordingLedger>> {
        Exchange::with_state(self.config, self.state, ledger)
            .map_err(|e| anyhow!("Snapshot configuration rejected: {e}"))
    }

    pub fn from_exchange(exchange: Exchange<RecordingLedger>) -> (Self, RecordingLedger) {
        let (config, state, ledger) = exchange.into_parts();
        (Self { config, state }, ledger)
    }
}

/// Read and validate an exchange configuration from TOML.
pub fn load_config(path: &Path) -> Result<ExchangeConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config '{}'", path.display()))?;
    let config: ExchangeConfig =
        toml::from_str(&raw).with_context(|| format!("Config '{}' is not valid TOML", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow!("Config '{}' rejected: {e}", path.display()))?;
    Ok(config)
}
