//! Command line and config struct definitions for the client core

use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use url::Url;

/// The default base URL of the shield/proof/relay service
const DEFAULT_SERVICE_URL: &str = "http://localhost:8000/api/v1";
/// The default ledger RPC endpoint
const DEFAULT_RPC_URL: &str = "http://localhost:8899";
/// The default number of send attempts for an on-chain submission
const DEFAULT_MAX_SEND_RETRIES: usize = 3;
/// The default interval between proof status probes in milliseconds
const DEFAULT_PROOF_POLL_INTERVAL_MS: u64 = 1_000;
/// The default wall-clock budget for proof generation in milliseconds
const DEFAULT_PROOF_TIMEOUT_MS: u64 = 120_000; // 2 minutes
/// The default wall-clock budget for transaction confirmation in
/// milliseconds
const DEFAULT_CONFIRM_TIMEOUT_MS: u64 = 60_000; // 1 minute

// -------
// | CLI |
// -------

/// Defines the client core command line interface
#[derive(Debug, Parser, Serialize, Deserialize)]
#[clap(author, about, long_about = None)]
pub struct Cli {
    // -------------
    // | Endpoints |
    // -------------
    /// The base URL of the shield/proof/relay service
    #[clap(long, default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,
    /// The ledger RPC endpoint used for submission and confirmation
    #[clap(long, default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    // ------------------------
    // | Retries and Timeouts |
    // ------------------------
    /// The maximum number of send attempts for an on-chain submission
    #[clap(long, default_value_t = DEFAULT_MAX_SEND_RETRIES)]
    pub max_send_retries: usize,
    /// The interval between proof status probes, in milliseconds
    #[clap(long, default_value_t = DEFAULT_PROOF_POLL_INTERVAL_MS)]
    pub proof_poll_interval_ms: u64,
    /// The wall-clock budget for proof generation, in milliseconds
    #[clap(long, default_value_t = DEFAULT_PROOF_TIMEOUT_MS)]
    pub proof_timeout_ms: u64,
    /// The wall-clock budget for transaction confirmation, in milliseconds
    #[clap(long, default_value_t = DEFAULT_CONFIRM_TIMEOUT_MS)]
    pub confirm_timeout_ms: u64,

    // -----------
    // | Storage |
    // -----------
    /// The path at which the local position record is persisted; in-memory
    /// only when unset
    #[clap(long)]
    pub storage_path: Option<String>,

    // -------------
    // | Telemetry |
    // -------------
    /// Enable verbose (debug) logging
    #[clap(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse the CLI into a validated config
    pub fn into_config(self) -> Result<Config, String> {
        let service_url = Url::parse(&self.service_url)
            .map_err(|e| format!("invalid service url: {e}"))?;
        let rpc_url =
            Url::parse(&self.rpc_url).map_err(|e| format!("invalid rpc url: {e}"))?;

        Ok(Config {
            service_url,
            rpc_url,
            max_send_retries: self.max_send_retries,
            proof_poll_interval: Duration::from_millis(self.proof_poll_interval_ms),
            proof_timeout: Duration::from_millis(self.proof_timeout_ms),
            confirm_timeout: Duration::from_millis(self.confirm_timeout_ms),
            storage_path: self.storage_path,
            verbose: self.verbose,
        })
    }
}

// ----------
// | Config |
// ----------

/// The validated runtime configuration for the client core
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// The base URL of the shield/proof/relay service
    pub service_url: Url,
    /// The ledger RPC endpoint used for submission and confirmation
    pub rpc_url: Url,
    /// The maximum number of send attempts for an on-chain submission
    pub max_send_retries: usize,
    /// The interval between proof status probes
    pub proof_poll_interval: Duration,
    /// The wall-clock budget for proof generation
    pub proof_timeout: Duration,
    /// The wall-clock budget for transaction confirmation
    pub confirm_timeout: Duration,
    /// The path at which the local position record is persisted
    pub storage_path: Option<String>,
    /// Whether verbose logging is enabled
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: Url::parse(DEFAULT_SERVICE_URL).unwrap(),
            rpc_url: Url::parse(DEFAULT_RPC_URL).unwrap(),
            max_send_retries: DEFAULT_MAX_SEND_RETRIES,
            proof_poll_interval: Duration::from_millis(DEFAULT_PROOF_POLL_INTERVAL_MS),
            proof_timeout: Duration::from_millis(DEFAULT_PROOF_TIMEOUT_MS),
            confirm_timeout: Duration::from_millis(DEFAULT_CONFIRM_TIMEOUT_MS),
            storage_path: None,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::{Cli, Config};

    /// Parsing with no flags yields the defaults
    #[test]
    fn test_default_cli() {
        let cli = Cli::parse_from(["veil"]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.max_send_retries, 3);
        assert_eq!(config.proof_poll_interval.as_millis(), 1_000);
        assert!(config.storage_path.is_none());
    }

    /// An invalid endpoint is rejected at parse time
    #[test]
    fn test_invalid_url() {
        let cli = Cli::parse_from(["veil", "--service-url", "not a url"]);
        assert!(cli.into_config().is_err());
    }

    /// The config round trips through serde
    #[test]
    fn test_config_serde_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.max_send_retries, config.max_send_retries);
        assert_eq!(parsed.service_url, config.service_url);
    }
}
