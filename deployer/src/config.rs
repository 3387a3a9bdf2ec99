//! The CLI surface and the run configuration built from it.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ethers::types::{Address, U256};
use ethers::utils::{parse_units, ParseUnits};

use crate::error::DeployError;
use crate::retry::{Backoff, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// RPC URL of the target endpoint.
    #[arg(long, env = "ARC_RPC_URL")]
    rpc_url: String,

    /// Path to a file containing the deployer private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
    private_key_path: Option<PathBuf>,

    /// Deployer private key (hex string, 0x...).
    #[arg(long, env = "ARC_PRIVATE_KEY", conflicts_with = "private_key_path")]
    private_key: Option<String>,

    /// Address of the USDC token the escrow settles against.
    #[arg(long, env = "USDC_TOKEN_ADDRESS")]
    usdc: Option<Address>,

    /// Network name recorded in the deployments JSON.
    #[arg(long, default_value = "arc")]
    network: String,

    /// Directory of compiled artifacts (one `{Role}.json` with abi + bytecode).
    #[arg(long, default_value = "artifacts")]
    artifacts_dir: PathBuf,

    /// Directory deployment records are written to.
    #[arg(long, default_value = "deployments")]
    out_dir: PathBuf,

    /// Filename prefix for deployment records.
    #[arg(long, default_value = "arc")]
    prefix: String,

    /// Fee ceiling in gwei; skips endpoint fee estimation entirely.
    #[arg(long, env = "ARC_TX_GWEI")]
    tx_gwei: Option<String>,

    /// Attempts per endpoint call before giving up.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles on every retry.
    #[arg(long, default_value_t = DEFAULT_BASE_DELAY_MS)]
    base_delay_ms: u64,

    /// Settling delay between consecutive transactions, in milliseconds.
    #[arg(long, default_value_t = 3_000)]
    settle_ms: u64,
}

/// Everything a run needs, resolved up front. Core logic never reads
/// environment variables or other ambient state.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub usdc: Option<Address>,
    pub network: String,
    pub artifacts_dir: PathBuf,
    pub out_dir: PathBuf,
    pub prefix: String,
    /// Operator fee ceiling in wei, already converted from gwei.
    pub explicit_fee: Option<U256>,
    pub backoff: Backoff,
    pub settle: Duration,
}

impl DeployConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, DeployError> {
        let private_key = match (cli.private_key, cli.private_key_path) {
            (Some(key), _) => key,
            (None, Some(path)) => fs::read_to_string(&path)
                .map_err(|err| {
                    DeployError::Precondition(format!(
                        "could not read key file {}: {err}",
                        path.display()
                    ))
                })?
                .trim()
                .to_string(),
            (None, None) => {
                return Err(DeployError::Precondition(
                    "missing deployer key: provide --private-key-path or --private-key \
                     (or set PRIV_KEY_PATH/ARC_PRIVATE_KEY)"
                        .into(),
                ))
            }
        };

        let explicit_fee = cli.tx_gwei.as_deref().map(parse_gwei).transpose()?;

        Ok(DeployConfig {
            rpc_url: cli.rpc_url,
            private_key,
            usdc: cli.usdc,
            network: cli.network,
            artifacts_dir: cli.artifacts_dir,
            out_dir: cli.out_dir,
            prefix: cli.prefix,
            explicit_fee,
            backoff: Backoff {
                max_attempts: cli.max_attempts,
                base_delay: Duration::from_millis(cli.base_delay_ms),
            },
            settle: Duration::from_millis(cli.settle_ms),
        })
    }
}

fn parse_gwei(value: &str) -> Result<U256, DeployError> {
    match parse_units(value, "gwei") {
        Ok(ParseUnits::U256(wei)) => Ok(wei),
        Ok(ParseUnits::I256(_)) => Err(DeployError::Precondition(format!(
            "fee override must be non-negative, got {value}"
        ))),
        Err(err) => Err(DeployError::Precondition(format!(
            "invalid gwei value {value:?}: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gwei_values_convert_to_wei() {
        assert_eq!(parse_gwei("10").unwrap(), U256::from(10_000_000_000u64));
        assert_eq!(parse_gwei("0.5").unwrap(), U256::from(500_000_000u64));
    }

    #[test]
    fn malformed_gwei_is_a_precondition_failure() {
        assert!(matches!(
            parse_gwei("not-a-number"),
            Err(DeployError::Precondition(_))
        ));
    }
}
