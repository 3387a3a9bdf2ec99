//! Deploy the Arc marketplace contract suite and record the result.
//!
//! Provisions the five contracts in dependency order, wires their
//! cross-references one transaction at a time, and writes a deployments
//! JSON under both a timestamped key and a per-chain "latest" key.

use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod endpoint;
mod error;
mod eth;
mod fees;
mod provision;
mod record;
mod retry;
mod wiring;


use config::{Cli, DeployConfig};
use endpoint::Endpoint;
use error::DeployError;
use eth::EthEndpoint;
use record::{DeploymentRecord, RecordedPaths};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = match DeployConfig::from_cli(cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cfg).await {
        Ok(paths) => {
            info!(
                timestamped = %paths.timestamped.display(),
                latest = %paths.latest.display(),
                "deployment recorded"
            );
            ExitCode::SUCCESS
        }
        // Distinct exit code: the contracts are live, only the record is missing.
        Err(err @ DeployError::Persistence(_)) => {
            error!("{err}");
            ExitCode::from(2)
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: &DeployConfig) -> Result<RecordedPaths, DeployError> {
    let endpoint = EthEndpoint::connect(cfg).await?;
    deploy(&endpoint, cfg).await
}

/// The full deployment sequence: provision, fee policy, wiring, record.
pub async fn deploy<E: Endpoint>(
    endpoint: &E,
    cfg: &DeployConfig,
) -> Result<RecordedPaths, DeployError> {
    let usdc = cfg.usdc.ok_or_else(|| {
        DeployError::Precondition(
            "USDC_TOKEN_ADDRESS is not set; the escrow cannot settle without it".into(),
        )
    })?;

    let network = endpoint.network();
    info!(
        network = %network.name,
        chain_id = network.chain_id,
        deployer = %endpoint.deployer(),
        "starting deployment"
    );

    let components = provision::provision_all(endpoint, cfg, usdc).await?;

    let suggestion = if cfg.explicit_fee.is_some() {
        None
    } else {
        endpoint.fee_suggestion().await
    };
    let fees = fees::compute_override(cfg.explicit_fee, suggestion);
    match &fees {
        Some(fees) => info!(
            max_fee_per_gas = %fees.max_fee_per_gas,
            max_priority_fee_per_gas = %fees.max_priority_fee_per_gas,
            "using fee override for wiring"
        ),
        None => info!("no fee override, wiring with network-default fees"),
    }

    wiring::wire_all(endpoint, cfg, &components, fees.as_ref()).await?;

    let record = DeploymentRecord::new(&network, endpoint.deployer(), usdc, &components);
    record::write_record(&record, &cfg.out_dir, &cfg.prefix)
}
