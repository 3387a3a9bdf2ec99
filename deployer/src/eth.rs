//! `ethers`-backed endpoint binding.
//!
//! Everything the orchestrator treats as opaque lives here: artifact
//! loading, transaction construction, receipt handling, and the mapping of
//! provider failures onto the transient/fatal taxonomy.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;

use anyhow::Context;
use async_trait::async_trait;
use ethers::abi::{Abi, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionReceipt, U64};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::config::DeployConfig;
use crate::endpoint::{
    ComponentHandle, Endpoint, FeeSuggestion, NetworkInfo, PendingComponent, Role,
};
use crate::error::{DeployError, EndpointError};
use crate::fees::FeeOverride;

/// Compiled contract artifact, in the layout hardhat emits.
#[derive(Debug, Clone, Deserialize)]
struct Artifact {
    abi: Abi,
    bytecode: Bytes,
}

pub struct EthEndpoint {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    network: NetworkInfo,
    artifacts: HashMap<Role, Artifact>,
}

impl EthEndpoint {
    /// Connect to the configured endpoint, bind the deployer key to its
    /// chain id, and load all five artifacts up front so a missing file
    /// fails the run before anything is submitted.
    pub async fn connect(cfg: &DeployConfig) -> Result<Self, DeployError> {
        let provider = Provider::<Http>::try_from(cfg.rpc_url.as_str()).map_err(|err| {
            DeployError::Precondition(format!("invalid RPC URL {:?}: {err}", cfg.rpc_url))
        })?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|err| {
                DeployError::Precondition(format!("could not reach {}: {err}", cfg.rpc_url))
            })?
            .as_u64();

        let wallet: LocalWallet = cfg
            .private_key
            .parse()
            .map_err(|err| DeployError::Precondition(format!("invalid deployer key: {err}")))?;
        let client = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id));

        let mut artifacts = HashMap::new();
        for role in Role::ALL {
            artifacts.insert(role, load_artifact(cfg, role)?);
        }

        Ok(EthEndpoint {
            client,
            network: NetworkInfo {
                name: cfg.network.clone(),
                chain_id,
            },
            artifacts,
        })
    }

    fn artifact(&self, role: Role) -> Result<&Artifact, EndpointError> {
        self.artifacts
            .get(&role)
            .ok_or_else(|| EndpointError::Call(format!("no artifact loaded for {role}")))
    }
}

fn load_artifact(cfg: &DeployConfig, role: Role) -> Result<Artifact, DeployError> {
    let path = cfg.artifacts_dir.join(format!("{role}.json"));
    let load = || -> anyhow::Result<Artifact> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", path.display()))
    };
    load().map_err(|err| DeployError::Precondition(format!("{err:#}")))
}

#[async_trait]
impl Endpoint for EthEndpoint {
    fn deployer(&self) -> Address {
        self.client.signer().address()
    }

    fn network(&self) -> NetworkInfo {
        self.network.clone()
    }

    async fn fee_suggestion(&self) -> Option<FeeSuggestion> {
        match self.client.estimate_eip1559_fees(None).await {
            Ok((max_fee_per_gas, max_priority_fee_per_gas)) => Some(FeeSuggestion {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            }),
            Err(err) => {
                warn!(error = %err, "fee estimation unavailable, proceeding with network defaults");
                None
            }
        }
    }

    async fn create(
        &self,
        role: Role,
        args: Vec<Address>,
    ) -> Result<PendingComponent, EndpointError> {
        let artifact = self.artifact(role)?;
        let tokens: Vec<Token> = args.into_iter().map(Token::Address).collect();

        let data = match artifact.abi.constructor() {
            Some(constructor) => constructor
                .encode_input(artifact.bytecode.to_vec(), &tokens)
                .map_err(|err| {
                    EndpointError::Call(format!("{role} constructor encoding failed: {err}"))
                })?,
            None if tokens.is_empty() => artifact.bytecode.to_vec(),
            None => {
                return Err(EndpointError::Call(format!(
                    "{role} ABI has no constructor but {} arguments were supplied",
                    tokens.len()
                )))
            }
        };

        let tx = Eip1559TransactionRequest::new().data(data);
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify)?;
        Ok(PendingComponent { role, tx: *pending })
    }

    async fn confirm(&self, pending: &PendingComponent) -> Result<ComponentHandle, EndpointError> {
        let receipt = PendingTransaction::new(pending.tx, self.client.provider())
            .await
            .map_err(classify)?
            .ok_or_else(|| {
                EndpointError::Call(format!("{} creation dropped from the mempool", pending.role))
            })?;
        check_status(&receipt, &pending.role.to_string())?;

        let address = receipt.contract_address.ok_or_else(|| {
            EndpointError::Call(format!("{} receipt carries no contract address", pending.role))
        })?;

        Ok(ComponentHandle {
            role: pending.role,
            address,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    async fn invoke(
        &self,
        target: &ComponentHandle,
        method: &'static str,
        args: Vec<Address>,
        fees: Option<&FeeOverride>,
    ) -> Result<(), EndpointError> {
        let artifact = self.artifact(target.role)?;
        let function = artifact.abi.function(method).map_err(|err| {
            EndpointError::Call(format!("{}.{method} not in ABI: {err}", target.role))
        })?;

        let tokens: Vec<Token> = args.into_iter().map(Token::Address).collect();
        let data = function.encode_input(&tokens).map_err(|err| {
            EndpointError::Call(format!(
                "{}.{method} argument encoding failed: {err}",
                target.role
            ))
        })?;

        let mut tx = Eip1559TransactionRequest::new()
            .to(target.address)
            .data(data);
        if let Some(fees) = fees {
            tx = tx
                .max_fee_per_gas(fees.max_fee_per_gas)
                .max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        }

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify)?;
        let receipt = pending.await.map_err(classify)?.ok_or_else(|| {
            EndpointError::Call(format!(
                "{}.{method} dropped from the mempool",
                target.role
            ))
        })?;
        check_status(&receipt, &format!("{}.{method}", target.role))
    }
}

fn check_status(receipt: &TransactionReceipt, what: &str) -> Result<(), EndpointError> {
    if receipt.status == Some(U64::from(1)) {
        Ok(())
    } else {
        Err(EndpointError::Call(format!(
            "{what} reverted in block {:?}",
            receipt.block_number
        )))
    }
}

/// Sort a provider failure into the retryable bucket or the fatal bucket by
/// the message the endpoint surfaced.
fn classify(err: impl Display) -> EndpointError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("too many requests") || lower.contains("rate limit") {
        EndpointError::RateLimited(message)
    } else if lower.contains("connection reset") || lower.contains("econnreset") {
        EndpointError::ConnectionReset(message)
    } else if lower.contains("timed out") || lower.contains("timeout") || lower.contains("etimedout")
    {
        EndpointError::TimedOut(message)
    } else {
        EndpointError::Call(message)
    }
}
