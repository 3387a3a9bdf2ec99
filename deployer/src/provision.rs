//! Creates the five contracts in dependency order.

use ethers::types::Address;
use tokio::time::sleep;
use tracing::info;

use crate::config::DeployConfig;
use crate::endpoint::{ComponentHandle, Endpoint, Role};
use crate::error::DeployError;

/// Handles for all five contracts. Construction guarantees every role is
/// present exactly once.
#[derive(Debug, Clone)]
pub struct ComponentSet {
    pub job_registry: ComponentHandle,
    pub reputation_token: ComponentHandle,
    pub escrow: ComponentHandle,
    pub order_book: ComponentHandle,
    pub agent_registry: ComponentHandle,
}

impl ComponentSet {
    pub fn handle(&self, role: Role) -> &ComponentHandle {
        match role {
            Role::JobRegistry => &self.job_registry,
            Role::ReputationToken => &self.reputation_token,
            Role::Escrow => &self.escrow,
            Role::OrderBook => &self.order_book,
            Role::AgentRegistry => &self.agent_registry,
        }
    }

    pub fn address_of(&self, role: Role) -> Address {
        self.handle(role).address
    }
}

/// Create and confirm each contract, one at a time. The order is fixed by
/// their constructor dependencies: OrderBook consumes JobRegistry's
/// resolved address.
pub async fn provision_all<E: Endpoint>(
    endpoint: &E,
    cfg: &DeployConfig,
    usdc: Address,
) -> Result<ComponentSet, DeployError> {
    let deployer = endpoint.deployer();

    let job_registry = provision_one(endpoint, cfg, Role::JobRegistry, vec![deployer]).await?;
    let reputation_token =
        provision_one(endpoint, cfg, Role::ReputationToken, vec![deployer]).await?;
    let escrow = provision_one(endpoint, cfg, Role::Escrow, vec![deployer, usdc, deployer]).await?;
    let order_book = provision_one(
        endpoint,
        cfg,
        Role::OrderBook,
        vec![deployer, job_registry.address],
    )
    .await?;
    let agent_registry = provision_one(endpoint, cfg, Role::AgentRegistry, vec![deployer]).await?;

    Ok(ComponentSet {
        job_registry,
        reputation_token,
        escrow,
        order_book,
        agent_registry,
    })
}

async fn provision_one<E: Endpoint>(
    endpoint: &E,
    cfg: &DeployConfig,
    role: Role,
    args: Vec<Address>,
) -> Result<ComponentHandle, DeployError> {
    info!(%role, "creating contract");

    let pending = cfg
        .backoff
        .execute("create", || endpoint.create(role, args.clone()))
        .await
        .map_err(|source| DeployError::Provision { role, source })?;
    let handle = cfg
        .backoff
        .execute("confirm", || endpoint.confirm(&pending))
        .await
        .map_err(|source| DeployError::Provision { role, source })?;

    info!(%role, address = %handle.address, finalized_at = %handle.created_at, "contract finalized");

    if !cfg.settle.is_zero() {
        sleep(cfg.settle).await;
    }
    Ok(handle)
}
