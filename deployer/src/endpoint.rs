//! The seam between the orchestrator and the network.

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::EndpointError;
use crate::fees::FeeOverride;

/// The five contracts of a marketplace deployment, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Role {
    JobRegistry,
    ReputationToken,
    Escrow,
    OrderBook,
    AgentRegistry,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::JobRegistry,
        Role::ReputationToken,
        Role::Escrow,
        Role::OrderBook,
        Role::AgentRegistry,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Role::JobRegistry => "JobRegistry",
            Role::ReputationToken => "ReputationToken",
            Role::Escrow => "Escrow",
            Role::OrderBook => "OrderBook",
            Role::AgentRegistry => "AgentRegistry",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A creation submitted to the endpoint but not yet finalized.
#[derive(Debug, Clone)]
pub struct PendingComponent {
    pub role: Role,
    pub tx: TxHash,
}

/// A finalized contract, owned by the run for its lifetime.
#[derive(Debug, Clone)]
pub struct ComponentHandle {
    pub role: Role,
    pub address: Address,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
}

/// Endpoint-suggested EIP-1559 fees. Absent whenever the endpoint cannot
/// produce both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSuggestion {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Remote operations the orchestrator depends on, implemented over a real
/// JSON-RPC endpoint in production and by a scripted mock in tests.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Submitter identity; also the owner passed to every constructor.
    fn deployer(&self) -> Address;

    /// Network name and chain id, resolved when the endpoint was set up.
    fn network(&self) -> NetworkInfo;

    /// Current fee estimate, or `None` when unavailable.
    async fn fee_suggestion(&self) -> Option<FeeSuggestion>;

    /// Submit the creation of `role` with the given constructor arguments.
    async fn create(&self, role: Role, args: Vec<Address>)
        -> Result<PendingComponent, EndpointError>;

    /// Block until a pending creation is durably finalized.
    async fn confirm(&self, pending: &PendingComponent) -> Result<ComponentHandle, EndpointError>;

    /// Call a setter on a finalized contract and wait for it to settle.
    async fn invoke(
        &self,
        target: &ComponentHandle,
        method: &'static str,
        args: Vec<Address>,
        fees: Option<&FeeOverride>,
    ) -> Result<(), EndpointError>;
}
