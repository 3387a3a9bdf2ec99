//! Wires cross-references between already-provisioned contracts.

use tokio::time::sleep;
use tracing::info;

use crate::config::DeployConfig;
use crate::endpoint::{Endpoint, Role};
use crate::error::DeployError;
use crate::fees::FeeOverride;
use crate::provision::ComponentSet;

/// The nine cross-references, as (target, setter, argument).
///
/// All nine come from the same submitter identity, and the endpoint rejects
/// out-of-order submissions from a single identity, so the order is fixed
/// and the calls go out one at a time.
pub const WIRING_PLAN: [(Role, &str, Role); 9] = [
    (Role::JobRegistry, "setOrderBook", Role::OrderBook),
    (Role::Escrow, "setOrderBook", Role::OrderBook),
    (Role::Escrow, "setReputation", Role::ReputationToken),
    (Role::ReputationToken, "setEscrow", Role::Escrow),
    (Role::ReputationToken, "setAgentRegistry", Role::AgentRegistry),
    (Role::AgentRegistry, "setReputationOracle", Role::ReputationToken),
    (Role::OrderBook, "setEscrow", Role::Escrow),
    (Role::OrderBook, "setReputationToken", Role::ReputationToken),
    (Role::OrderBook, "setAgentRegistry", Role::AgentRegistry),
];

/// Issue the nine setter calls strictly sequentially, each retried and
/// carrying the run's fee override. A fatal failure aborts the remainder;
/// already-applied references stay in place.
pub async fn wire_all<E: Endpoint>(
    endpoint: &E,
    cfg: &DeployConfig,
    components: &ComponentSet,
    fees: Option<&FeeOverride>,
) -> Result<(), DeployError> {
    for (target, method, arg) in WIRING_PLAN {
        let handle = components.handle(target);
        let arg_address = components.address_of(arg);

        info!(%target, method, argument = %arg, "wiring cross-reference");
        cfg.backoff
            .execute(method, || {
                endpoint.invoke(handle, method, vec![arg_address], fees)
            })
            .await
            .map_err(|source| DeployError::Wiring {
                target,
                method,
                source,
            })?;

        if !cfg.settle.is_zero() {
            sleep(cfg.settle).await;
        }
    }
    Ok(())
}
