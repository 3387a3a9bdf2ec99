use thiserror::Error;

use crate::endpoint::Role;

/// Failures surfaced by a single endpoint call.
///
/// The first three variants are transient and eligible for retry; everything
/// else settles the call immediately.
#[derive(Debug, Clone, Error)]
pub enum EndpointError {
    #[error("endpoint rate limited: {0}")]
    RateLimited(String),

    #[error("connection reset: {0}")]
    ConnectionReset(String),

    #[error("call timed out: {0}")]
    TimedOut(String),

    #[error("call failed: {0}")]
    Call(String),

    /// The attempt budget was consumed without a classifiable settlement.
    #[error("gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl EndpointError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EndpointError::RateLimited(_)
                | EndpointError::ConnectionReset(_)
                | EndpointError::TimedOut(_)
        )
    }
}

/// Top-level failure of a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Required configuration was missing or invalid; nothing was submitted.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("provisioning {role} failed: {source}")]
    Provision { role: Role, source: EndpointError },

    #[error("wiring {target}.{method} failed: {source}")]
    Wiring {
        target: Role,
        method: &'static str,
        source: EndpointError,
    },

    /// The contracts are live but the record was not written.
    #[error("deployment record not persisted: {0:#}")]
    Persistence(anyhow::Error),
}
