//! Submission-cost policy for wiring transactions.

use ethers::types::U256;

use crate::endpoint::FeeSuggestion;

/// Explicit fee parameters attached to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeOverride {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Derive the fee override for this run.
///
/// An operator-supplied ceiling (in wei) wins outright, with the priority
/// fee at half the ceiling. Otherwise the endpoint estimate is bumped by
/// 50% to absorb fee movement between estimation and submission. With
/// neither, calls go out under network-default fee behavior.
pub fn compute_override(
    explicit: Option<U256>,
    suggestion: Option<FeeSuggestion>,
) -> Option<FeeOverride> {
    if let Some(fee) = explicit {
        return Some(FeeOverride {
            max_fee_per_gas: fee,
            max_priority_fee_per_gas: fee / U256::from(2),
        });
    }

    let suggestion = suggestion?;
    Some(FeeOverride {
        max_fee_per_gas: suggestion.max_fee_per_gas * U256::from(3) / U256::from(2),
        max_priority_fee_per_gas: suggestion.max_priority_fee_per_gas * U256::from(3)
            / U256::from(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins_over_any_suggestion() {
        let suggestion = FeeSuggestion {
            max_fee_per_gas: U256::from(100),
            max_priority_fee_per_gas: U256::from(10),
        };

        let fees = compute_override(Some(U256::from(10)), Some(suggestion)).unwrap();
        assert_eq!(fees.max_fee_per_gas, U256::from(10));
        assert_eq!(fees.max_priority_fee_per_gas, U256::from(5));
    }

    #[test]
    fn suggested_fees_are_buffered_by_half() {
        let suggestion = FeeSuggestion {
            max_fee_per_gas: U256::from(100),
            max_priority_fee_per_gas: U256::from(10),
        };

        let fees = compute_override(None, Some(suggestion)).unwrap();
        assert_eq!(fees.max_fee_per_gas, U256::from(150));
        assert_eq!(fees.max_priority_fee_per_gas, U256::from(15));
    }

    #[test]
    fn missing_data_degrades_to_no_override() {
        assert!(compute_override(None, None).is_none());
    }
}
