//! Error taxonomy for the staking session
//!
//! Only operations that cross the network/contract boundary can fail.
//! Pure derivations (gauge discovery, payout math) degrade to neutral
//! values instead of returning errors.

use alloy_primitives::Address;
use thiserror::Error;

/// ## Description
/// This enum describes staking session errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StakingError {
    /// A read or mutation needing a pool address ran before one was set.
    /// Fatal to that call, not to the session.
    #[error("no pool address set (explicit parameter and session override both absent)")]
    MissingPoolAddress,

    /// The gauge factory knows no gauge for this pool. Blocks dependent
    /// stake/unstake/balance calls.
    #[error("no gauge registered for pool {pool}")]
    GaugeResolution { pool: Address },

    /// An indexer or oracle query failed (network/validation). The affected
    /// view keeps its last-good snapshot; dependent computations treat the
    /// missing data as the neutral element.
    #[error("remote fetch failed: {reason}")]
    RemoteFetch { reason: String },

    /// A stake/unstake submission was rejected or reverted.
    #[error("transaction rejected: {reason}")]
    Transaction { reason: String },
}

impl StakingError {
    /// Wrap any fetch-side failure (HTTP, RPC, decode).
    pub fn remote(err: impl std::fmt::Display) -> Self {
        Self::RemoteFetch {
            reason: err.to_string(),
        }
    }

    /// Wrap a submission-side failure.
    pub fn tx(err: impl std::fmt::Display) -> Self {
        Self::Transaction {
            reason: err.to_string(),
        }
    }
}
