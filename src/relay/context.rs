//! Relay context snapshot types
//!
//! A [`RelayContext`] is an immutable snapshot of everything fee math
//! depends on: rent floors, the relay's fee payer, the signature fee rate,
//! the user's relay account state and the free-tier usage counters. Code
//! downstream never refetches these mid-operation; it works against one
//! snapshot so a build is internally consistent even if the chain moves.

use solana_sdk::pubkey::Pubkey;

/// State of the user's relay account (PDA under the relay program)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayAccountStatus {
    /// The PDA has never been funded
    NotYetCreated,
    /// The PDA exists and holds lamports
    Created { balance: u64 },
    /// The PDA exists but holds nothing
    Empty,
}

impl RelayAccountStatus {
    /// Current balance, `None` when the account does not exist yet
    pub fn balance(&self) -> Option<u64> {
        match self {
            Self::NotYetCreated => None,
            Self::Created { balance } => Some(*balance),
            Self::Empty => Some(0),
        }
    }
}

/// Free-tier usage counters reported by the relay service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UsageStatus {
    /// Sponsored transactions allowed per period
    pub max_usage: u64,
    /// Sponsored transactions consumed this period
    pub current_usage: u64,
    /// Sponsored lamports allowed per period
    pub max_amount: u64,
    /// Sponsored lamports consumed this period
    pub amount_used: u64,
    /// Account-creation sponsorship exhausted separately
    pub reached_limit_for_account_creation: bool,
}

impl UsageStatus {
    /// Whether the relay will sponsor a transaction fee of `fee` lamports
    pub fn is_free_transaction_fee_available(&self, fee: u64) -> bool {
        self.current_usage < self.max_usage
            && self.amount_used.saturating_add(fee) <= self.max_amount
    }
}

/// Immutable snapshot of all relay-dependent chain and service state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayContext {
    /// Rent-exemption minimum for an SPL token account (165 bytes)
    pub minimum_token_account_balance: u64,
    /// Rent-exemption minimum for a zero-data account
    pub minimum_relay_account_balance: u64,
    /// The relay service's fee payer
    pub fee_payer_address: Pubkey,
    pub lamports_per_signature: u64,
    pub relay_account_status: RelayAccountStatus,
    pub usage_status: UsageStatus,
}
