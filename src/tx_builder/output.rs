//! Build accumulator and final output types

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair};

use crate::error::FeeRelayerError;
use crate::types::{PreparedTransaction, TokenAccount};

/// Result of a swap build: the transactions to relay, in submission
/// order, plus rent the user owes the fee payer on top of the parsed fee
#[derive(Debug)]
pub struct SwapTransactionsOutput {
    /// One or two transactions; a preliminary account-setup transaction
    /// precedes the swap when one is needed
    pub transactions: Vec<PreparedTransaction>,
    /// Rent fronted by the fee payer for the ephemeral wrapped-SOL source
    /// account, reimbursed through the relay payback flow
    pub additional_payback_fee: u64,
}

/// Mutable state threaded through the build pipeline
///
/// Each check step reads what earlier steps resolved and appends its own
/// instructions, fees and signers. Nothing is final until assembly.
#[derive(Default)]
pub(crate) struct BuildState {
    /// Token account the swap spends from; replaced by the ephemeral
    /// wrapped-SOL account when the source is native SOL
    pub user_source: Option<Pubkey>,
    /// Token account the swap pays into
    pub user_destination: Option<Pubkey>,

    pub transit_token: Option<TokenAccount>,
    pub needs_create_transit_token_account: bool,

    /// Ephemeral wrapped-SOL account wrapping a native SOL source
    pub source_wsol_new_account: Option<Keypair>,
    /// Ephemeral wrapped-SOL account for a native SOL destination
    pub destination_new_account: Option<Keypair>,

    /// Instructions of the swap transaction, in pipeline order
    pub instructions: Vec<Instruction>,
    /// Instructions assembled into the preliminary transaction
    pub additional_instructions: Vec<Instruction>,

    /// Rent charged in the swap transaction
    pub account_creation_fee: u64,
    /// Rent charged in the preliminary transaction
    pub additional_account_creation_fee: u64,
    /// Rent owed back to the fee payer outside the fee parse
    pub additional_payback_fee: u64,
}

impl BuildState {
    pub fn user_source(&self) -> Result<Pubkey, FeeRelayerError> {
        self.user_source
            .ok_or_else(|| FeeRelayerError::internal("source unresolved at assembly"))
    }

    pub fn user_destination(&self) -> Result<Pubkey, FeeRelayerError> {
        self.user_destination
            .ok_or_else(|| FeeRelayerError::internal("destination unresolved at assembly"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_accounts_error_instead_of_panicking() {
        let state = BuildState::default();
        assert!(matches!(
            state.user_source(),
            Err(FeeRelayerError::Internal(_))
        ));
        assert!(matches!(
            state.user_destination(),
            Err(FeeRelayerError::Internal(_))
        ));
    }
}
