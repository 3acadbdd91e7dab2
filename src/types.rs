//! Core value types shared across the fee relay pipeline

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

use crate::error::FeeRelayerError;

/// Lamport cost of a transaction, broken down by origin
///
/// The three components are kept separate because they are settled
/// differently: signature fees may be sponsored by the relay's free tier,
/// rent for created accounts is always real lamports, and rent reclaimed
/// from accounts closed in the same transaction flows back to the payer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FeeAmount {
    /// Signature fees (lamports_per_signature x signature count)
    pub transaction: u64,
    /// Rent-exemption lamports for accounts created by the transaction
    pub account_balances: u64,
    /// Rent reclaimed from accounts closed by the same transaction
    pub deposit: u64,
}

impl FeeAmount {
    pub fn new(transaction: u64, account_balances: u64) -> Self {
        Self {
            transaction,
            account_balances,
            deposit: 0,
        }
    }

    /// Net lamport cost: `transaction + account_balances - deposit`
    ///
    /// Saturating on both sides so a reclaim larger than the gross cost
    /// nets to zero rather than wrapping.
    pub fn total(&self) -> u64 {
        self.transaction
            .saturating_add(self.account_balances)
            .saturating_sub(self.deposit)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// An SPL token account together with its mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
}

impl TokenAccount {
    pub fn new(address: Pubkey, mint: Pubkey) -> Self {
        Self { address, mint }
    }
}

/// A partially signed transaction bundled with its signing keypairs and
/// the fee the builder expects the relay to charge for it
///
/// The fee payer's signature slot is left empty; the relay service fills
/// it in server-side.
#[derive(Debug)]
pub struct PreparedTransaction {
    pub transaction: Transaction,
    pub signers: Vec<Keypair>,
    pub expected_fee: FeeAmount,
}

impl PreparedTransaction {
    /// Partial-sign `transaction` with `signers` and record the expected fee
    ///
    /// Signers whose pubkey has no signature slot in the message are kept
    /// on the side without signing; they still authorize the overall flow
    /// (the owner of an account the fee payer creates, say) and count
    /// toward the fee the caller computed.
    pub fn new(
        mut transaction: Transaction,
        signers: Vec<Keypair>,
        expected_fee: FeeAmount,
    ) -> Result<Self, FeeRelayerError> {
        let blockhash = transaction.message.recent_blockhash;
        let signer_slots = transaction.message.header.num_required_signatures as usize;
        let required: Vec<&Keypair> = signers
            .iter()
            .filter(|keypair| {
                transaction.message.account_keys[..signer_slots].contains(&keypair.pubkey())
            })
            .collect();
        if !required.is_empty() {
            transaction
                .try_partial_sign(&required, blockhash)
                .map_err(|e| FeeRelayerError::Signing(e.to_string()))?;
        }
        Ok(Self {
            transaction,
            signers,
            expected_fee,
        })
    }

    /// Look up the recorded signature for a given signer pubkey
    pub fn find_signature(&self, pubkey: &Pubkey) -> Result<Signature, FeeRelayerError> {
        let index = self
            .transaction
            .message
            .account_keys
            .iter()
            .position(|key| key == pubkey)
            .ok_or(FeeRelayerError::InvalidSignature)?;
        self.transaction
            .signatures
            .get(index)
            .copied()
            .filter(|sig| *sig != Signature::default())
            .ok_or(FeeRelayerError::InvalidSignature)
    }

    /// Pubkeys of all local signers
    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|k| k.pubkey()).collect()
    }
}
