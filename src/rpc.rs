//! Solana RPC seam
//!
//! The relay pipeline only needs a handful of read operations; they sit
//! behind [`SolanaRpc`] so tests can inject frozen chain state and the
//! application can share its existing client. [`RpcClientAdapter`] wraps
//! the nonblocking `solana-client` for production use.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, message::Message,
    program_pack::Pack, pubkey::Pubkey, system_instruction,
};
use std::sync::Arc;

use crate::error::FeeRelayerError;

/// Read-only chain queries used by the relay pipeline
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Fetch an account, `None` when it does not exist
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, FeeRelayerError>;

    /// Rent-exemption minimum for an account of `data_len` bytes
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, FeeRelayerError>;

    /// Current signature fee, `None` when the node reports no fee schedule
    async fn get_lamports_per_signature(&self) -> Result<Option<u64>, FeeRelayerError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, FeeRelayerError>;
}

/// Fetch and unpack an SPL token account, `None` when the account is
/// missing or does not decode as a token account
pub async fn get_token_account(
    rpc: &dyn SolanaRpc,
    pubkey: &Pubkey,
) -> Result<Option<spl_token::state::Account>, FeeRelayerError> {
    let Some(account) = rpc.get_account(pubkey).await? else {
        return Ok(None);
    };
    if account.owner != spl_token::id() {
        return Ok(None);
    }
    Ok(spl_token::state::Account::unpack(&account.data).ok())
}

/// Production adapter over the nonblocking RPC client
pub struct RpcClientAdapter {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcClientAdapter {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            commitment: CommitmentConfig::confirmed(),
        }
    }

    pub fn with_commitment(client: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { client, commitment }
    }
}

#[async_trait]
impl SolanaRpc for RpcClientAdapter {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, FeeRelayerError> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, self.commitment)
            .await
            .map_err(FeeRelayerError::rpc)?;
        Ok(response.value)
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, FeeRelayerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(FeeRelayerError::rpc)
    }

    async fn get_lamports_per_signature(&self) -> Result<Option<u64>, FeeRelayerError> {
        // The fee schedule endpoint is gone in modern RPC; probe the fee of a
        // minimal single-signature message instead.
        let blockhash = self.get_latest_blockhash().await?;
        let probe = Pubkey::new_unique();
        let ix = system_instruction::transfer(&probe, &probe, 0);
        let message = Message::new_with_blockhash(&[ix], Some(&probe), &blockhash);
        let fee = self
            .client
            .get_fee_for_message(&message)
            .await
            .map_err(FeeRelayerError::rpc)?;
        Ok(Some(fee))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, FeeRelayerError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(FeeRelayerError::rpc)
    }
}
