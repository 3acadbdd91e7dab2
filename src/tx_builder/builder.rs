//! Swap transaction assembly
//!
//! Runs the build pipeline over a resolved pool route and assembles the
//! partially signed transactions the relay co-signs. A swap produces one
//! transaction, or two when account setup cannot share the swap's
//! signature budget: the preliminary transaction then carries the setup
//! and is submitted first.

use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::FeeRelayerError;
use crate::pools::Pool;
use crate::relay::program;
use crate::rpc::SolanaRpc;
use crate::tx_builder::checks::{
    check_closing_accounts, check_destination, check_source, check_source_is_not_fee_payer,
    check_transit_token_account, DestinationAnalyzer, TransitTokenAccountManager,
};
use crate::tx_builder::output::{BuildState, SwapTransactionsOutput};
use crate::tx_builder::swap_data::{check_swap_data, prepare_swap_data, SwapData};
use crate::types::{FeeAmount, PreparedTransaction, TokenAccount};

/// Builds user swap transactions against a relay fee payer
///
/// Chain state comes in through the analyzer and transit manager seams
/// and the RPC handle; the rates are captured from the relay context at
/// construction.
pub struct SwapTransactionBuilder {
    rpc: Arc<dyn SolanaRpc>,
    transit_token_account_manager: Arc<dyn TransitTokenAccountManager>,
    destination_analyzer: Arc<dyn DestinationAnalyzer>,
    fee_payer_address: Pubkey,
    minimum_token_account_balance: u64,
    lamports_per_signature: u64,
    relay_program_id: Pubkey,
}

impl SwapTransactionBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: Arc<dyn SolanaRpc>,
        transit_token_account_manager: Arc<dyn TransitTokenAccountManager>,
        destination_analyzer: Arc<dyn DestinationAnalyzer>,
        fee_payer_address: Pubkey,
        minimum_token_account_balance: u64,
        lamports_per_signature: u64,
        relay_program_id: Pubkey,
    ) -> Self {
        Self {
            rpc,
            transit_token_account_manager,
            destination_analyzer,
            fee_payer_address,
            minimum_token_account_balance,
            lamports_per_signature,
            relay_program_id,
        }
    }

    /// Build the transaction(s) swapping `input_amount` of `source` into
    /// `destination_token_mint` through `pools`
    ///
    /// `source.address == user` marks a native SOL source. A `None`
    /// `destination_address` resolves to the user's associated account,
    /// creating it when missing; a supplied address is used as-is.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(user = %account.pubkey(), pools = pools.len()), err)]
    pub async fn build_swap_transaction(
        &self,
        account: &Keypair,
        pools: &[Pool],
        input_amount: u64,
        slippage: f64,
        source: TokenAccount,
        destination_token_mint: Pubkey,
        destination_address: Option<Pubkey>,
        blockhash: Hash,
    ) -> Result<SwapTransactionsOutput, FeeRelayerError> {
        let user = account.pubkey();
        let mut state = BuildState::default();

        if blockhash == Hash::default() {
            return Err(FeeRelayerError::MissingBlockhash);
        }
        check_source_is_not_fee_payer(&source, &self.fee_payer_address)?;
        check_transit_token_account(
            &*self.transit_token_account_manager,
            &user,
            pools,
            &mut state,
        )
        .await?;

        let prepared = prepare_swap_data(
            &user,
            pools,
            Some(input_amount),
            None,
            slippage,
            state.transit_token.as_ref().map(|t| t.mint),
            state.needs_create_transit_token_account,
            false,
        )?;
        let transfer_authority = prepared.transfer_authority.as_ref().map(|k| k.pubkey());
        check_swap_data(&user, transfer_authority.as_ref(), pools, &prepared.swap_data)?;

        check_source(
            &*self.rpc,
            &user,
            &source,
            &self.fee_payer_address,
            input_amount,
            self.minimum_token_account_balance,
            &mut state,
        )
        .await?;
        check_destination(
            &*self.destination_analyzer,
            &user,
            &destination_token_mint,
            destination_address,
            &self.fee_payer_address,
            self.minimum_token_account_balance,
            &mut state,
        )
        .await?;

        self.append_swap_instructions(&user, pools, &prepared.swap_data, &mut state)?;
        check_closing_accounts(
            &user,
            &self.fee_payer_address,
            self.minimum_token_account_balance,
            &mut state,
        )?;

        self.assemble(account, prepared.transfer_authority, blockhash, state)
    }

    fn append_swap_instructions(
        &self,
        user: &Pubkey,
        pools: &[Pool],
        swap_data: &SwapData,
        state: &mut BuildState,
    ) -> Result<(), FeeRelayerError> {
        let user_source = state.user_source()?;
        let user_destination = state.user_destination()?;

        match swap_data {
            SwapData::Direct(swap) => {
                let [pool] = pools else {
                    return Err(FeeRelayerError::invalid_swap_data(
                        "direct swap data with non-single route",
                    ));
                };
                state.instructions.push(pool.create_swap_instruction(
                    &swap.transfer_authority_pubkey,
                    &user_source,
                    &user_destination,
                    swap.amount_in,
                    swap.minimum_amount_out,
                ));
            }
            SwapData::Transitive(swap) => {
                let transit = state
                    .transit_token
                    .as_ref()
                    .ok_or(FeeRelayerError::TransitTokenMintNotFound)?;
                if swap.needs_create_transit_token_account {
                    state
                        .instructions
                        .push(program::create_transit_token_account_instruction(
                            &self.relay_program_id,
                            &self.fee_payer_address,
                            user,
                            &transit.address,
                            &transit.mint,
                        ));
                }
                state.instructions.push(program::create_relay_swap_instruction(
                    &self.relay_program_id,
                    swap,
                    user,
                    &user_source,
                    &transit.address,
                    &user_destination,
                    &self.fee_payer_address,
                ));
            }
        }
        Ok(())
    }

    /// Turn the accumulated state into ordered [`PreparedTransaction`]s
    fn assemble(
        &self,
        account: &Keypair,
        transfer_authority: Option<Keypair>,
        blockhash: Hash,
        state: BuildState,
    ) -> Result<SwapTransactionsOutput, FeeRelayerError> {
        let mut transactions = Vec::with_capacity(2);

        if !state.additional_instructions.is_empty() {
            let message = Message::new_with_blockhash(
                &state.additional_instructions,
                Some(&self.fee_payer_address),
                &blockhash,
            );
            let signers = vec![clone_keypair(account)?];
            let expected_fee = FeeAmount::new(
                self.lamports_per_signature
                    .saturating_mul(signers.len() as u64 + 1),
                state.additional_account_creation_fee,
            );
            transactions.push(PreparedTransaction::new(
                Transaction::new_unsigned(message),
                signers,
                expected_fee,
            )?);
        }

        let message = Message::new_with_blockhash(
            &state.instructions,
            Some(&self.fee_payer_address),
            &blockhash,
        );
        let mut signers = vec![clone_keypair(account)?];
        if let Some(authority) = transfer_authority {
            signers.push(authority);
        }
        if let Some(source_wsol) = state.source_wsol_new_account {
            signers.push(source_wsol);
        }
        if let Some(destination) = state.destination_new_account {
            signers.push(destination);
        }
        let expected_fee = FeeAmount::new(
            self.lamports_per_signature
                .saturating_mul(signers.len() as u64 + 1),
            state.account_creation_fee,
        );
        debug!(
            transactions = transactions.len() + 1,
            expected_transaction_fee = expected_fee.transaction,
            "swap assembled"
        );
        transactions.push(PreparedTransaction::new(
            Transaction::new_unsigned(message),
            signers,
            expected_fee,
        )?);

        Ok(SwapTransactionsOutput {
            transactions,
            additional_payback_fee: state.additional_payback_fee,
        })
    }
}

fn clone_keypair(keypair: &Keypair) -> Result<Keypair, FeeRelayerError> {
    Keypair::try_from(&keypair.to_bytes()[..])
        .map_err(|e| FeeRelayerError::Signing(e.to_string()))
}
