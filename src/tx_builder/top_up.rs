//! Relay account top-up transaction
//!
//! Swaps the user's SPL tokens into SOL inside the relay program so their
//! relay account can cover fees the relay service fronts. The transaction
//! ends with a payback transferring its own expected cost from the relay
//! account to the fee payer.

use solana_sdk::{
    hash::Hash, message::Message, pubkey::Pubkey, signature::Keypair, signer::Signer,
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::FeeRelayerError;
use crate::fee::TOP_UP_SLIPPAGE;
use crate::pools::Pool;
use crate::relay::context::{RelayAccountStatus, RelayContext};
use crate::relay::program;
use crate::tx_builder::checks::{TransitAccountState, TransitTokenAccountManager};
use crate::tx_builder::swap_data::{prepare_swap_data, SwapData};
use crate::types::{FeeAmount, PreparedTransaction, TokenAccount};

/// A built top-up: the swap data the relay verifies server-side and the
/// partially signed transaction carrying it
pub struct TopUpTransactionOutput {
    pub swap_data: SwapData,
    pub prepared_transaction: PreparedTransaction,
}

pub struct TopUpTransactionBuilder {
    transit_token_account_manager: Arc<dyn TransitTokenAccountManager>,
    relay_program_id: Pubkey,
}

impl TopUpTransactionBuilder {
    pub fn new(
        transit_token_account_manager: Arc<dyn TransitTokenAccountManager>,
        relay_program_id: Pubkey,
    ) -> Self {
        Self {
            transit_token_account_manager,
            relay_program_id,
        }
    }

    /// Build a transaction topping the relay account up by `target_amount`
    /// lamports, paid for by swapping from `source_token` through `pools`
    #[instrument(skip_all, fields(user = %account.pubkey(), target_amount), err)]
    pub async fn build_top_up_transaction(
        &self,
        account: &Keypair,
        context: &RelayContext,
        source_token: TokenAccount,
        pools: &[Pool],
        target_amount: u64,
        blockhash: Hash,
    ) -> Result<TopUpTransactionOutput, FeeRelayerError> {
        let user = account.pubkey();

        if blockhash == Hash::default() {
            return Err(FeeRelayerError::MissingBlockhash);
        }

        let transit_token = self.transit_token_account_manager.transit_token(pools)?;
        let needs_create_transit_token_account = matches!(
            self.transit_token_account_manager
                .transit_account_state(transit_token.as_ref())
                .await?,
            Some(TransitAccountState::Missing) | Some(TransitAccountState::Incompatible)
        );

        let prepared = prepare_swap_data(
            &user,
            pools,
            None,
            Some(target_amount),
            TOP_UP_SLIPPAGE,
            transit_token.as_ref().map(|t| t.mint),
            needs_create_transit_token_account,
            false,
        )?;

        let mut expected_fee = FeeAmount::default();
        let mut instructions = Vec::with_capacity(2);

        // The swap itself: user authority plus fee payer sign
        instructions.push(program::top_up_swap_instruction(
            &self.relay_program_id,
            &prepared.swap_data,
            &user,
            &source_token.address,
            &context.fee_payer_address,
        ));
        expected_fee.transaction = context.lamports_per_signature.saturating_mul(2);
        if context.relay_account_status == RelayAccountStatus::NotYetCreated {
            expected_fee.account_balances += context.minimum_relay_account_balance;
        }
        if needs_create_transit_token_account {
            expected_fee.account_balances += context.minimum_token_account_balance;
        }

        // Pay the whole expected cost straight back to the fee payer
        instructions.push(program::transfer_sol_instruction(
            &self.relay_program_id,
            &user,
            &context.fee_payer_address,
            expected_fee.total(),
        ));

        debug!(
            payback = expected_fee.total(),
            needs_create_transit_token_account,
            "top-up assembled"
        );

        let message = Message::new_with_blockhash(
            &instructions,
            Some(&context.fee_payer_address),
            &blockhash,
        );
        let mut signers = vec![clone_keypair(account)?];
        if let Some(authority) = prepared.transfer_authority {
            signers.push(authority);
        }
        let prepared_transaction =
            PreparedTransaction::new(Transaction::new_unsigned(message), signers, expected_fee)?;

        Ok(TopUpTransactionOutput {
            swap_data: prepared.swap_data,
            prepared_transaction,
        })
    }
}

fn clone_keypair(keypair: &Keypair) -> Result<Keypair, FeeRelayerError> {
    Keypair::try_from(&keypair.to_bytes()[..])
        .map_err(|e| FeeRelayerError::Signing(e.to_string()))
}
