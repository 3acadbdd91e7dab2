//! Integration tests for top-up transaction building
//!
//! Validates:
//! - Direct and transitive top-up instruction layout
//! - Relay account creation rent charged on first top-up
//! - The payback transfer matching the expected fee total

use async_trait::async_trait;
use fee_relay::error::FeeRelayerError;
use fee_relay::pools::Pool;
use fee_relay::relay::{program, RelayAccountStatus, RelayContext, UsageStatus};
use fee_relay::tx_builder::{TopUpTransactionBuilder, TransitAccountState, TransitTokenAccountManager};
use fee_relay::types::TokenAccount;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::sync::Arc;

struct MockTransitManager {
    transit: Option<TokenAccount>,
    state: Option<TransitAccountState>,
}

#[async_trait]
impl TransitTokenAccountManager for MockTransitManager {
    fn transit_token(&self, _pools: &[Pool]) -> Result<Option<TokenAccount>, FeeRelayerError> {
        Ok(self.transit)
    }

    async fn transit_account_state(
        &self,
        _transit_token: Option<&TokenAccount>,
    ) -> Result<Option<TransitAccountState>, FeeRelayerError> {
        Ok(self.state)
    }
}

fn pool(token_a_mint: Pubkey, token_b_mint: Pubkey) -> Pool {
    Pool {
        program_id: Pubkey::new_unique(),
        account: Pubkey::new_unique(),
        authority: Pubkey::new_unique(),
        token_account_a: Pubkey::new_unique(),
        token_account_b: Pubkey::new_unique(),
        token_a_mint,
        token_b_mint,
        pool_token_mint: Pubkey::new_unique(),
        fee_account: Pubkey::new_unique(),
        token_a_balance: 715_874_535_300,
        token_b_balance: 1_113_617_000_000,
        trade_fee_numerator: 25,
        trade_fee_denominator: 10_000,
        owner_trade_fee_numerator: 5,
        owner_trade_fee_denominator: 10_000,
    }
}

fn context(relay_account_status: RelayAccountStatus) -> RelayContext {
    RelayContext {
        minimum_token_account_balance: 2_039_280,
        minimum_relay_account_balance: 890_880,
        fee_payer_address: Pubkey::new_unique(),
        lamports_per_signature: 5000,
        relay_account_status,
        usage_status: UsageStatus::default(),
    }
}

#[tokio::test]
async fn test_direct_top_up_layout_and_payback() {
    let user = Keypair::new();
    let source_mint = Pubkey::new_unique();
    let route = [pool(source_mint, spl_token::native_mint::id())];
    let context = context(RelayAccountStatus::Created { balance: 50_000 });

    let builder = TopUpTransactionBuilder::new(
        Arc::new(MockTransitManager {
            transit: None,
            state: None,
        }),
        program::mainnet_id(),
    );
    let output = builder
        .build_top_up_transaction(
            &user,
            &context,
            TokenAccount::new(Pubkey::new_unique(), source_mint),
            &route,
            100_000,
            Hash::new_unique(),
        )
        .await
        .unwrap();

    let prepared = &output.prepared_transaction;
    let message = &prepared.transaction.message;
    assert_eq!(message.instructions.len(), 2);
    // Top-up swap (tag 0) then the payback transfer (tag 2)
    assert_eq!(message.instructions[0].data[0], 0);
    assert_eq!(message.instructions[1].data[0], 2);

    // User and fee payer signatures; relay account already exists
    assert_eq!(prepared.expected_fee.transaction, 10_000);
    assert_eq!(prepared.expected_fee.account_balances, 0);

    // The payback amount is the expected fee total
    let payback = u64::from_le_bytes(
        message.instructions[1].data[1..9].try_into().unwrap(),
    );
    assert_eq!(payback, prepared.expected_fee.total());

    assert_eq!(prepared.signer_pubkeys(), vec![user.pubkey()]);
    assert!(output.swap_data.minimum_amount_out() >= 100_000);
}

#[tokio::test]
async fn test_first_top_up_charges_relay_account_rent() {
    let user = Keypair::new();
    let source_mint = Pubkey::new_unique();
    let route = [pool(source_mint, spl_token::native_mint::id())];
    let context = context(RelayAccountStatus::NotYetCreated);

    let builder = TopUpTransactionBuilder::new(
        Arc::new(MockTransitManager {
            transit: None,
            state: None,
        }),
        program::mainnet_id(),
    );
    let output = builder
        .build_top_up_transaction(
            &user,
            &context,
            TokenAccount::new(Pubkey::new_unique(), source_mint),
            &route,
            100_000,
            Hash::new_unique(),
        )
        .await
        .unwrap();

    let fee = output.prepared_transaction.expected_fee;
    assert_eq!(fee.transaction, 10_000);
    assert_eq!(fee.account_balances, 890_880);
}

#[tokio::test]
async fn test_transitive_top_up_accounts_for_transit_creation() {
    let user = Keypair::new();
    let source_mint = Pubkey::new_unique();
    let transit_mint = Pubkey::new_unique();
    let route = [
        pool(source_mint, transit_mint),
        pool(transit_mint, spl_token::native_mint::id()),
    ];
    let context = context(RelayAccountStatus::Created { balance: 50_000 });

    let transit_address = program::transit_token_account_address(
        &user.pubkey(),
        &transit_mint,
        &program::mainnet_id(),
    );
    let builder = TopUpTransactionBuilder::new(
        Arc::new(MockTransitManager {
            transit: Some(TokenAccount::new(transit_address, transit_mint)),
            state: Some(TransitAccountState::Missing),
        }),
        program::mainnet_id(),
    );
    let output = builder
        .build_top_up_transaction(
            &user,
            &context,
            TokenAccount::new(Pubkey::new_unique(), source_mint),
            &route,
            100_000,
            Hash::new_unique(),
        )
        .await
        .unwrap();

    let prepared = &output.prepared_transaction;
    let message = &prepared.transaction.message;
    // Transitive top-up swap (tag 1) then the payback
    assert_eq!(message.instructions[0].data[0], 1);
    assert_eq!(prepared.expected_fee.account_balances, 2_039_280);

    match &output.swap_data {
        fee_relay::tx_builder::SwapData::Transitive(swap) => {
            assert!(swap.needs_create_transit_token_account);
            assert_eq!(swap.transit_token_mint_pubkey, transit_mint);
        }
        other => panic!("expected transitive swap data, got direct: {other:?}"),
    }
}
