//! Fee arithmetic
//!
//! Pure lamport math over a [`RelayContext`] snapshot. Nothing here touches
//! the network: pool routes arrive pre-loaded and the context is fixed for
//! the whole computation, so identical inputs always price identically.

use solana_sdk::pubkey::Pubkey;

use crate::error::FeeRelayerError;
use crate::fee::{MIN_TOP_UP_AMOUNT, TOP_UP_SLIPPAGE};
use crate::pools::{Pool, PoolsPair};
use crate::relay::context::RelayContext;
use crate::types::FeeAmount;

/// Stateless fee calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeCalculator;

impl FeeCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Signature fees for `signature_count` signatures
    pub fn transaction_fee(&self, signature_count: u64, lamports_per_signature: u64) -> u64 {
        signature_count.saturating_mul(lamports_per_signature)
    }

    /// Rent for `new_account_count` freshly created token accounts
    pub fn account_creation_fee(
        &self,
        new_account_count: u64,
        minimum_token_account_balance: u64,
    ) -> u64 {
        new_account_count.saturating_mul(minimum_token_account_balance)
    }

    /// Rent reclaimed by closing `closed_account_count` token accounts
    pub fn deposit_reclaim(
        &self,
        closed_account_count: u64,
        minimum_token_account_balance: u64,
    ) -> u64 {
        closed_account_count.saturating_mul(minimum_token_account_balance)
    }

    /// Convert a SOL-denominated fee into the paying token over `pools`
    ///
    /// Identity when the paying token is wrapped SOL. Each component is
    /// inverted separately through the route so the relay can account for
    /// them independently. A non-zero component the route cannot deliver
    /// is an error, never a zero price.
    pub fn calculate_fee_in_paying_token(
        &self,
        pools: &[Pool],
        fee_in_sol: FeeAmount,
        paying_token_mint: &Pubkey,
    ) -> Result<FeeAmount, FeeRelayerError> {
        if *paying_token_mint == spl_token::native_mint::id() {
            return Ok(fee_in_sol);
        }
        if pools.is_empty() {
            return Err(FeeRelayerError::SwapPoolsNotFound);
        }

        let transaction = convert_component(pools, fee_in_sol.transaction)?;
        let account_balances = convert_component(pools, fee_in_sol.account_balances)?;

        Ok(FeeAmount::new(transaction, account_balances))
    }

    /// Lamports the user must top their relay account up with before the
    /// relay will front `expected_fee`
    ///
    /// Accounts for free-tier sponsorship of both the top-up transaction
    /// (two signatures) and the follow-on transaction, then offsets
    /// whatever the relay account already holds above its own rent floor.
    /// When paying in wrapped SOL the relay compensates directly and the
    /// relay-account offset does not apply.
    pub fn calculate_needed_top_up_amount(
        &self,
        context: &RelayContext,
        expected_fee: FeeAmount,
        paying_token_mint: Option<&Pubkey>,
    ) -> FeeAmount {
        let mut amount = self.minimum_top_up_amount(context, expected_fee, paying_token_mint);

        // The relay rejects dust top-ups; round up to the minimum
        if amount.total() > 0 && amount.total() < MIN_TOP_UP_AMOUNT {
            amount.transaction += MIN_TOP_UP_AMOUNT - amount.total();
        }
        amount
    }

    fn minimum_top_up_amount(
        &self,
        context: &RelayContext,
        expected_fee: FeeAmount,
        paying_token_mint: Option<&Pubkey>,
    ) -> FeeAmount {
        let mut needed = expected_fee;

        let expected_top_up_network_fee = 2 * context.lamports_per_signature;
        let expected_transaction_network_fee = expected_fee.transaction;

        let mut needed_top_up_network_fee = expected_top_up_network_fee;
        let mut needed_transaction_network_fee = expected_transaction_network_fee;

        if context
            .usage_status
            .is_free_transaction_fee_available(expected_top_up_network_fee)
        {
            needed_top_up_network_fee = 0;
        }

        // The follow-on transaction is checked against the usage counters
        // as they will stand once the top-up itself has been counted
        let mut usage_after_top_up = context.usage_status;
        usage_after_top_up.current_usage += 1;
        usage_after_top_up.amount_used += expected_top_up_network_fee;
        if usage_after_top_up.is_free_transaction_fee_available(expected_transaction_network_fee) {
            needed_transaction_network_fee = 0;
        }

        needed.transaction = needed_top_up_network_fee + needed_transaction_network_fee;

        if needed.total() == 0 {
            return needed;
        }

        let needed_ignoring_relay_account = needed;
        let minimum_relay_account_balance = context.minimum_relay_account_balance;

        match context.relay_account_status.balance() {
            Some(mut balance) => {
                if balance < minimum_relay_account_balance {
                    needed.account_balances += minimum_relay_account_balance - balance;
                } else {
                    balance -= minimum_relay_account_balance;
                    if balance >= needed.transaction {
                        balance -= needed.transaction;
                        needed.transaction = 0;
                        if balance >= needed.account_balances {
                            needed.account_balances = 0;
                        } else {
                            needed.account_balances -= balance;
                        }
                    } else {
                        needed.transaction -= balance;
                    }
                }
            }
            None => {
                // First top-up also funds the relay account's own rent
                needed.account_balances += minimum_relay_account_balance;
            }
        }

        if needed.total() > 0 && paying_token_mint == Some(&spl_token::native_mint::id()) {
            return needed_ignoring_relay_account;
        }

        needed
    }
}

/// Invert one fee component through the route; zero stays zero
fn convert_component(pools: &[Pool], amount: u64) -> Result<u64, FeeRelayerError> {
    if amount == 0 {
        return Ok(0);
    }
    pools.input_amount(amount, TOP_UP_SLIPPAGE).ok_or_else(|| {
        FeeRelayerError::InvalidAmount(format!(
            "fee of {amount} lamports exceeds what the route can deliver"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::context::{RelayAccountStatus, UsageStatus};
    use proptest::prelude::*;

    fn context(status: RelayAccountStatus, usage: UsageStatus) -> RelayContext {
        RelayContext {
            minimum_token_account_balance: 2_039_280,
            minimum_relay_account_balance: 890_880,
            fee_payer_address: Pubkey::new_unique(),
            lamports_per_signature: 5000,
            relay_account_status: status,
            usage_status: usage,
        }
    }

    fn no_free_tier() -> UsageStatus {
        UsageStatus::default()
    }

    fn unlimited_free_tier() -> UsageStatus {
        UsageStatus {
            max_usage: 1_000_000,
            current_usage: 0,
            max_amount: u64::MAX / 2,
            amount_used: 0,
            reached_limit_for_account_creation: false,
        }
    }

    #[test]
    fn test_component_fees() {
        let calc = FeeCalculator::new();
        assert_eq!(calc.transaction_fee(2, 5000), 10_000);
        assert_eq!(calc.account_creation_fee(1, 2_039_280), 2_039_280);
        assert_eq!(calc.deposit_reclaim(2, 2_039_280), 4_078_560);
    }

    #[test]
    fn test_fee_in_wsol_is_identity() {
        let calc = FeeCalculator::new();
        let fee = FeeAmount::new(10_000, 2_039_280);
        let converted = calc
            .calculate_fee_in_paying_token(&[], fee, &spl_token::native_mint::id())
            .unwrap();
        assert_eq!(converted, fee);
    }

    #[test]
    fn test_fee_in_token_without_pools_fails() {
        let calc = FeeCalculator::new();
        let result = calc.calculate_fee_in_paying_token(
            &[],
            FeeAmount::new(10_000, 0),
            &Pubkey::new_unique(),
        );
        assert!(matches!(result, Err(FeeRelayerError::SwapPoolsNotFound)));
    }

    fn thin_pool() -> Pool {
        Pool {
            program_id: Pubkey::new_unique(),
            account: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            token_account_a: Pubkey::new_unique(),
            token_account_b: Pubkey::new_unique(),
            token_a_mint: Pubkey::new_unique(),
            token_b_mint: Pubkey::new_unique(),
            pool_token_mint: Pubkey::new_unique(),
            fee_account: Pubkey::new_unique(),
            token_a_balance: 715_874_535_300,
            token_b_balance: 1_113_617,
            trade_fee_numerator: 25,
            trade_fee_denominator: 10_000,
            owner_trade_fee_numerator: 5,
            owner_trade_fee_denominator: 10_000,
        }
    }

    #[test]
    fn test_fee_beyond_route_liquidity_is_rejected() {
        let calc = FeeCalculator::new();
        let route = [thin_pool()];

        // The route cannot deliver this many lamports out
        let result = calc.calculate_fee_in_paying_token(
            &route,
            FeeAmount::new(10_000_000, 0),
            &Pubkey::new_unique(),
        );
        assert!(matches!(result, Err(FeeRelayerError::InvalidAmount(_))));

        // A payable fee with a zero component still prices
        let priced = calc
            .calculate_fee_in_paying_token(&route, FeeAmount::new(10_000, 0), &Pubkey::new_unique())
            .unwrap();
        assert!(priced.transaction > 0);
        assert_eq!(priced.account_balances, 0);
    }

    #[test]
    fn test_top_up_fully_sponsored_is_zero() {
        let calc = FeeCalculator::new();
        let ctx = context(RelayAccountStatus::NotYetCreated, unlimited_free_tier());
        let needed =
            calc.calculate_needed_top_up_amount(&ctx, FeeAmount::new(10_000, 0), None);
        assert_eq!(needed.total(), 0);
    }

    #[test]
    fn test_top_up_first_time_adds_relay_account_rent() {
        let calc = FeeCalculator::new();
        let ctx = context(RelayAccountStatus::NotYetCreated, no_free_tier());
        let needed =
            calc.calculate_needed_top_up_amount(&ctx, FeeAmount::new(10_000, 0), None);
        // top-up fee (2 sigs) + transaction fee + relay account rent
        assert_eq!(needed.transaction, 20_000);
        assert_eq!(needed.account_balances, 890_880);
    }

    #[test]
    fn test_top_up_offsets_existing_relay_balance() {
        let calc = FeeCalculator::new();
        let ctx = context(
            RelayAccountStatus::Created {
                balance: 890_880 + 15_000,
            },
            no_free_tier(),
        );
        let needed =
            calc.calculate_needed_top_up_amount(&ctx, FeeAmount::new(10_000, 0), None);
        // 20_000 needed, 15_000 covered above the rent floor
        assert_eq!(needed.transaction, 5000);
        assert_eq!(needed.account_balances, 0);
    }

    #[test]
    fn test_top_up_wsol_ignores_relay_account() {
        let calc = FeeCalculator::new();
        let ctx = context(
            RelayAccountStatus::Created {
                balance: 890_880 + 15_000,
            },
            no_free_tier(),
        );
        let needed = calc.calculate_needed_top_up_amount(
            &ctx,
            FeeAmount::new(10_000, 0),
            Some(&spl_token::native_mint::id()),
        );
        assert_eq!(needed.transaction, 20_000);
    }

    #[test]
    fn test_top_up_rounds_up_to_minimum() {
        let calc = FeeCalculator::new();
        let ctx = context(
            RelayAccountStatus::Created {
                balance: 890_880 + 15_000,
            },
            no_free_tier(),
        );
        let needed = calc.calculate_needed_top_up_amount(&ctx, FeeAmount::new(0, 0), None);
        // 10_000 (2 sigs) owed, fully payable, already at the minimum
        assert_eq!(needed.total(), 10_000);

        let ctx = context(
            RelayAccountStatus::Created {
                balance: 890_880 + 4000,
            },
            no_free_tier(),
        );
        let needed = calc.calculate_needed_top_up_amount(&ctx, FeeAmount::new(0, 0), None);
        // 6000 remaining rounds up to the relay's minimum
        assert_eq!(needed.total(), MIN_TOP_UP_AMOUNT);
    }

    proptest! {
        #[test]
        fn prop_fees_monotonic_in_counts(
            sigs in 0u64..64,
            accounts in 0u64..16,
            lps in 0u64..100_000,
            rent in 0u64..10_000_000,
        ) {
            let calc = FeeCalculator::new();
            prop_assert!(calc.transaction_fee(sigs + 1, lps) >= calc.transaction_fee(sigs, lps));
            prop_assert!(
                calc.account_creation_fee(accounts + 1, rent)
                    >= calc.account_creation_fee(accounts, rent)
            );
        }

        #[test]
        fn prop_totals_never_negative(
            transaction in 0u64..u64::MAX / 4,
            account_balances in 0u64..u64::MAX / 4,
            deposit in 0u64..u64::MAX / 2,
        ) {
            let fee = FeeAmount { transaction, account_balances, deposit };
            // Saturating semantics: a larger reclaim nets to zero
            prop_assert!(fee.total() <= transaction + account_balances);
        }
    }
}
