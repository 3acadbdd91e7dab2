//! Constant-product pool route math
//!
//! A swap route is one pool (direct) or two pools sharing an intermediate
//! mint (transitive). Pools are oriented by the caller: token A is the
//! input side. The math mirrors the on-chain token-swap program's
//! constant-product curve, with fees taken from the input amount and
//! ceiling division on the inverse path so a computed input never buys
//! less than the requested output.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

/// A constant-product token-swap pool, oriented input (A) to output (B)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Token-swap program this pool belongs to
    pub program_id: Pubkey,
    /// The swap state account
    pub account: Pubkey,
    pub authority: Pubkey,
    pub token_account_a: Pubkey,
    pub token_account_b: Pubkey,
    pub token_a_mint: Pubkey,
    pub token_b_mint: Pubkey,
    pub pool_token_mint: Pubkey,
    pub fee_account: Pubkey,
    pub token_a_balance: u64,
    pub token_b_balance: u64,
    pub trade_fee_numerator: u64,
    pub trade_fee_denominator: u64,
    pub owner_trade_fee_numerator: u64,
    pub owner_trade_fee_denominator: u64,
}

fn ceil_div(dividend: u128, divisor: u128) -> Option<u128> {
    if divisor == 0 {
        return None;
    }
    Some((dividend + divisor - 1) / divisor)
}

impl Pool {
    /// Total fee taken from `input_amount`, in input-token units
    pub fn fee(&self, input_amount: u64) -> Option<u64> {
        let input = input_amount as u128;
        let mut fee = ceil_div(
            input * self.trade_fee_numerator as u128,
            self.trade_fee_denominator as u128,
        )?;
        if self.owner_trade_fee_denominator != 0 {
            fee += ceil_div(
                input * self.owner_trade_fee_numerator as u128,
                self.owner_trade_fee_denominator as u128,
            )?;
        }
        u64::try_from(fee).ok()
    }

    /// Output for a given input, after fees
    pub fn output_amount(&self, input_amount: u64) -> Option<u64> {
        let fee = self.fee(input_amount)?;
        let input_less_fee = (input_amount.checked_sub(fee)?) as u128;
        let pool_in = self.token_a_balance as u128;
        let pool_out = self.token_b_balance as u128;
        let out = input_less_fee
            .checked_mul(pool_out)?
            .checked_div(pool_in.checked_add(input_less_fee)?)?;
        u64::try_from(out).ok()
    }

    /// Input needed so the curve yields at least `estimated_amount_out`
    ///
    /// `None` when the pool cannot produce that much output.
    pub fn input_amount(&self, estimated_amount_out: u64) -> Option<u64> {
        let pool_in = self.token_a_balance as u128;
        let pool_out = self.token_b_balance as u128;
        let out = estimated_amount_out as u128;
        if out >= pool_out {
            return None;
        }

        let input_less_fee = ceil_div(pool_in.checked_mul(out)?, pool_out - out)?;

        // Gross the fee back up onto the required input
        let (fee_numerator, fee_denominator) = self.combined_fee_ratio();
        if fee_numerator >= fee_denominator {
            return None;
        }
        let input = input_less_fee
            .checked_mul(fee_denominator)?
            .checked_div(fee_denominator - fee_numerator)?;
        u64::try_from(input).ok()
    }

    /// Input needed to receive `minimum_amount_out` after `slippage`
    pub fn input_amount_with_slippage(
        &self,
        minimum_amount_out: u64,
        slippage: f64,
    ) -> Option<u64> {
        if !(0.0..1.0).contains(&slippage) {
            return None;
        }
        let estimated = (minimum_amount_out as f64 / (1.0 - slippage)).ceil() as u64;
        self.input_amount(estimated)
    }

    /// Worst acceptable output for `input_amount` under `slippage`
    pub fn minimum_amount_out(&self, input_amount: u64, slippage: f64) -> Option<u64> {
        if !(0.0..1.0).contains(&slippage) {
            return None;
        }
        let estimated = self.output_amount(input_amount)?;
        Some((estimated as f64 * (1.0 - slippage)).floor() as u64)
    }

    fn combined_fee_ratio(&self) -> (u128, u128) {
        let trade_num = self.trade_fee_numerator as u128;
        let trade_den = self.trade_fee_denominator as u128;
        if self.owner_trade_fee_denominator == 0 {
            (trade_num, trade_den)
        } else {
            let owner_num = self.owner_trade_fee_numerator as u128;
            let owner_den = self.owner_trade_fee_denominator as u128;
            (trade_num * owner_den + owner_num * trade_den, trade_den * owner_den)
        }
    }

    /// The token-swap program's swap instruction (tag 1) for this pool
    pub fn create_swap_instruction(
        &self,
        user_transfer_authority: &Pubkey,
        source: &Pubkey,
        destination: &Pubkey,
        amount_in: u64,
        minimum_amount_out: u64,
    ) -> Instruction {
        let mut data = Vec::with_capacity(17);
        data.push(1u8);
        data.extend_from_slice(&amount_in.to_le_bytes());
        data.extend_from_slice(&minimum_amount_out.to_le_bytes());

        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.account, false),
                AccountMeta::new_readonly(self.authority, false),
                AccountMeta::new_readonly(*user_transfer_authority, true),
                AccountMeta::new(*source, false),
                AccountMeta::new(self.token_account_a, false),
                AccountMeta::new(self.token_account_b, false),
                AccountMeta::new(*destination, false),
                AccountMeta::new(self.pool_token_mint, false),
                AccountMeta::new(self.fee_account, false),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            data,
        }
    }
}

/// Route helpers over a one- or two-pool slice
pub trait PoolsPair {
    /// Chained output across the route
    fn output_amount(&self, input_amount: u64) -> Option<u64>;

    /// Input required to receive `minimum_amount_out` after slippage,
    /// working backwards through the route
    fn input_amount(&self, minimum_amount_out: u64, slippage: f64) -> Option<u64>;

    /// Intermediate mint of a two-pool route
    fn transit_token_mint(&self) -> Option<Pubkey>;
}

impl PoolsPair for [Pool] {
    fn output_amount(&self, input_amount: u64) -> Option<u64> {
        let mut amount = input_amount;
        for pool in self {
            amount = pool.output_amount(amount)?;
        }
        if self.is_empty() {
            None
        } else {
            Some(amount)
        }
    }

    fn input_amount(&self, minimum_amount_out: u64, slippage: f64) -> Option<u64> {
        match self {
            [pool] => pool.input_amount_with_slippage(minimum_amount_out, slippage),
            [first, second] => {
                let transit = second.input_amount_with_slippage(minimum_amount_out, slippage)?;
                first.input_amount_with_slippage(transit, slippage)
            }
            _ => None,
        }
    }

    fn transit_token_mint(&self) -> Option<Pubkey> {
        match self {
            [first, second] if first.token_b_mint == second.token_a_mint => {
                Some(first.token_b_mint)
            }
            _ => None,
        }
    }
}
