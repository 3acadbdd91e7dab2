//! Swap route data for the relay program
//!
//! A [`SwapData`] captures everything the relay program needs to replay a
//! pool route on-chain: pool accounts, the transfer authority and the
//! amounts at each hop. Amounts can be derived forward from an input
//! amount or backward from a required output, never both missing.

use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

use crate::error::FeeRelayerError;
use crate::pools::Pool;

/// One pool hop, fully resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectSwapData {
    pub program_id: Pubkey,
    pub account_pubkey: Pubkey,
    pub authority_pubkey: Pubkey,
    pub transfer_authority_pubkey: Pubkey,
    pub source_pubkey: Pubkey,
    pub destination_pubkey: Pubkey,
    pub pool_token_mint_pubkey: Pubkey,
    pub pool_fee_account_pubkey: Pubkey,
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

/// Two pool hops joined by the transit token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitiveSwapData {
    pub from: DirectSwapData,
    pub to: DirectSwapData,
    pub transit_token_mint_pubkey: Pubkey,
    pub needs_create_transit_token_account: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapData {
    Direct(DirectSwapData),
    Transitive(TransitiveSwapData),
}

impl SwapData {
    /// Input amount entering the route
    pub fn amount_in(&self) -> u64 {
        match self {
            SwapData::Direct(swap) => swap.amount_in,
            SwapData::Transitive(swap) => swap.from.amount_in,
        }
    }

    /// Guaranteed output leaving the route
    pub fn minimum_amount_out(&self) -> u64 {
        match self {
            SwapData::Direct(swap) => swap.minimum_amount_out,
            SwapData::Transitive(swap) => swap.to.minimum_amount_out,
        }
    }
}

/// Swap data plus the ephemeral transfer authority, when one was minted
pub struct PreparedSwapData {
    pub swap_data: SwapData,
    pub transfer_authority: Option<Keypair>,
}

fn pool_swap_data(
    pool: &Pool,
    transfer_authority: &Pubkey,
    amount_in: u64,
    minimum_amount_out: u64,
) -> DirectSwapData {
    DirectSwapData {
        program_id: pool.program_id,
        account_pubkey: pool.account,
        authority_pubkey: pool.authority,
        transfer_authority_pubkey: *transfer_authority,
        source_pubkey: pool.token_account_a,
        destination_pubkey: pool.token_account_b,
        pool_token_mint_pubkey: pool.pool_token_mint,
        pool_fee_account_pubkey: pool.fee_account,
        amount_in,
        minimum_amount_out,
    }
}

/// Resolve a route into [`SwapData`]
///
/// Exactly one of `input_amount`/`min_amount_out` may be `None`; the
/// missing side is derived through the curve. With `new_transfer_authority`
/// a fresh keypair delegates the transfer instead of the user.
#[allow(clippy::too_many_arguments)]
pub fn prepare_swap_data(
    user: &Pubkey,
    pools: &[Pool],
    input_amount: Option<u64>,
    min_amount_out: Option<u64>,
    slippage: f64,
    transit_token_mint: Option<Pubkey>,
    needs_create_transit_token_account: bool,
    new_transfer_authority: bool,
) -> Result<PreparedSwapData, FeeRelayerError> {
    if pools.is_empty() {
        return Err(FeeRelayerError::SwapPoolsNotFound);
    }
    if pools.len() > 2 {
        return Err(FeeRelayerError::UnsupportedSwap);
    }
    if input_amount.is_none() && min_amount_out.is_none() {
        return Err(FeeRelayerError::InvalidAmount(
            "neither input nor output amount given".to_string(),
        ));
    }

    let transfer_authority_keypair = Keypair::new();
    let transfer_authority = if new_transfer_authority {
        transfer_authority_keypair.pubkey()
    } else {
        *user
    };

    let swap_data = if pools.len() == 1 {
        let pool = &pools[0];
        let amount_in = match input_amount {
            Some(amount) => amount,
            None => pool
                .input_amount_with_slippage(min_amount_out.unwrap_or(0), slippage)
                .ok_or_else(|| FeeRelayerError::InvalidAmount("input underivable".to_string()))?,
        };
        let minimum_amount_out = match min_amount_out {
            Some(amount) => amount,
            None => pool
                .minimum_amount_out(input_amount.unwrap_or(0), slippage)
                .ok_or_else(|| FeeRelayerError::InvalidAmount("output underivable".to_string()))?,
        };
        SwapData::Direct(pool_swap_data(
            pool,
            &transfer_authority,
            amount_in,
            minimum_amount_out,
        ))
    } else {
        let first = &pools[0];
        let second = &pools[1];
        let transit_token_mint =
            transit_token_mint.ok_or(FeeRelayerError::TransitTokenMintNotFound)?;

        let (first_amount_in, second_amount_in, second_amount_out) = match (input_amount, min_amount_out)
        {
            (Some(input), _) => {
                let transit = first.minimum_amount_out(input, slippage).unwrap_or(0);
                let out = second
                    .minimum_amount_out(transit, slippage)
                    .ok_or_else(|| FeeRelayerError::InvalidAmount("output underivable".to_string()))?;
                (input, transit, out)
            }
            (None, Some(out)) => {
                let transit = second.input_amount_with_slippage(out, slippage).unwrap_or(0);
                let input = first
                    .input_amount_with_slippage(transit, slippage)
                    .ok_or_else(|| FeeRelayerError::InvalidAmount("input underivable".to_string()))?;
                (input, transit, out)
            }
            (None, None) => unreachable!("guarded above"),
        };

        SwapData::Transitive(TransitiveSwapData {
            from: pool_swap_data(first, &transfer_authority, first_amount_in, second_amount_in),
            to: pool_swap_data(second, &transfer_authority, second_amount_in, second_amount_out),
            transit_token_mint_pubkey: transit_token_mint,
            needs_create_transit_token_account,
        })
    };

    Ok(PreparedSwapData {
        swap_data,
        transfer_authority: new_transfer_authority.then_some(transfer_authority_keypair),
    })
}

/// Verify prepared swap data against the route it claims to encode
///
/// The transfer authority must be the user or the ephemeral authority the
/// preparation minted, and every pool account must match the route.
pub fn check_swap_data(
    user: &Pubkey,
    transfer_authority: Option<&Pubkey>,
    pools: &[Pool],
    swap_data: &SwapData,
) -> Result<(), FeeRelayerError> {
    let check_authority = |authority: &Pubkey| -> Result<(), FeeRelayerError> {
        let delegated = transfer_authority.map(|a| a == authority).unwrap_or(false);
        if authority != user && !delegated {
            return Err(FeeRelayerError::invalid_swap_data(
                "transfer authority is neither user nor delegate",
            ));
        }
        Ok(())
    };
    let check_hop = |hop: &DirectSwapData, pool: &Pool| -> Result<(), FeeRelayerError> {
        check_authority(&hop.transfer_authority_pubkey)?;
        if hop.program_id != pool.program_id
            || hop.account_pubkey != pool.account
            || hop.authority_pubkey != pool.authority
            || hop.source_pubkey != pool.token_account_a
            || hop.destination_pubkey != pool.token_account_b
        {
            return Err(FeeRelayerError::invalid_swap_data(
                "swap data does not match pool route",
            ));
        }
        Ok(())
    };

    match (swap_data, pools) {
        (SwapData::Direct(swap), [pool]) => check_hop(swap, pool),
        (SwapData::Transitive(swap), [first, second]) => {
            check_hop(&swap.from, first)?;
            check_hop(&swap.to, second)
        }
        _ => Err(FeeRelayerError::invalid_swap_data(
            "route shape does not match swap data",
        )),
    }
}
