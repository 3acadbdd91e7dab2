//! On-chain relay program: addresses and instruction builders
//!
//! The relay program lets a user top up their relay account by swapping
//! SPL tokens into SOL, pay back fronted fees, and run transitive swaps
//! through a program-owned transit account. Instruction data is a one-byte
//! tag followed by little-endian u64 arguments.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program,
    sysvar::rent,
};

use crate::tx_builder::swap_data::{DirectSwapData, SwapData, TransitiveSwapData};

const MAINNET_ID: Pubkey = pubkey!("12YKFL4mnZz6CBEGePrf293mEzueQM3h8VLPUJsKpGs9");
const DEVNET_ID: Pubkey = pubkey!("6xKJFyuM6UHCT8F5SBxnjGt6ZrZYjsVfnAnAeHPU775k");

/// Instruction tags understood by the relay program
mod tag {
    pub const TOP_UP_WITH_DIRECT_SWAP: u8 = 0;
    pub const TOP_UP_WITH_TRANSITIVE_SWAP: u8 = 1;
    pub const TRANSFER_SOL: u8 = 2;
    pub const CREATE_TRANSIT_TOKEN: u8 = 3;
    pub const TRANSITIVE_SWAP: u8 = 4;
}

pub fn mainnet_id() -> Pubkey {
    MAINNET_ID
}

pub fn devnet_id() -> Pubkey {
    DEVNET_ID
}

/// PDA holding the user's prepaid fee balance
pub fn user_relay_address(user: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[user.as_ref(), b"relay"], program_id).0
}

/// PDA used as the user's scratch wrapped-SOL account during top-ups
pub fn user_temporary_wsol_address(user: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[user.as_ref(), b"temporary_wsol"], program_id).0
}

/// PDA holding the intermediate token between the two hops of a
/// transitive swap
pub fn transit_token_account_address(
    user: &Pubkey,
    transit_token_mint: &Pubkey,
    program_id: &Pubkey,
) -> Pubkey {
    Pubkey::find_program_address(
        &[user.as_ref(), transit_token_mint.as_ref(), b"transit"],
        program_id,
    )
    .0
}

fn encode(tag: u8, args: &[u64]) -> Vec<u8> {
    let mut data = Vec::with_capacity(1 + 8 * args.len());
    data.push(tag);
    for arg in args {
        data.extend_from_slice(&arg.to_le_bytes());
    }
    data
}

/// Top up the user's relay account by swapping tokens into SOL
pub fn top_up_swap_instruction(
    program_id: &Pubkey,
    top_up_swap: &SwapData,
    user_authority: &Pubkey,
    user_source_token_account: &Pubkey,
    fee_payer: &Pubkey,
) -> Instruction {
    let user_relay_account = user_relay_address(user_authority, program_id);
    let user_temporary_wsol = user_temporary_wsol_address(user_authority, program_id);

    match top_up_swap {
        SwapData::Direct(swap) => top_up_with_spl_swap_direct(
            program_id,
            fee_payer,
            user_authority,
            &user_relay_account,
            user_source_token_account,
            &user_temporary_wsol,
            swap,
        ),
        SwapData::Transitive(swap) => top_up_with_spl_swap_transitive(
            program_id,
            fee_payer,
            user_authority,
            &user_relay_account,
            user_source_token_account,
            &user_temporary_wsol,
            swap,
        ),
    }
}

/// Pay `lamports` from the user's relay account to `recipient`
pub fn transfer_sol_instruction(
    program_id: &Pubkey,
    user_authority: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*user_authority, true),
            AccountMeta::new(user_relay_address(user_authority, program_id), false),
            AccountMeta::new(*recipient, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(tag::TRANSFER_SOL, &[lamports]),
    }
}

/// Create the program-owned transit token account for a transitive swap
pub fn create_transit_token_account_instruction(
    program_id: &Pubkey,
    fee_payer: &Pubkey,
    user_authority: &Pubkey,
    transit_token_account: &Pubkey,
    transit_token_mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*transit_token_account, false),
            AccountMeta::new_readonly(*transit_token_mint, false),
            AccountMeta::new(*user_authority, true),
            AccountMeta::new_readonly(*fee_payer, true),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(rent::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(tag::CREATE_TRANSIT_TOKEN, &[]),
    }
}

/// Two-hop swap routed through the user's transit token account
pub fn create_relay_swap_instruction(
    program_id: &Pubkey,
    transitive_swap: &TransitiveSwapData,
    user_authority: &Pubkey,
    source: &Pubkey,
    transit_token_account: &Pubkey,
    destination: &Pubkey,
    fee_payer: &Pubkey,
) -> Instruction {
    let from = &transitive_swap.from;
    let to = &transitive_swap.to;
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(from.transfer_authority_pubkey, true),
            AccountMeta::new(*source, false),
            AccountMeta::new(*transit_token_account, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(from.program_id, false),
            AccountMeta::new_readonly(from.account_pubkey, false),
            AccountMeta::new_readonly(from.authority_pubkey, false),
            AccountMeta::new(from.source_pubkey, false),
            AccountMeta::new(from.destination_pubkey, false),
            AccountMeta::new(from.pool_token_mint_pubkey, false),
            AccountMeta::new(from.pool_fee_account_pubkey, false),
            AccountMeta::new_readonly(to.program_id, false),
            AccountMeta::new_readonly(to.account_pubkey, false),
            AccountMeta::new_readonly(to.authority_pubkey, false),
            AccountMeta::new(to.source_pubkey, false),
            AccountMeta::new(to.destination_pubkey, false),
            AccountMeta::new(to.pool_token_mint_pubkey, false),
            AccountMeta::new(to.pool_fee_account_pubkey, false),
        ],
        data: encode(
            tag::TRANSITIVE_SWAP,
            &[from.amount_in, from.minimum_amount_out, to.minimum_amount_out],
        ),
    }
}

fn top_up_with_spl_swap_direct(
    program_id: &Pubkey,
    fee_payer: &Pubkey,
    user_authority: &Pubkey,
    user_relay_account: &Pubkey,
    user_source_token_account: &Pubkey,
    user_temporary_wsol: &Pubkey,
    swap: &DirectSwapData,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(spl_token::native_mint::id(), false),
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new_readonly(*user_authority, true),
            AccountMeta::new(*user_relay_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(swap.program_id, false),
            AccountMeta::new_readonly(swap.account_pubkey, false),
            AccountMeta::new_readonly(swap.authority_pubkey, false),
            AccountMeta::new_readonly(swap.transfer_authority_pubkey, true),
            AccountMeta::new(*user_source_token_account, false),
            AccountMeta::new(*user_temporary_wsol, false),
            AccountMeta::new(swap.source_pubkey, false),
            AccountMeta::new(swap.destination_pubkey, false),
            AccountMeta::new(swap.pool_token_mint_pubkey, false),
            AccountMeta::new(swap.pool_fee_account_pubkey, false),
            AccountMeta::new_readonly(rent::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(
            tag::TOP_UP_WITH_DIRECT_SWAP,
            &[swap.amount_in, swap.minimum_amount_out],
        ),
    }
}

fn top_up_with_spl_swap_transitive(
    program_id: &Pubkey,
    fee_payer: &Pubkey,
    user_authority: &Pubkey,
    user_relay_account: &Pubkey,
    user_source_token_account: &Pubkey,
    user_temporary_wsol: &Pubkey,
    swap: &TransitiveSwapData,
) -> Instruction {
    let from = &swap.from;
    let to = &swap.to;
    let transit =
        transit_token_account_address(user_authority, &swap.transit_token_mint_pubkey, program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(spl_token::native_mint::id(), false),
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new_readonly(*user_authority, true),
            AccountMeta::new(*user_relay_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(from.transfer_authority_pubkey, true),
            AccountMeta::new(*user_source_token_account, false),
            AccountMeta::new(transit, false),
            AccountMeta::new(*user_temporary_wsol, false),
            AccountMeta::new_readonly(from.program_id, false),
            AccountMeta::new_readonly(from.account_pubkey, false),
            AccountMeta::new_readonly(from.authority_pubkey, false),
            AccountMeta::new(from.source_pubkey, false),
            AccountMeta::new(from.destination_pubkey, false),
            AccountMeta::new(from.pool_token_mint_pubkey, false),
            AccountMeta::new(from.pool_fee_account_pubkey, false),
            AccountMeta::new_readonly(to.program_id, false),
            AccountMeta::new_readonly(to.account_pubkey, false),
            AccountMeta::new_readonly(to.authority_pubkey, false),
            AccountMeta::new(to.source_pubkey, false),
            AccountMeta::new(to.destination_pubkey, false),
            AccountMeta::new(to.pool_token_mint_pubkey, false),
            AccountMeta::new(to.pool_fee_account_pubkey, false),
            AccountMeta::new_readonly(rent::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode(
            tag::TOP_UP_WITH_TRANSITIVE_SWAP,
            &[from.amount_in, from.minimum_amount_out, to.minimum_amount_out],
        ),
    }
}
