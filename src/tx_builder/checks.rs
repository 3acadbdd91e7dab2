//! Build pipeline steps and their chain-lookup seams
//!
//! The builder itself never talks to the chain; destination and transit
//! account state come in through the two traits here. Each `check_*`
//! function is one ordered pipeline step mutating the shared
//! [`BuildState`].

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey, signature::Keypair, signer::Signer, system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::FeeRelayerError;
use crate::pools::{Pool, PoolsPair};
use crate::relay::program;
use crate::rpc::{get_token_account, SolanaRpc};
use crate::tx_builder::output::BuildState;
use crate::types::TokenAccount;

/// Byte size of an SPL token account
const TOKEN_ACCOUNT_SPAN: u64 = 165;

/// What kind of account the swap pays into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationAnalysis {
    /// An SPL token account, possibly not created yet
    SplAccount { needs_creation: bool },
    /// Native SOL; the swap goes through an ephemeral wrapped-SOL account
    NativeSolAccount,
}

/// Classifies the destination of a swap for a given owner and mint
#[async_trait]
pub trait DestinationAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<DestinationAnalysis, FeeRelayerError>;
}

/// Chain-backed destination analysis: native mint means native SOL,
/// anything else is checked for an existing associated token account
pub struct RpcDestinationAnalyzer {
    rpc: Arc<dyn SolanaRpc>,
}

impl RpcDestinationAnalyzer {
    pub fn new(rpc: Arc<dyn SolanaRpc>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl DestinationAnalyzer for RpcDestinationAnalyzer {
    async fn analyze(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<DestinationAnalysis, FeeRelayerError> {
        if *mint == spl_token::native_mint::id() {
            return Ok(DestinationAnalysis::NativeSolAccount);
        }
        let ata = get_associated_token_address(owner, mint);
        let exists = self.rpc.get_account(&ata).await?.is_some();
        Ok(DestinationAnalysis::SplAccount {
            needs_creation: !exists,
        })
    }
}

/// On-chain state of the transit token account for a two-hop route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitAccountState {
    Missing,
    /// Exists and holds the expected mint
    Compatible,
    /// Exists but holds a different mint; must be closed and recreated
    Incompatible,
}

/// Resolves and inspects the transit token account of a route
#[async_trait]
pub trait TransitTokenAccountManager: Send + Sync {
    /// Transit account for a two-hop route, `None` for direct routes
    fn transit_token(&self, pools: &[Pool]) -> Result<Option<TokenAccount>, FeeRelayerError>;

    /// State of the transit account, `None` when the route has none
    async fn transit_account_state(
        &self,
        transit_token: Option<&TokenAccount>,
    ) -> Result<Option<TransitAccountState>, FeeRelayerError>;
}

pub struct RpcTransitTokenAccountManager {
    rpc: Arc<dyn SolanaRpc>,
    owner: Pubkey,
    relay_program_id: Pubkey,
}

impl RpcTransitTokenAccountManager {
    pub fn new(rpc: Arc<dyn SolanaRpc>, owner: Pubkey, relay_program_id: Pubkey) -> Self {
        Self {
            rpc,
            owner,
            relay_program_id,
        }
    }
}

#[async_trait]
impl TransitTokenAccountManager for RpcTransitTokenAccountManager {
    fn transit_token(&self, pools: &[Pool]) -> Result<Option<TokenAccount>, FeeRelayerError> {
        let Some(mint) = pools.transit_token_mint() else {
            if pools.len() == 2 {
                return Err(FeeRelayerError::TransitTokenMintNotFound);
            }
            return Ok(None);
        };
        let address =
            program::transit_token_account_address(&self.owner, &mint, &self.relay_program_id);
        Ok(Some(TokenAccount::new(address, mint)))
    }

    async fn transit_account_state(
        &self,
        transit_token: Option<&TokenAccount>,
    ) -> Result<Option<TransitAccountState>, FeeRelayerError> {
        let Some(transit) = transit_token else {
            return Ok(None);
        };
        let state = match get_token_account(&*self.rpc, &transit.address).await? {
            None => TransitAccountState::Missing,
            Some(account) if account.mint == transit.mint => TransitAccountState::Compatible,
            Some(_) => TransitAccountState::Incompatible,
        };
        Ok(Some(state))
    }
}

/// Step 1: the swap must not spend from the fee payer's own token account
pub fn check_source_is_not_fee_payer(
    source: &TokenAccount,
    fee_payer: &Pubkey,
) -> Result<(), FeeRelayerError> {
    let fee_payer_ata = get_associated_token_address(fee_payer, &source.mint);
    if source.address == fee_payer_ata {
        return Err(FeeRelayerError::wrong_address(
            "source is the fee payer's associated token account",
        ));
    }
    Ok(())
}

/// Step 2: resolve the transit account of a two-hop route
///
/// An incompatible existing account is closed in the preliminary
/// transaction and recreated inside the swap.
pub async fn check_transit_token_account(
    manager: &dyn TransitTokenAccountManager,
    user: &Pubkey,
    pools: &[Pool],
    state: &mut BuildState,
) -> Result<(), FeeRelayerError> {
    let transit_token = manager.transit_token(pools)?;
    match manager.transit_account_state(transit_token.as_ref()).await? {
        None => {}
        Some(TransitAccountState::Compatible) => {
            state.needs_create_transit_token_account = false;
        }
        Some(TransitAccountState::Missing) => {
            state.needs_create_transit_token_account = true;
        }
        Some(TransitAccountState::Incompatible) => {
            let transit = transit_token
                .as_ref()
                .ok_or_else(|| FeeRelayerError::internal("incompatible transit without account"))?;
            debug!(address = %transit.address, "closing incompatible transit account");
            state.additional_instructions.push(
                spl_token::instruction::close_account(
                    &spl_token::id(),
                    &transit.address,
                    user,
                    user,
                    &[],
                )
                .map_err(|e| FeeRelayerError::internal(e.to_string()))?,
            );
            state.needs_create_transit_token_account = true;
        }
    }
    state.transit_token = transit_token;
    Ok(())
}

/// Step 3: verify the source balance and resolve the source account,
/// wrapping native SOL
///
/// A native source is wrapped into an ephemeral account: the user pays
/// the input to the fee payer, who funds the ephemeral account with the
/// input plus rent. The rent is owed back through the payback flow.
pub async fn check_source(
    rpc: &dyn SolanaRpc,
    user: &Pubkey,
    source: &TokenAccount,
    fee_payer: &Pubkey,
    input_amount: u64,
    minimum_token_account_balance: u64,
    state: &mut BuildState,
) -> Result<(), FeeRelayerError> {
    if source.address != *user {
        let balance = get_token_account(rpc, &source.address)
            .await?
            .map(|account| account.amount)
            .unwrap_or(0);
        if balance < input_amount {
            return Err(FeeRelayerError::NotEnoughTokenBalance {
                expected: input_amount,
                actual: balance,
            });
        }
        state.user_source = Some(source.address);
        return Ok(());
    }

    // Native SOL source
    let lamports = rpc
        .get_account(user)
        .await?
        .map(|account| account.lamports)
        .unwrap_or(0);
    if lamports < input_amount {
        return Err(FeeRelayerError::NotEnoughTokenBalance {
            expected: input_amount,
            actual: lamports,
        });
    }

    let ephemeral = Keypair::new();
    state.instructions.push(system_instruction::transfer(
        user,
        fee_payer,
        input_amount,
    ));
    state.instructions.push(system_instruction::create_account(
        fee_payer,
        &ephemeral.pubkey(),
        input_amount + minimum_token_account_balance,
        TOKEN_ACCOUNT_SPAN,
        &spl_token::id(),
    ));
    state.instructions.push(
        spl_token::instruction::initialize_account(
            &spl_token::id(),
            &ephemeral.pubkey(),
            &spl_token::native_mint::id(),
            user,
        )
        .map_err(|e| FeeRelayerError::internal(e.to_string()))?,
    );

    state.user_source = Some(ephemeral.pubkey());
    state.additional_payback_fee += minimum_token_account_balance;
    state.source_wsol_new_account = Some(ephemeral);
    Ok(())
}

/// Step 4: resolve the destination account
///
/// A caller-supplied SPL destination is used as-is, no creation. Without
/// one the analyzer decides: native SOL destinations get an ephemeral
/// wrapped-SOL account that the closing step unwinds, and a missing SPL
/// destination gets a fee-payer-funded associated account. When the
/// source was wrapped, that creation moves to the preliminary transaction
/// to keep the swap's signature count down.
pub async fn check_destination(
    analyzer: &dyn DestinationAnalyzer,
    user: &Pubkey,
    destination_mint: &Pubkey,
    destination_address: Option<Pubkey>,
    fee_payer: &Pubkey,
    minimum_token_account_balance: u64,
    state: &mut BuildState,
) -> Result<(), FeeRelayerError> {
    if let Some(address) = destination_address {
        if *destination_mint != spl_token::native_mint::id() {
            state.user_destination = Some(address);
            return Ok(());
        }
    }

    match analyzer.analyze(user, destination_mint).await? {
        DestinationAnalysis::NativeSolAccount => {
            let ephemeral = Keypair::new();
            state.instructions.push(system_instruction::create_account(
                fee_payer,
                &ephemeral.pubkey(),
                minimum_token_account_balance,
                TOKEN_ACCOUNT_SPAN,
                &spl_token::id(),
            ));
            state.instructions.push(
                spl_token::instruction::initialize_account(
                    &spl_token::id(),
                    &ephemeral.pubkey(),
                    &spl_token::native_mint::id(),
                    user,
                )
                .map_err(|e| FeeRelayerError::internal(e.to_string()))?,
            );
            state.account_creation_fee += minimum_token_account_balance;
            state.user_destination = Some(ephemeral.pubkey());
            state.destination_new_account = Some(ephemeral);
        }
        DestinationAnalysis::SplAccount { needs_creation } => {
            let destination = get_associated_token_address(user, destination_mint);
            if needs_creation {
                let create = create_associated_token_account(
                    fee_payer,
                    user,
                    destination_mint,
                    &spl_token::id(),
                );
                if state.source_wsol_new_account.is_some() {
                    // The wrap already costs two extra signatures; move the
                    // creation into its own transaction
                    state.additional_instructions.push(create);
                    state.additional_account_creation_fee += minimum_token_account_balance;
                } else {
                    state.instructions.push(create);
                    state.account_creation_fee += minimum_token_account_balance;
                }
            }
            state.user_destination = Some(destination);
        }
    }
    Ok(())
}

/// Step 7: unwind ephemeral wrapped-SOL accounts
///
/// The source wrap closes back to the user (its rent is owed to the fee
/// payer via the payback flow). A destination wrap closes to the user and
/// immediately returns its rent to the fee payer, netting the creation
/// fee out of this transaction.
pub fn check_closing_accounts(
    user: &Pubkey,
    fee_payer: &Pubkey,
    minimum_token_account_balance: u64,
    state: &mut BuildState,
) -> Result<(), FeeRelayerError> {
    if let Some(source_wsol) = &state.source_wsol_new_account {
        state.instructions.push(
            spl_token::instruction::close_account(
                &spl_token::id(),
                &source_wsol.pubkey(),
                user,
                user,
                &[],
            )
            .map_err(|e| FeeRelayerError::internal(e.to_string()))?,
        );
    }
    if let Some(destination_wsol) = &state.destination_new_account {
        state.instructions.push(
            spl_token::instruction::close_account(
                &spl_token::id(),
                &destination_wsol.pubkey(),
                user,
                user,
                &[],
            )
            .map_err(|e| FeeRelayerError::internal(e.to_string()))?,
        );
        state.instructions.push(system_instruction::transfer(
            user,
            fee_payer,
            minimum_token_account_balance,
        ));
        state.account_creation_fee =
            state.account_creation_fee.saturating_sub(minimum_token_account_balance);
    }
    Ok(())
}
