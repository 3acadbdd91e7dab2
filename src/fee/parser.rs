//! Fee reconstruction from assembled transactions
//!
//! Given a fully assembled transaction, works out what the relay will
//! charge for it without asking the relay: signature fees from the header,
//! rent from account-creating instructions, reclaims from closes, and the
//! free-tier sponsorship rule keyed on the fee payer slot. Used by UI code
//! to show a fee before submission.

use bincode::deserialize;
use parking_lot::RwLock;
use solana_sdk::{
    message::Message, pubkey::Pubkey, system_instruction::SystemInstruction, system_program,
    transaction::Transaction,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::FeeRelayerError;
use crate::fee::DEFAULT_LAMPORTS_PER_SIGNATURE;
use crate::rpc::SolanaRpc;
use crate::types::FeeAmount;

/// SPL token CloseAccount instruction tag
const TOKEN_CLOSE_ACCOUNT_TAG: u8 = 9;

/// Byte size of an SPL token account
const TOKEN_ACCOUNT_SPAN: usize = 165;

#[derive(Default)]
struct RateCache {
    lamports_per_signature: Option<u64>,
    minimum_token_account_balance: Option<u64>,
}

/// Reconstructs the fee a transaction will incur through the relay
pub struct FeeParser {
    rpc: Arc<dyn SolanaRpc>,
    /// Fee payers operated by the relay; a transaction paid by one of
    /// these gets its signature fee sponsored
    fee_payers: Vec<Pubkey>,
    cache: RwLock<RateCache>,
}

impl FeeParser {
    pub fn new(rpc: Arc<dyn SolanaRpc>, fee_payers: Vec<Pubkey>) -> Self {
        Self {
            rpc,
            fee_payers,
            cache: RwLock::new(RateCache::default()),
        }
    }

    /// Drop cached chain rates; the next parse refetches them
    pub fn clear_cache(&self) {
        *self.cache.write() = RateCache::default();
    }

    /// Compute the fee breakdown for an assembled transaction
    pub async fn parse(&self, transaction: &Transaction) -> Result<FeeAmount, FeeRelayerError> {
        let lamports_per_signature = self.lamports_per_signature().await?;
        let rent = self.minimum_token_account_balance().await?;

        let message = &transaction.message;
        let scan = scan_accounts(message);

        let deposits = scan.created.intersection(&scan.closed).count() as u64;
        let created = scan.created.len() as u64 - deposits;

        let signature_count = u64::from(message.header.num_required_signatures);
        let mut transaction_fee = lamports_per_signature.saturating_mul(signature_count);

        // Transactions paid by a known relay fee payer ride the free tier
        if let Some(payer) = message.account_keys.first() {
            if self.fee_payers.contains(payer) {
                debug!(%payer, "fee payer is relay-operated, transaction fee sponsored");
                transaction_fee = 0;
            }
        }

        Ok(FeeAmount {
            transaction: transaction_fee,
            account_balances: rent.saturating_mul(created),
            deposit: rent.saturating_mul(deposits),
        })
    }

    async fn lamports_per_signature(&self) -> Result<u64, FeeRelayerError> {
        if let Some(cached) = self.cache.read().lamports_per_signature {
            return Ok(cached);
        }
        let fetched = self
            .rpc
            .get_lamports_per_signature()
            .await?
            .unwrap_or(DEFAULT_LAMPORTS_PER_SIGNATURE);
        self.cache.write().lamports_per_signature = Some(fetched);
        Ok(fetched)
    }

    async fn minimum_token_account_balance(&self) -> Result<u64, FeeRelayerError> {
        if let Some(cached) = self.cache.read().minimum_token_account_balance {
            return Ok(cached);
        }
        let fetched = self
            .rpc
            .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_SPAN)
            .await?;
        self.cache.write().minimum_token_account_balance = Some(fetched);
        Ok(fetched)
    }
}

struct AccountScan {
    created: HashSet<Pubkey>,
    closed: HashSet<Pubkey>,
}

/// Find token accounts the transaction creates and closes
fn scan_accounts(message: &Message) -> AccountScan {
    let mut created = HashSet::new();
    let mut closed = HashSet::new();

    for instruction in &message.instructions {
        let Some(program) = message
            .account_keys
            .get(instruction.program_id_index as usize)
        else {
            continue;
        };

        if *program == spl_associated_token_account::id() {
            // Legacy Create carries no data; newer variants tag 0/1
            let is_create = matches!(instruction.data.first(), None | Some(0) | Some(1));
            if is_create {
                if let Some(account) = account_at(message, instruction.accounts.get(1)) {
                    created.insert(account);
                }
            }
        } else if *program == system_program::id() {
            if let Ok(SystemInstruction::CreateAccount { owner, .. }) =
                deserialize::<SystemInstruction>(&instruction.data)
            {
                // Only token accounts count; a plain system account is not
                // a wrap
                if owner == spl_token::id() {
                    if let Some(account) = account_at(message, instruction.accounts.get(1)) {
                        created.insert(account);
                    }
                }
            }
        } else if *program == spl_token::id()
            && instruction.data.first() == Some(&TOKEN_CLOSE_ACCOUNT_TAG)
        {
            if let Some(account) = account_at(message, instruction.accounts.first()) {
                closed.insert(account);
            }
        }
    }

    AccountScan { created, closed }
}

fn account_at(message: &Message, index: Option<&u8>) -> Option<Pubkey> {
    message.account_keys.get(*index? as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solana_sdk::{
        account::Account, hash::Hash, signature::Keypair, signer::Signer, system_instruction,
    };
    use spl_associated_token_account::instruction::create_associated_token_account;

    struct FrozenRpc;

    #[async_trait]
    impl SolanaRpc for FrozenRpc {
        async fn get_account(&self, _: &Pubkey) -> Result<Option<Account>, FeeRelayerError> {
            Ok(None)
        }

        async fn get_minimum_balance_for_rent_exemption(
            &self,
            _: usize,
        ) -> Result<u64, FeeRelayerError> {
            Ok(2_039_280)
        }

        async fn get_lamports_per_signature(&self) -> Result<Option<u64>, FeeRelayerError> {
            Ok(Some(5000))
        }

        async fn get_latest_blockhash(&self) -> Result<Hash, FeeRelayerError> {
            Ok(Hash::new_unique())
        }
    }

    fn parser(fee_payers: Vec<Pubkey>) -> FeeParser {
        FeeParser::new(Arc::new(FrozenRpc), fee_payers)
    }

    fn transfer_tx(payer: &Pubkey, user: &Keypair) -> Transaction {
        let ix = system_instruction::transfer(&user.pubkey(), payer, 1);
        let message = Message::new_with_blockhash(&[ix], Some(payer), &Hash::new_unique());
        Transaction::new_unsigned(message)
    }

    #[tokio::test]
    async fn test_plain_transfer_is_signature_fee_only() {
        let payer = Pubkey::new_unique();
        let user = Keypair::new();
        let tx = transfer_tx(&payer, &user);

        let fee = parser(vec![]).parse(&tx).await.unwrap();
        assert_eq!(fee, FeeAmount::new(10_000, 0));
    }

    #[tokio::test]
    async fn test_ata_creation_adds_rent() {
        let payer = Pubkey::new_unique();
        let user = Keypair::new();
        let mint = Pubkey::new_unique();
        let create = create_associated_token_account(&payer, &user.pubkey(), &mint, &spl_token::id());
        let pay = system_instruction::transfer(&user.pubkey(), &payer, 1);
        let message =
            Message::new_with_blockhash(&[create, pay], Some(&payer), &Hash::new_unique());
        let tx = Transaction::new_unsigned(message);
        assert_eq!(tx.message.header.num_required_signatures, 2);

        let fee = parser(vec![]).parse(&tx).await.unwrap();
        assert_eq!(
            fee,
            FeeAmount {
                transaction: 10_000,
                account_balances: 2_039_280,
                deposit: 0,
            }
        );
        assert_eq!(fee.total(), 2_049_280);
    }

    #[tokio::test]
    async fn test_self_paid_transfer_costs_one_signature() {
        let payer = Keypair::new();
        let recipient = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer.pubkey(), &recipient, 1);
        let message =
            Message::new_with_blockhash(&[ix], Some(&payer.pubkey()), &Hash::new_unique());
        let tx = Transaction::new_unsigned(message);
        assert_eq!(tx.message.header.num_required_signatures, 1);

        let fee = parser(vec![]).parse(&tx).await.unwrap();
        assert_eq!(fee, FeeAmount::new(5000, 0));
    }

    #[tokio::test]
    async fn test_known_fee_payer_sponsors_signature_fee() {
        let payer = Pubkey::new_unique();
        let user = Keypair::new();
        let tx = transfer_tx(&payer, &user);

        let fee = parser(vec![payer]).parse(&tx).await.unwrap();
        assert_eq!(fee.transaction, 0);

        // Rent still charged even when sponsored
        let mint = Pubkey::new_unique();
        let create = create_associated_token_account(&payer, &user.pubkey(), &mint, &spl_token::id());
        let message = Message::new_with_blockhash(&[create], Some(&payer), &Hash::new_unique());
        let tx = Transaction::new_unsigned(message);
        let fee = parser(vec![payer]).parse(&tx).await.unwrap();
        assert_eq!(fee.transaction, 0);
        assert_eq!(fee.account_balances, 2_039_280);
    }

    #[tokio::test]
    async fn test_wrap_and_close_nets_to_deposit() {
        let payer = Keypair::new();
        let user = Keypair::new();
        let ephemeral = Keypair::new();

        let create = system_instruction::create_account(
            &payer.pubkey(),
            &ephemeral.pubkey(),
            2_039_280,
            TOKEN_ACCOUNT_SPAN as u64,
            &spl_token::id(),
        );
        let close = spl_token::instruction::close_account(
            &spl_token::id(),
            &ephemeral.pubkey(),
            &user.pubkey(),
            &user.pubkey(),
            &[],
        )
        .unwrap();
        let message = Message::new_with_blockhash(
            &[create, close],
            Some(&payer.pubkey()),
            &Hash::new_unique(),
        );
        let tx = Transaction::new_unsigned(message);

        let fee = parser(vec![]).parse(&tx).await.unwrap();
        assert_eq!(fee.account_balances, 0);
        assert_eq!(fee.deposit, 2_039_280);
        // Wrap-then-close rent cancels out in the total
        assert_eq!(fee.total(), fee.transaction);
    }

    #[tokio::test]
    async fn test_clear_cache_refetches() {
        let p = parser(vec![]);
        let payer = Pubkey::new_unique();
        let user = Keypair::new();
        let tx = transfer_tx(&payer, &user);

        p.parse(&tx).await.unwrap();
        assert!(p.cache.read().lamports_per_signature.is_some());
        p.clear_cache();
        assert!(p.cache.read().lamports_per_signature.is_none());
    }
}
