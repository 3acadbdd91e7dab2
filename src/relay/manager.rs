//! Relay context manager
//!
//! Owns the current [`RelayContext`] snapshot and keeps it fresh. Updates
//! are single-flight with cancel-and-restart semantics: a new `update`
//! aborts any in-flight fetch and starts over, so the freshest request
//! always wins and at most one fetch runs at a time. Publication is
//! all-or-nothing; a failed fetch leaves the previous snapshot in place.

use solana_sdk::{account::Account, pubkey::Pubkey, signer::Signer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::FeeRelayerError;
use crate::fee::DEFAULT_LAMPORTS_PER_SIGNATURE;
use crate::relay::context::{RelayAccountStatus, RelayContext};
use crate::relay::program;
use crate::relay_api::RelayApi;
use crate::rpc::SolanaRpc;
use crate::wallet::AccountStorage;

/// Byte size of an SPL token account
const TOKEN_ACCOUNT_SPAN: usize = 165;

struct Shared {
    sender: watch::Sender<Option<RelayContext>>,
    /// Monotonic update counter; a fetch publishes only if it still owns
    /// the latest generation when it completes
    generation: AtomicU64,
    /// Serializes the generation check with the publish itself
    publish_lock: parking_lot::Mutex<()>,
}

impl Shared {
    /// Publish `context` if `generation` is still current
    fn try_publish(&self, generation: u64, context: RelayContext) -> Result<RelayContext, FeeRelayerError> {
        let _guard = self.publish_lock.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(FeeRelayerError::UpdateCancelled);
        }
        self.sender.send_replace(Some(context.clone()));
        Ok(context)
    }
}

/// Manages fetching, caching and broadcasting the relay context
pub struct RelayContextManager {
    account_storage: Arc<dyn AccountStorage>,
    rpc: Arc<dyn SolanaRpc>,
    relay_api: Arc<dyn RelayApi>,
    relay_program_id: Pubkey,
    shared: Arc<Shared>,
    in_flight: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl RelayContextManager {
    pub fn new(
        account_storage: Arc<dyn AccountStorage>,
        rpc: Arc<dyn SolanaRpc>,
        relay_api: Arc<dyn RelayApi>,
        relay_program_id: Pubkey,
    ) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            account_storage,
            rpc,
            relay_api,
            relay_program_id,
            shared: Arc::new(Shared {
                sender,
                generation: AtomicU64::new(0),
                publish_lock: parking_lot::Mutex::new(()),
            }),
            in_flight: parking_lot::Mutex::new(None),
        }
    }

    /// Latest published snapshot, `None` before the first successful update
    pub fn current_context(&self) -> Option<RelayContext> {
        self.shared.sender.borrow().clone()
    }

    /// Subscribe to context changes; the receiver replays the latest value
    pub fn subscribe(&self) -> watch::Receiver<Option<RelayContext>> {
        self.shared.sender.subscribe()
    }

    /// Fetch a fresh context and publish it
    ///
    /// Cancel-and-restart: any in-flight update is aborted and its caller
    /// observes [`FeeRelayerError::UpdateCancelled`]. All six backing
    /// fetches must succeed before anything is published.
    #[instrument(skip_all, err)]
    pub async fn update(&self) -> Result<RelayContext, FeeRelayerError> {
        let account = self
            .account_storage
            .account()
            .ok_or_else(|| FeeRelayerError::invalid_context("no signing account configured"))?;
        let user = account.pubkey();

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (result_tx, result_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let rpc = Arc::clone(&self.rpc);
        let relay_api = Arc::clone(&self.relay_api);
        let relay_program_id = self.relay_program_id;

        let handle = tokio::spawn(async move {
            let fetched = fetch_context(&*rpc, &*relay_api, &user, &relay_program_id).await;
            let outcome = match fetched {
                Ok(context) => shared.try_publish(generation, context),
                Err(e) => Err(e),
            };
            // Receiver may be gone if the caller was dropped
            let _ = result_tx.send(outcome);
        });

        if let Some(previous) = self.in_flight.lock().replace(handle) {
            debug!("superseding in-flight context update");
            previous.abort();
        }

        result_rx
            .await
            .map_err(|_| FeeRelayerError::UpdateCancelled)?
    }

    /// Replace the current context with a locally computed snapshot
    ///
    /// Used after operations whose effect on the context is known without
    /// a refetch (e.g. a top-up that funded the relay account). Invalidates
    /// any in-flight fetch so it cannot clobber the override.
    pub fn replace_context(&self, context: RelayContext) {
        let _guard = self.shared.publish_lock.lock();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.sender.send_replace(Some(context));
    }
}

fn relay_account_status(account: Option<Account>) -> RelayAccountStatus {
    match account {
        None => RelayAccountStatus::NotYetCreated,
        Some(account) if account.lamports == 0 => RelayAccountStatus::Empty,
        Some(account) => RelayAccountStatus::Created {
            balance: account.lamports,
        },
    }
}

async fn fetch_context(
    rpc: &dyn SolanaRpc,
    relay_api: &dyn RelayApi,
    user: &Pubkey,
    relay_program_id: &Pubkey,
) -> Result<RelayContext, FeeRelayerError> {
    let relay_address = program::user_relay_address(user, relay_program_id);

    let (
        minimum_token_account_balance,
        minimum_relay_account_balance,
        lamports_per_signature,
        fee_payer_address,
        relay_account,
        usage_status,
    ) = tokio::try_join!(
        rpc.get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_SPAN),
        rpc.get_minimum_balance_for_rent_exemption(0),
        async {
            match rpc.get_lamports_per_signature().await? {
                Some(lps) => Ok(lps),
                None => {
                    warn!("node reported no fee schedule, using default signature fee");
                    Ok(DEFAULT_LAMPORTS_PER_SIGNATURE)
                }
            }
        },
        relay_api.fee_payer_pubkey(),
        rpc.get_account(&relay_address),
        relay_api.free_fee_limits(user),
    )?;

    Ok(RelayContext {
        minimum_token_account_balance,
        minimum_relay_account_balance,
        fee_payer_address,
        lamports_per_signature,
        relay_account_status: relay_account_status(relay_account),
        usage_status,
    })
}
