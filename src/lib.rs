//! Client-side fee relay for Solana wallets
//!
//! Lets a wallet pay transaction fees in SPL tokens instead of SOL. The
//! relay service operates a fee payer account that co-signs and fronts
//! fees; this crate keeps a snapshot of the relay's state
//! ([`relay::RelayContext`]), prices operations in SOL and in arbitrary
//! paying tokens ([`fee::FeeCalculator`]), reconstructs fees from
//! assembled transactions ([`fee::FeeParser`]), and builds the partially
//! signed swap and top-up transactions the relay completes
//! ([`tx_builder`]).

pub mod config;
pub mod error;
pub mod fee;
pub mod pools;
pub mod relay;
pub mod relay_api;
pub mod rpc;
pub mod tx_builder;
pub mod types;
pub mod wallet;

pub use config::{Network, OperationType, RelayConfiguration};
pub use error::FeeRelayerError;
pub use fee::{FeeCalculator, FeeParser};
pub use relay::{RelayAccountStatus, RelayContext, RelayContextManager, UsageStatus};
pub use relay_api::{HttpRelayApiClient, RelayApi, RelayTransactionParam, StatsInfo};
pub use rpc::{RpcClientAdapter, SolanaRpc};
pub use tx_builder::{SwapTransactionBuilder, SwapTransactionsOutput, TopUpTransactionBuilder};
pub use types::{FeeAmount, PreparedTransaction, TokenAccount};
pub use wallet::{AccountStorage, Wallet};
