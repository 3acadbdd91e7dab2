//! Relay-aware transaction building
//!
//! Builds the partially signed transactions the relay service co-signs:
//! user swaps (direct and transitive) and relay-account top-ups. Chain
//! lookups happen behind the [`checks::DestinationAnalyzer`] and
//! [`checks::TransitTokenAccountManager`] seams plus a [`SolanaRpc`]
//! handle for the source balance check.
//!
//! [`SolanaRpc`]: crate::rpc::SolanaRpc

pub mod builder;
pub mod checks;
pub mod output;
pub mod swap_data;
pub mod top_up;

pub use builder::SwapTransactionBuilder;
pub use checks::{
    DestinationAnalysis, DestinationAnalyzer, RpcDestinationAnalyzer,
    RpcTransitTokenAccountManager, TransitAccountState, TransitTokenAccountManager,
};
pub use output::SwapTransactionsOutput;
pub use swap_data::{DirectSwapData, SwapData, TransitiveSwapData};
pub use top_up::{TopUpTransactionBuilder, TopUpTransactionOutput};
