//! Relay context and on-chain relay program support

pub mod context;
pub mod manager;
pub mod program;

pub use context::{RelayAccountStatus, RelayContext, UsageStatus};
pub use manager::RelayContextManager;
