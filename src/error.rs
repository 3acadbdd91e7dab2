//! Error types for the fee relay client
//!
//! A single error taxonomy covers the whole relay lifecycle: context
//! fetching, fee calculation, transaction building and relay API calls.
//! Errors are designed to be:
//! - Informative: enough context to diagnose a failed build or fetch
//! - Composable: easy to convert from underlying error types
//! - Observable: categorized for tracing and UI-facing classification

use thiserror::Error;

/// Error type for all fee relay operations
///
/// Covers the full lifecycle:
/// - Relay context fetching and replacement
/// - Fee calculation and conversion into paying tokens
/// - Swap/top-up transaction building
/// - Communication with the relay HTTP service and the Solana RPC
#[derive(Error, Debug)]
pub enum FeeRelayerError {
    /// No usable relay context (no signing account, or context not yet loaded)
    #[error("Invalid relay context: {0}")]
    InvalidContext(String),

    /// A supplied address fails a structural precondition
    ///
    /// Raised, for example, when the swap source account is the fee payer's
    /// own associated token account.
    #[error("Wrong address: {0}")]
    WrongAddress(String),

    /// No pool route was supplied for a requested conversion
    #[error("Swap pools not found")]
    SwapPoolsNotFound,

    /// A two-hop route is missing its intermediate token mint
    #[error("Transit token mint not found")]
    TransitTokenMintNotFound,

    /// An amount is zero, overflows, or is otherwise unusable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A signature returned by the relay service failed to decode or verify
    #[error("Invalid signature")]
    InvalidSignature,

    /// The requested route shape is not supported (e.g. more than two hops)
    #[error("Unsupported swap")]
    UnsupportedSwap,

    /// Prepared swap data does not match the supplied pool route
    #[error("Invalid swap data: {reason}")]
    InvalidSwapData {
        /// Which consistency check failed
        reason: String,
    },

    /// The source token account holds less than the requested input amount
    #[error("Not enough token balance: expected {expected}, actual {actual}")]
    NotEnoughTokenBalance {
        /// Lamports (or token base units) required
        expected: u64,
        /// Lamports (or token base units) available
        actual: u64,
    },

    /// No recent blockhash was available for transaction assembly
    #[error("Missing blockhash")]
    MissingBlockhash,

    /// A context update was superseded by a newer request
    ///
    /// The caller that observed this did not get its snapshot published;
    /// a fresher update owns the context now. Not a failure of the manager.
    #[error("Context update cancelled by a newer request")]
    UpdateCancelled,

    /// Solana RPC communication failure
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The relay service rejected a request with a structured error body
    #[error("Relay error {code}: {message}")]
    Relay {
        /// Server-side error code
        code: i64,
        /// Human-readable message from the relay service
        message: String,
    },

    /// Transport-level HTTP failure talking to the relay service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to sign or partial-sign a transaction
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Internal invariant violation or unexpected state
    ///
    /// These should be rare and typically indicate bugs
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeeRelayerError {
    /// Check if this error stems from a network-level failure
    ///
    /// UI layers use this to distinguish "try again later" conditions from
    /// structural errors that retrying cannot fix.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Rpc(_) | Self::Http(_) => true,
            Self::Relay { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Get the error category for tracing fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidContext(_) => "context",
            Self::WrongAddress(_) => "validation",
            Self::SwapPoolsNotFound => "pools",
            Self::TransitTokenMintNotFound => "pools",
            Self::InvalidAmount(_) => "amount",
            Self::InvalidSignature => "signature",
            Self::UnsupportedSwap => "validation",
            Self::InvalidSwapData { .. } => "swap_data",
            Self::NotEnoughTokenBalance { .. } => "balance",
            Self::MissingBlockhash => "blockhash",
            Self::UpdateCancelled => "context",
            Self::Rpc(_) => "rpc",
            Self::Relay { .. } => "relay",
            Self::Http(_) => "http",
            Self::Signing(_) => "signing",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl FeeRelayerError {
    /// Create an invalid-context error
    pub fn invalid_context(reason: impl Into<String>) -> Self {
        Self::InvalidContext(reason.into())
    }

    /// Create a wrong-address error
    pub fn wrong_address(reason: impl Into<String>) -> Self {
        Self::WrongAddress(reason.into())
    }

    /// Create an invalid-swap-data error
    pub fn invalid_swap_data(reason: impl Into<String>) -> Self {
        Self::InvalidSwapData {
            reason: reason.into(),
        }
    }

    /// Create an RPC error from any displayable source
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        Self::Rpc(err.to_string())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeeRelayerError::NotEnoughTokenBalance {
            expected: 100,
            actual: 40,
        };
        assert_eq!(
            err.to_string(),
            "Not enough token balance: expected 100, actual 40"
        );

        let err = FeeRelayerError::Relay {
            code: 32600,
            message: "insufficient funds".to_string(),
        };
        assert_eq!(err.to_string(), "Relay error 32600: insufficient funds");
    }

    #[test]
    fn test_network_classification() {
        assert!(FeeRelayerError::Rpc("timeout".to_string()).is_network());
        assert!(FeeRelayerError::Relay {
            code: 502,
            message: "bad gateway".to_string()
        }
        .is_network());

        assert!(!FeeRelayerError::Relay {
            code: 32600,
            message: "rejected".to_string()
        }
        .is_network());
        assert!(!FeeRelayerError::UpdateCancelled.is_network());
        assert!(!FeeRelayerError::wrong_address("source is fee payer ATA").is_network());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(FeeRelayerError::UpdateCancelled.category(), "context");
        assert_eq!(FeeRelayerError::SwapPoolsNotFound.category(), "pools");
        assert_eq!(
            FeeRelayerError::invalid_swap_data("pool mismatch").category(),
            "swap_data"
        );
    }
}
