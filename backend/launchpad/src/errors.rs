//! Application-wide error types.

use alloy_primitives::B256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchpadError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ABI decode error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON-RPC `error` object. `reason` holds the decoded revert string
    /// when the node attached revert data.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        reason: Option<String>,
    },

    #[error("RPC rate limit reached")]
    RateLimited,

    #[error("RPC returned no result for {0}")]
    EmptyResult(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Invalid amount {input:?}: {reason}")]
    Amount { input: String, reason: String },

    #[error("Slippage must be between 0 and 100 percent, got {0}")]
    InvalidSlippage(u32),

    #[error("Agent {0} has not bonded; it has no token or pool yet")]
    NotBonded(u64),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    #[error("Timed out waiting for the receipt of {tx_hash}")]
    ReceiptTimeout { tx_hash: B256 },

    /// A facade operation failed; `message` is the revert reason when one
    /// exists, otherwise the display of `source`.
    #[error("{context}: {message}")]
    Operation {
        context: &'static str,
        message: String,
        source: Box<LaunchpadError>,
    },
}

pub type Result<T> = std::result::Result<T, LaunchpadError>;

impl LaunchpadError {
    /// Revert reason carried by this error or the error it wraps.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            Self::Rpc { reason, .. } => reason.as_deref(),
            Self::Operation { source, .. } => source.revert_reason(),
            _ => None,
        }
    }

    /// The innermost error, looking through [`LaunchpadError::Operation`] layers.
    pub fn root(&self) -> &LaunchpadError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn amount(input: &str, reason: impl Into<String>) -> Self {
        Self::Amount {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Prefixes facade failures with a human-readable context string.
pub trait OperationContext<T> {
    fn wrap_err(self, context: &'static str) -> Result<T>;
}

impl<T> OperationContext<T> for Result<T> {
    fn wrap_err(self, context: &'static str) -> Result<T> {
        self.map_err(|err| match err {
            LaunchpadError::WalletNotConnected | LaunchpadError::Operation { .. } => err,
            other => {
                let message = other
                    .revert_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string());
                LaunchpadError::Operation {
                    context,
                    message,
                    source: Box::new(other),
                }
            }
        })
    }
}
