use crate::deposit::DepositError;
use crate::handles::HandleError;
use thiserror::Error;

/// Failure of a submission or decryption pipeline.
///
/// Precondition errors are raised before any external call is made. The remaining
/// variants carry the collaborator's message unchanged; nothing is retried.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("encryption service not ready")]
    EncryptionUnavailable,

    #[error("invalid deposit: {0}")]
    InvalidDeposit(#[from] DepositError),

    #[error("invalid ciphertext handle: {0}")]
    InvalidHandle(#[from] HandleError),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("contract call failed: {0}")]
    Contract(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

impl WorkflowError {
    /// True for failures detected before anything left the process.
    pub fn is_precondition(&self) -> bool {
        matches!(self, WorkflowError::WalletNotConnected | WorkflowError::EncryptionUnavailable)
    }
}
