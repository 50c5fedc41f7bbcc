//! Explicit session context handed to every orchestration function.

use crate::error::WorkflowError;
use crate::services::{ContractReader, EncryptionService, Wallet};
use crate::types::Address;
use std::sync::Arc;

/// The connected account, its signer and the encryption client, if any.
///
/// A wallet counts as connected only when both `address` and `signer` are present.
#[derive(Clone, Default)]
pub struct Session {
    pub address: Option<Address>,
    pub signer: Option<Arc<dyn Wallet>>,
    pub encryption: Option<Arc<dyn EncryptionService>>,
}

impl Session {
    pub fn connected(signer: Arc<dyn Wallet>, encryption: Arc<dyn EncryptionService>) -> Self {
        Self {
            address: Some(signer.address()),
            signer: Some(signer),
            encryption: Some(encryption),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn with_encryption(mut self, encryption: Arc<dyn EncryptionService>) -> Self {
        self.encryption = Some(encryption);
        self
    }

    pub fn without_encryption(mut self) -> Self {
        self.encryption = None;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some() && self.signer.is_some()
    }

    pub(crate) fn require_wallet(&self) -> Result<(Address, &Arc<dyn Wallet>), WorkflowError> {
        match (self.address, self.signer.as_ref()) {
            (Some(address), Some(signer)) => Ok((address, signer)),
            _ => Err(WorkflowError::WalletNotConnected),
        }
    }

    pub(crate) fn require_encryption(&self) -> Result<&Arc<dyn EncryptionService>, WorkflowError> {
        self.encryption
            .as_ref()
            .ok_or(WorkflowError::EncryptionUnavailable)
    }
}

/// The deployed underwriting contract and a reader for its view calls.
#[derive(Clone)]
pub struct ContractContext {
    pub address: Address,
    pub reader: Arc<dyn ContractReader>,
}

impl ContractContext {
    pub fn new(address: Address, reader: Arc<dyn ContractReader>) -> Self {
        Self { address, reader }
    }
}
