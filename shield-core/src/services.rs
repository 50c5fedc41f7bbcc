//! Seams to the external collaborators: the FHE service, the wallet and the contract.
//!
//! Nothing in this crate implements encryption, signing or contract execution for real;
//! the orchestrators only call through these traits. `crate::local` provides in-process
//! development implementations.

use crate::constants::{
    AUTHORIZATION_DOMAIN_NAME, AUTHORIZATION_DOMAIN_VERSION, AUTHORIZATION_PRIMARY_TYPE,
};
use crate::handles::{HandleHex, RawHandle};
use crate::types::{
    Address, Assessment, AssessmentId, ContractStats, EncryptedAssessmentData, TransactionRequest,
    TxHash, UserProfile,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("encryption service failure: {0}")]
    Failed(String),

    #[error("decryption not authorized: {0}")]
    Unauthorized(String),

    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(HandleHex),
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Output of sealing an encrypted-input builder.
#[derive(Clone, Debug)]
pub struct SealedInput {
    pub handles: Vec<RawHandle>,
    pub input_proof: Vec<u8>,
}

/// One-time keypair for a single decryption request.
#[derive(Clone, PartialEq, Eq)]
pub struct FheKeypair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for FheKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FheKeypair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationMessage {
    pub public_key: String,
    pub contract_addresses: Vec<Address>,
    /// Unix seconds.
    pub start_timestamp: i64,
    pub duration_days: u32,
}

/// Typed-data statement a wallet signs to authorize one keypair to decrypt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationStatement {
    pub domain: TypedDataDomain,
    pub primary_type: String,
    pub message: AuthorizationMessage,
}

impl AuthorizationStatement {
    pub fn new(domain: TypedDataDomain, message: AuthorizationMessage) -> Self {
        Self {
            domain,
            primary_type: AUTHORIZATION_PRIMARY_TYPE.to_string(),
            message,
        }
    }

    /// Domain for statements verified by `verifying_contract` on `chain_id`.
    pub fn domain(chain_id: u64, verifying_contract: Address) -> TypedDataDomain {
        TypedDataDomain {
            name: AUTHORIZATION_DOMAIN_NAME.to_string(),
            version: AUTHORIZATION_DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// Digest that signers sign and verifiers check.
    ///
    /// SHA-256 over the canonical JSON encoding; field order is fixed by the struct layout.
    pub fn signing_digest(&self) -> Result<[u8; 32], serde_json::Error> {
        let encoded = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&encoded).into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: HandleHex,
    pub contract_address: Address,
}

/// Everything the FHE service needs to perform an authorized decryption.
#[derive(Clone, Debug)]
pub struct UserDecryptRequest {
    pub pairs: Vec<HandleContractPair>,
    pub keypair: FheKeypair,
    /// Wallet signature without the `0x` prefix.
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: i64,
    pub duration_days: u32,
}

pub type DecryptedValues = HashMap<HandleHex, u64>;

/// Encrypted-input builder scoped to one (contract, user) pair.
#[async_trait]
pub trait EncryptedInput: Send {
    fn add8(&mut self, value: u8);

    fn add32(&mut self, value: u32);

    /// Seal every appended value into one bundle with a single proof.
    async fn encrypt(self: Box<Self>) -> Result<SealedInput, ServiceError>;
}

#[async_trait]
pub trait EncryptionService: Send + Sync {
    fn create_encrypted_input(&self, contract: Address, user: Address) -> Box<dyn EncryptedInput>;

    fn generate_keypair(&self) -> FheKeypair;

    fn create_authorization(
        &self,
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: i64,
        duration_days: u32,
    ) -> AuthorizationStatement;

    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<DecryptedValues, ServiceError>;
}

#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    /// Returns a `0x`-prefixed hex signature.
    async fn sign_typed_data(&self, statement: &AuthorizationStatement) -> Result<String, WalletError>;

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError>;
}

/// Read-only view calls on the underwriting contract.
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, ContractError>;

    async fn get_encrypted_assessment_data(
        &self,
        id: AssessmentId,
    ) -> Result<EncryptedAssessmentData, ContractError>;

    async fn get_user_assessments(&self, user: Address) -> Result<Vec<AssessmentId>, ContractError>;

    async fn get_user_profile(&self, user: Address) -> Result<UserProfile, ContractError>;

    async fn get_contract_stats(&self) -> Result<ContractStats, ContractError>;
}
