//! Read path: stored handle → fresh grant → wallet signature → authorized decryption.
//!
//! A grant is built for every request and dropped afterwards; nothing is cached, even when
//! the same field is decrypted twice in a row.

use crate::constants::{GRANT_DURATION_DAYS, SECONDS_PER_DAY};
use crate::error::WorkflowError;
use crate::handles::HandleHex;
use crate::services::{
    AuthorizationStatement, EncryptionService, FheKeypair, HandleContractPair, UserDecryptRequest,
    Wallet,
};
use crate::session::{ContractContext, Session};
use crate::types::{Address, AssessmentId, StoredField};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

/// Time-boxed permission for one keypair to decrypt ciphertexts of the listed contracts.
#[derive(Clone, Debug)]
pub struct DecryptionGrant {
    pub keypair: FheKeypair,
    pub statement: AuthorizationStatement,
    /// Wallet signature with the `0x` prefix removed.
    pub signature: String,
}

impl DecryptionGrant {
    pub fn start_timestamp(&self) -> i64 {
        self.statement.message.start_timestamp
    }

    pub fn duration_days(&self) -> u32 {
        self.statement.message.duration_days
    }

    /// End of the validity window (exclusive), unix seconds.
    pub fn expires_at(&self) -> i64 {
        self.start_timestamp() + i64::from(self.duration_days()) * SECONDS_PER_DAY
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedField {
    pub assessment_id: AssessmentId,
    pub field: StoredField,
    pub handle: HandleHex,
    pub value: u64,
}

pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Build a brand-new grant: fresh keypair, statement starting now, wallet signature.
pub async fn authorize(
    service: &dyn EncryptionService,
    signer: &dyn Wallet,
    contracts: &[Address],
) -> Result<DecryptionGrant, WorkflowError> {
    let keypair = service.generate_keypair();
    let start_timestamp = Utc::now().timestamp();

    let statement = service.create_authorization(
        &keypair.public_key,
        contracts,
        start_timestamp,
        GRANT_DURATION_DAYS,
    );

    let signature = signer.sign_typed_data(&statement).await.map_err(|e| {
        warn!(error = %e, "signing decryption authorization failed");
        WorkflowError::Signing(e.to_string())
    })?;

    Ok(DecryptionGrant {
        keypair,
        statement,
        signature: strip_hex_prefix(&signature).to_string(),
    })
}

/// Decrypt one stored field of assessment `id`.
pub async fn decrypt_field(
    session: &Session,
    contract: &ContractContext,
    id: AssessmentId,
    field: StoredField,
) -> Result<DecryptedField, WorkflowError> {
    let (user_address, signer) = session.require_wallet()?;
    let service = session.require_encryption()?;

    let data = contract
        .reader
        .get_encrypted_assessment_data(id)
        .await
        .map_err(|e| {
            warn!(error = %e, assessment_id = %id, "reading encrypted assessment failed");
            WorkflowError::Contract(e.to_string())
        })?;
    let handle = data.handle(field).clone();

    let contracts = vec![contract.address];
    let grant = authorize(service.as_ref(), signer.as_ref(), &contracts).await?;

    let request = UserDecryptRequest {
        pairs: vec![HandleContractPair {
            handle: handle.clone(),
            contract_address: contract.address,
        }],
        keypair: grant.keypair.clone(),
        signature: grant.signature.clone(),
        contract_addresses: contracts,
        user_address,
        start_timestamp: grant.start_timestamp(),
        duration_days: grant.duration_days(),
    };

    let values = service.user_decrypt(request).await.map_err(|e| {
        warn!(error = %e, assessment_id = %id, field = field.name(), "user decryption failed");
        WorkflowError::Decryption(e.to_string())
    })?;

    let value = values.get(&handle).copied().ok_or_else(|| {
        WorkflowError::Decryption(format!("result does not contain handle {handle}"))
    })?;

    info!(assessment_id = %id, field = field.name(), "field decrypted");

    Ok(DecryptedField {
        assessment_id: id,
        field,
        handle,
        value,
    })
}
