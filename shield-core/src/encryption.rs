//! Encryption adapter: one sealed bundle per submission.

use crate::categories::{EncodedAssessment, EncodedValue};
use crate::constants::{NUM_ENCRYPTED_FIELDS, SUBMISSION_ORDER};
use crate::error::WorkflowError;
use crate::handles::{HandleHex, canonical_hex, normalize_handle};
use crate::session::Session;
use crate::types::{Address, EncryptedField};
use tracing::{debug, warn};

/// Eight normalized handles in `SUBMISSION_ORDER` plus the proof covering all of them.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedBundle {
    pub handles: [HandleHex; NUM_ENCRYPTED_FIELDS],
    pub input_proof: Vec<u8>,
}

impl EncryptedBundle {
    pub fn handle(&self, field: EncryptedField) -> &HandleHex {
        let index = SUBMISSION_ORDER
            .iter()
            .position(|f| *f == field)
            .unwrap_or_default();
        &self.handles[index]
    }

    pub fn proof_hex(&self) -> String {
        canonical_hex(&self.input_proof)
    }
}

/// Seal `encoded` against (`contract`, session account) with a single encryption call.
///
/// Fails with a precondition error if the session has no account or no encryption service.
pub async fn encrypt_assessment(
    session: &Session,
    contract: Address,
    encoded: &EncodedAssessment,
) -> Result<EncryptedBundle, WorkflowError> {
    let submitter = session.address.ok_or(WorkflowError::WalletNotConnected)?;
    let service = session.require_encryption()?;

    let mut input = service.create_encrypted_input(contract, submitter);
    for field in SUBMISSION_ORDER {
        match encoded.value(field) {
            EncodedValue::U8(v) => input.add8(v),
            EncodedValue::U32(v) => input.add32(v),
        }
    }

    let sealed = input.encrypt().await.map_err(|e| {
        warn!(error = %e, %contract, "sealing encrypted input failed");
        WorkflowError::Encryption(e.to_string())
    })?;

    if sealed.handles.len() != NUM_ENCRYPTED_FIELDS {
        warn!(got = sealed.handles.len(), "encryption service returned wrong handle count");
        return Err(WorkflowError::Encryption(format!(
            "expected {NUM_ENCRYPTED_FIELDS} handles, got {}",
            sealed.handles.len()
        )));
    }

    let normalized = sealed
        .handles
        .iter()
        .map(normalize_handle)
        .collect::<Result<Vec<_>, _>>()?;

    let handles: [HandleHex; NUM_ENCRYPTED_FIELDS] = normalized
        .try_into()
        .map_err(|_| WorkflowError::Encryption("handle count changed during normalization".into()))?;

    debug!(%contract, %submitter, proof_len = sealed.input_proof.len(), "assessment sealed");

    Ok(EncryptedBundle {
        handles,
        input_proof: sealed.input_proof,
    })
}
