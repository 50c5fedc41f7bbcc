//! Write path: form → codes → sealed bundle → `submitAssessment` transaction, plus the
//! owner's follow-up transactions on a stored assessment.

use crate::categories::EncodedAssessment;
use crate::constants::NUM_ENCRYPTED_FIELDS;
use crate::deposit::parse_eth_to_wei;
use crate::encryption::encrypt_assessment;
use crate::error::WorkflowError;
use crate::form::AssessmentForm;
use crate::handles::HandleHex;
use crate::session::Session;
use crate::types::{
    Address, AssessmentId, ContractCall, SubmitAssessmentCall, TransactionRequest, TxHash,
};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub tx_hash: TxHash,
    pub submitter: Address,
    pub deposit_wei: u128,
    pub handles: [HandleHex; NUM_ENCRYPTED_FIELDS],
}

/// Encrypt and submit one assessment, attaching `deposit_eth` both as argument and as value.
///
/// The form is consumed: once submitted it is not reused. Wallet and encryption
/// preconditions are checked before the deposit is parsed or anything is encrypted.
pub async fn submit_assessment(
    session: &Session,
    contract: Address,
    form: AssessmentForm,
    deposit_eth: &str,
) -> Result<SubmissionReceipt, WorkflowError> {
    let (submitter, signer) = session.require_wallet()?;
    session.require_encryption()?;

    let deposit_wei = parse_eth_to_wei(deposit_eth)?;

    let encoded = EncodedAssessment::from_form(&form);

    let bundle = encrypt_assessment(session, contract, &encoded).await?;
    let handles = bundle.handles.clone();

    let tx = TransactionRequest {
        to: contract,
        call: ContractCall::SubmitAssessment(SubmitAssessmentCall {
            handles: bundle.handles,
            input_proof: bundle.input_proof,
            deposit_amount: deposit_wei,
        }),
        value: deposit_wei,
    };

    let tx_hash = signer.send_transaction(tx).await.map_err(|e| {
        warn!(error = %e, %contract, "submitAssessment transaction failed");
        WorkflowError::Transaction(e.to_string())
    })?;

    info!(%tx_hash, %submitter, deposit_wei, "assessment submitted");

    Ok(SubmissionReceipt {
        tx_hash,
        submitter,
        deposit_wei,
        handles,
    })
}

/// Ask the contract to compute the encrypted risk score for `id`.
pub async fn process_assessment(
    session: &Session,
    contract: Address,
    id: AssessmentId,
) -> Result<TxHash, WorkflowError> {
    let (_, signer) = session.require_wallet()?;

    let tx = TransactionRequest {
        to: contract,
        call: ContractCall::ProcessAssessment { id },
        value: 0,
    };

    let tx_hash = signer.send_transaction(tx).await.map_err(|e| {
        warn!(error = %e, assessment_id = %id, "processAssessment transaction failed");
        WorkflowError::Transaction(e.to_string())
    })?;

    info!(%tx_hash, assessment_id = %id, "assessment processing requested");
    Ok(tx_hash)
}

/// Ask the contract to return the deposit of `id` to its owner.
pub async fn withdraw_funds(
    session: &Session,
    contract: Address,
    id: AssessmentId,
) -> Result<TxHash, WorkflowError> {
    let (_, signer) = session.require_wallet()?;

    let tx = TransactionRequest {
        to: contract,
        call: ContractCall::WithdrawFunds { id },
        value: 0,
    };

    let tx_hash = signer.send_transaction(tx).await.map_err(|e| {
        warn!(error = %e, assessment_id = %id, "withdrawFunds transaction failed");
        WorkflowError::Transaction(e.to_string())
    })?;

    info!(%tx_hash, assessment_id = %id, "deposit withdrawal requested");
    Ok(tx_hash)
}
