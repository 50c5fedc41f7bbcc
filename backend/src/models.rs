use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shield_core::categories::CategoryTable;
use shield_core::form::AssessmentForm;
use uuid::Uuid;

// Wei amounts are decimal strings: they exceed what JSON numbers carry safely.

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub version: u32,
    pub tables: Vec<&'static CategoryTable>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormValidateRequest {
    pub form: AssessmentForm,
    pub step: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormValidateResponse {
    pub step: u8,
    pub valid: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub form: AssessmentForm,

    /// Decimal ETH. Falls back to the configured default.
    pub deposit_eth: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub receipt_id: Uuid,
    /// Id the contract gave the new assessment, when it could be read back.
    pub assessment_id: Option<String>,
    pub tx_hash: String,
    pub deposit_wei: String,
    pub submitter: String,
    /// False when the local journal write failed; the transaction went through regardless.
    pub journaled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub id: String,
    pub owner: String,
    pub timestamp: u64,
    pub is_processed: bool,
    pub is_approved: bool,
    pub deposit_wei: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub assessment_id: String,
    pub tx_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub assessment_id: String,
    pub tx_hash: String,
    pub amount_wei: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptRequest {
    /// One of the stored field names, e.g. `revenue` or `riskScore`.
    pub field: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub assessment_id: String,
    pub field: String,
    pub value: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserAssessmentsResponse {
    pub address: String,
    pub assessment_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub address: String,
    pub exists: bool,
    pub total_assessments: u64,
    pub total_deposits_wei: String,
    pub total_withdrawals_wei: String,
    pub is_active: bool,
    pub balance_wei: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub assessments: u64,
    pub deposits_wei: String,
    pub withdrawals_wei: String,
    pub contract_balance_wei: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionItem {
    pub receipt_id: Uuid,
    pub tx_hash: String,
    pub submitter: String,
    pub deposit_wei: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionListResponse {
    pub offset: u64,
    pub limit: u64,
    pub submissions: Vec<SubmissionItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptionItem {
    pub request_id: Uuid,
    pub assessment_id: String,
    pub field: String,
    pub requester: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptionListResponse {
    pub offset: u64,
    pub limit: u64,
    pub decryptions: Vec<DecryptionItem>,
}
