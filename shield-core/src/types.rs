//! Types shared between the encoder, the adapters and the contract surface.
//!
//! Addresses, assessment ids and transaction hashes are exposed as `0x`-prefixed lowercase
//! hex strings to match what the contract call layer expects.

use crate::handles::HandleHex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseHexError {
    #[error("invalid hex value: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

fn parse_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| ParseHexError::InvalidHex(format!("{e}")))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseHexError::InvalidLength { expected: N, got })
}

/// 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseHexError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ParseHexError::InvalidLength { expected: 20, got: bytes.len() })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_hex::<20>(s).map(Self)
    }
}

/// 32-byte word (`bytes32` on the contract side).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bytes32(pub [u8; 32]);

/// Identifier the contract assigns to a submitted assessment.
pub type AssessmentId = Bytes32;

/// Hash of a submitted transaction.
pub type TxHash = Bytes32;

impl Bytes32 {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({self})")
    }
}

impl FromStr for Bytes32 {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_hex::<32>(s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Numeric width the contract expects for an encrypted field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitWidth {
    U8,
    U32,
}

impl BitWidth {
    pub fn max_value(&self) -> u32 {
        match self {
            BitWidth::U8 => u8::MAX as u32,
            BitWidth::U32 => u32::MAX,
        }
    }
}

/// The eight assessment fields submitted in encrypted form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncryptedField {
    Revenue,
    Employees,
    Industry,
    BusinessType,
    RiskHistory,
    ComplianceLevel,
    CoverageAmount,
    Deductible,
}

impl EncryptedField {
    pub fn name(&self) -> &'static str {
        match self {
            EncryptedField::Revenue => "revenue",
            EncryptedField::Employees => "employees",
            EncryptedField::Industry => "industry",
            EncryptedField::BusinessType => "businessType",
            EncryptedField::RiskHistory => "riskHistory",
            EncryptedField::ComplianceLevel => "complianceLevel",
            EncryptedField::CoverageAmount => "coverageAmount",
            EncryptedField::Deductible => "deductible",
        }
    }

    pub fn width(&self) -> BitWidth {
        match self {
            EncryptedField::Revenue
            | EncryptedField::Employees
            | EncryptedField::CoverageAmount
            | EncryptedField::Deductible => BitWidth::U32,
            EncryptedField::Industry
            | EncryptedField::BusinessType
            | EncryptedField::RiskHistory
            | EncryptedField::ComplianceLevel => BitWidth::U8,
        }
    }
}

/// Any field stored on-chain in encrypted form: the eight inputs plus the computed risk score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoredField {
    Revenue,
    Employees,
    Industry,
    BusinessType,
    RiskHistory,
    ComplianceLevel,
    CoverageAmount,
    Deductible,
    RiskScore,
}

impl StoredField {
    pub const ALL: [StoredField; 9] = [
        StoredField::Revenue,
        StoredField::Employees,
        StoredField::Industry,
        StoredField::BusinessType,
        StoredField::RiskHistory,
        StoredField::ComplianceLevel,
        StoredField::CoverageAmount,
        StoredField::Deductible,
        StoredField::RiskScore,
    ];

    pub fn name(&self) -> &'static str {
        match self.as_input() {
            Some(input) => input.name(),
            None => "riskScore",
        }
    }

    /// The submitted input this field corresponds to, if any.
    pub fn as_input(&self) -> Option<EncryptedField> {
        match self {
            StoredField::Revenue => Some(EncryptedField::Revenue),
            StoredField::Employees => Some(EncryptedField::Employees),
            StoredField::Industry => Some(EncryptedField::Industry),
            StoredField::BusinessType => Some(EncryptedField::BusinessType),
            StoredField::RiskHistory => Some(EncryptedField::RiskHistory),
            StoredField::ComplianceLevel => Some(EncryptedField::ComplianceLevel),
            StoredField::CoverageAmount => Some(EncryptedField::CoverageAmount),
            StoredField::Deductible => Some(EncryptedField::Deductible),
            StoredField::RiskScore => None,
        }
    }
}

impl From<EncryptedField> for StoredField {
    fn from(field: EncryptedField) -> Self {
        match field {
            EncryptedField::Revenue => StoredField::Revenue,
            EncryptedField::Employees => StoredField::Employees,
            EncryptedField::Industry => StoredField::Industry,
            EncryptedField::BusinessType => StoredField::BusinessType,
            EncryptedField::RiskHistory => StoredField::RiskHistory,
            EncryptedField::ComplianceLevel => StoredField::ComplianceLevel,
            EncryptedField::CoverageAmount => StoredField::CoverageAmount,
            EncryptedField::Deductible => StoredField::Deductible,
        }
    }
}

impl FromStr for StoredField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoredField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

/// Public assessment record as returned by `getAssessment`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub owner: Address,
    pub id: AssessmentId,
    /// Unix seconds.
    pub timestamp: u64,
    pub is_processed: bool,
    pub is_approved: bool,
    /// Deposit in wei.
    pub deposit_amount: u128,
}

/// Stored ciphertext handles as returned by `getEncryptedAssessmentData`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedAssessmentData {
    pub revenue: HandleHex,
    pub employees: HandleHex,
    pub industry: HandleHex,
    pub business_type: HandleHex,
    pub risk_history: HandleHex,
    pub compliance_level: HandleHex,
    pub coverage_amount: HandleHex,
    pub deductible: HandleHex,
    pub risk_score: HandleHex,
}

impl EncryptedAssessmentData {
    pub fn handle(&self, field: StoredField) -> &HandleHex {
        match field {
            StoredField::Revenue => &self.revenue,
            StoredField::Employees => &self.employees,
            StoredField::Industry => &self.industry,
            StoredField::BusinessType => &self.business_type,
            StoredField::RiskHistory => &self.risk_history,
            StoredField::ComplianceLevel => &self.compliance_level,
            StoredField::CoverageAmount => &self.coverage_amount,
            StoredField::Deductible => &self.deductible,
            StoredField::RiskScore => &self.risk_score,
        }
    }
}

/// Per-user aggregate as returned by `getUserProfile`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub exists: bool,
    pub total_assessments: u64,
    pub total_deposits: u128,
    pub total_withdrawals: u128,
    pub is_active: bool,
    pub balance: u128,
}

/// Contract-wide counters as returned by `getContractStats`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStats {
    pub assessments: u64,
    pub deposits: u128,
    pub withdrawals: u128,
    pub contract_balance: u128,
}

/// Arguments of `submitAssessment`.
///
/// Handle ordering MUST match `constants::SUBMISSION_ORDER`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitAssessmentCall {
    pub handles: [HandleHex; crate::constants::NUM_ENCRYPTED_FIELDS],
    pub input_proof: Vec<u8>,
    pub deposit_amount: u128,
}

/// State-changing contract calls, sent through the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractCall {
    SubmitAssessment(SubmitAssessmentCall),
    ProcessAssessment { id: AssessmentId },
    /// Return the deposit of `id` to its owner.
    WithdrawFunds { id: AssessmentId },
}

impl ContractCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            ContractCall::SubmitAssessment(_) => "submitAssessment",
            ContractCall::ProcessAssessment { .. } => "processAssessment",
            ContractCall::WithdrawFunds { .. } => "withdrawFunds",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    pub call: ContractCall,
    /// Value attached to the transaction, in wei.
    pub value: u128,
}
