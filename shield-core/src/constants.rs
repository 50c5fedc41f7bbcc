//! Crate-wide constants shared by the encoder, the adapters and the orchestrators.

use crate::types::EncryptedField;

/// Number of encrypted input fields carried by `submitAssessment`.
pub const NUM_ENCRYPTED_FIELDS: usize = 8;

/// Contract-mandated order of the encrypted inputs.
///
/// IMPORTANT: This MUST match the parameter order of `submitAssessment` on the contract.
pub const SUBMISSION_ORDER: [EncryptedField; NUM_ENCRYPTED_FIELDS] = [
    EncryptedField::Revenue,
    EncryptedField::Employees,
    EncryptedField::Industry,
    EncryptedField::BusinessType,
    EncryptedField::RiskHistory,
    EncryptedField::ComplianceLevel,
    EncryptedField::CoverageAmount,
    EncryptedField::Deductible,
];

/// Code returned by every category table for unknown or empty input.
pub const DEFAULT_CATEGORY_CODE: u32 = 1;

/// Version of the category tables. Bump whenever a table gains, loses or reorders keys.
pub const CATEGORY_TABLE_VERSION: u32 = 1;

/// Number of wizard steps in the assessment form.
pub const FORM_STEPS: u8 = 3;

/// Decimal places of ETH (1 ETH = 10^18 wei).
pub const WEI_DECIMALS: u32 = 18;

/// 10^18.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Deposit attached to a submission when the caller does not pick one.
pub const DEFAULT_DEPOSIT_ETH: &str = "0.01";

/// Validity window of a decryption grant, in days.
pub const GRANT_DURATION_DAYS: u32 = 7;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Typed-data domain used for decryption authorization statements.
pub const AUTHORIZATION_DOMAIN_NAME: &str = "Decryption";
pub const AUTHORIZATION_DOMAIN_VERSION: &str = "1";
pub const AUTHORIZATION_PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

/// File name of the deployment record written next to the service data.
pub const DEPLOYMENT_RECORD_FILE: &str = "deployment-info.json";
