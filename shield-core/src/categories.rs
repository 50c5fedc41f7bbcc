//! Category tables and the category encoder.
//!
//! Each categorical form field has exactly one table. The form renderer reads the labels
//! from here and the encoder reads the codes from here, so the two cannot drift apart.
//! A code is the 1-based position of the key in its table.
//!
//! Unknown or empty values encode to the table's first code instead of failing. Nothing
//! upstream validates category values, so a mismatch between the form and a table is
//! silently absorbed here.

use crate::constants::{CATEGORY_TABLE_VERSION, DEFAULT_CATEGORY_CODE, SUBMISSION_ORDER};
use crate::form::AssessmentForm;
use crate::types::EncryptedField;
use serde::Serialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct CategoryOption {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct CategoryTable {
    pub field: &'static str,
    pub version: u32,
    pub options: &'static [CategoryOption],
}

const fn opt(key: &'static str, label: &'static str) -> CategoryOption {
    CategoryOption { key, label }
}

pub static INDUSTRY: CategoryTable = CategoryTable {
    field: "industry",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("technology", "Technology"),
        opt("manufacturing", "Manufacturing"),
        opt("healthcare", "Healthcare"),
        opt("finance", "Finance"),
        opt("retail", "Retail"),
        opt("construction", "Construction"),
        opt("other", "Other"),
    ],
};

pub static REVENUE: CategoryTable = CategoryTable {
    field: "revenue",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("under-1m", "Under $1M"),
        opt("1m-10m", "$1M - $10M"),
        opt("10m-50m", "$10M - $50M"),
        opt("50m-100m", "$50M - $100M"),
        opt("over-100m", "Over $100M"),
    ],
};

pub static EMPLOYEES: CategoryTable = CategoryTable {
    field: "employees",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("1-10", "1-10"),
        opt("11-50", "11-50"),
        opt("51-200", "51-200"),
        opt("201-500", "201-500"),
        opt("500+", "500+"),
    ],
};

pub static BUSINESS_TYPE: CategoryTable = CategoryTable {
    field: "businessType",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("low-risk", "Low Risk Operations"),
        opt("medium-risk", "Medium Risk Operations"),
        opt("high-risk", "High Risk Operations"),
    ],
};

pub static RISK_HISTORY: CategoryTable = CategoryTable {
    field: "riskHistory",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("none", "No Previous Claims"),
        opt("minor", "Minor Claims (Under $10K)"),
        opt("moderate", "Moderate Claims ($10K-$100K)"),
        opt("major", "Major Claims (Over $100K)"),
    ],
};

pub static COMPLIANCE_LEVEL: CategoryTable = CategoryTable {
    field: "complianceLevel",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("basic", "Basic Compliance"),
        opt("standard", "Industry Standard"),
        opt("enhanced", "Enhanced Compliance"),
        opt("premium", "Premium Compliance"),
    ],
};

/// Display only: coverage type is never encrypted or submitted.
pub static COVERAGE_TYPE: CategoryTable = CategoryTable {
    field: "coverageType",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("general-liability", "General Liability"),
        opt("cyber-security", "Cyber Security"),
        opt("professional-liability", "Professional Liability"),
        opt("directors-officers", "Directors & Officers"),
        opt("comprehensive", "Comprehensive Package"),
    ],
};

pub static COVERAGE_AMOUNT: CategoryTable = CategoryTable {
    field: "coverageAmount",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("1m", "$1 Million"),
        opt("5m", "$5 Million"),
        opt("10m", "$10 Million"),
        opt("25m", "$25 Million"),
        opt("50m", "$50 Million"),
        opt("custom", "Custom Amount"),
    ],
};

pub static DEDUCTIBLE: CategoryTable = CategoryTable {
    field: "deductible",
    version: CATEGORY_TABLE_VERSION,
    options: &[
        opt("1k", "$1,000"),
        opt("5k", "$5,000"),
        opt("10k", "$10,000"),
        opt("25k", "$25,000"),
        opt("50k", "$50,000"),
    ],
};

/// All tables, in form order.
pub fn all_tables() -> [&'static CategoryTable; 9] {
    [
        &INDUSTRY,
        &REVENUE,
        &EMPLOYEES,
        &BUSINESS_TYPE,
        &RISK_HISTORY,
        &COMPLIANCE_LEVEL,
        &COVERAGE_TYPE,
        &COVERAGE_AMOUNT,
        &DEDUCTIBLE,
    ]
}

pub fn table_for(field: EncryptedField) -> &'static CategoryTable {
    match field {
        EncryptedField::Revenue => &REVENUE,
        EncryptedField::Employees => &EMPLOYEES,
        EncryptedField::Industry => &INDUSTRY,
        EncryptedField::BusinessType => &BUSINESS_TYPE,
        EncryptedField::RiskHistory => &RISK_HISTORY,
        EncryptedField::ComplianceLevel => &COMPLIANCE_LEVEL,
        EncryptedField::CoverageAmount => &COVERAGE_AMOUNT,
        EncryptedField::Deductible => &DEDUCTIBLE,
    }
}

impl CategoryTable {
    /// Exact-match lookup. `None` for keys the table does not list.
    pub fn code_of(&self, key: &str) -> Option<u32> {
        self.options
            .iter()
            .position(|o| o.key == key)
            .map(|i| i as u32 + 1)
    }

    pub fn label_of(&self, key: &str) -> Option<&'static str> {
        self.options.iter().find(|o| o.key == key).map(|o| o.label)
    }

    /// Lenient lookup: unlisted keys fall back to the first code.
    pub fn encode(&self, value: &str) -> u32 {
        match self.code_of(value) {
            Some(code) => code,
            None => {
                debug!(field = self.field, "unmapped category value, using default code");
                DEFAULT_CATEGORY_CODE
            }
        }
    }
}

pub fn encode(field: EncryptedField, value: &str) -> u32 {
    table_for(field).encode(value)
}

/// A single encoded value, tagged with the width the contract expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodedValue {
    U8(u8),
    U32(u32),
}

impl EncodedValue {
    pub fn as_u32(&self) -> u32 {
        match self {
            EncodedValue::U8(v) => u32::from(*v),
            EncodedValue::U32(v) => *v,
        }
    }
}

/// The eight encrypted fields as integer codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAssessment {
    pub revenue: u32,
    pub employees: u32,
    pub industry: u8,
    pub business_type: u8,
    pub risk_history: u8,
    pub compliance_level: u8,
    pub coverage_amount: u32,
    pub deductible: u32,
}

impl EncodedAssessment {
    pub fn from_form(form: &AssessmentForm) -> Self {
        // 8-bit tables are tiny; `narrow` only matters if one ever outgrows a byte.
        let narrow = |field: EncryptedField, value: &str| -> u8 {
            u8::try_from(encode(field, value)).unwrap_or(DEFAULT_CATEGORY_CODE as u8)
        };

        Self {
            revenue: encode(EncryptedField::Revenue, &form.revenue),
            employees: encode(EncryptedField::Employees, &form.employees),
            industry: narrow(EncryptedField::Industry, &form.industry),
            business_type: narrow(EncryptedField::BusinessType, &form.business_type),
            risk_history: narrow(EncryptedField::RiskHistory, &form.risk_history),
            compliance_level: narrow(EncryptedField::ComplianceLevel, &form.compliance_level),
            coverage_amount: encode(EncryptedField::CoverageAmount, &form.coverage_amount),
            deductible: encode(EncryptedField::Deductible, &form.deductible),
        }
    }

    pub fn value(&self, field: EncryptedField) -> EncodedValue {
        match field {
            EncryptedField::Revenue => EncodedValue::U32(self.revenue),
            EncryptedField::Employees => EncodedValue::U32(self.employees),
            EncryptedField::Industry => EncodedValue::U8(self.industry),
            EncryptedField::BusinessType => EncodedValue::U8(self.business_type),
            EncryptedField::RiskHistory => EncodedValue::U8(self.risk_history),
            EncryptedField::ComplianceLevel => EncodedValue::U8(self.compliance_level),
            EncryptedField::CoverageAmount => EncodedValue::U32(self.coverage_amount),
            EncryptedField::Deductible => EncodedValue::U32(self.deductible),
        }
    }

    /// Codes in `SUBMISSION_ORDER`.
    pub fn in_submission_order(&self) -> [u32; 8] {
        SUBMISSION_ORDER.map(|field| self.value(field).as_u32())
    }
}
