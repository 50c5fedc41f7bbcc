//! The three-step assessment form.
//!
//! The only rule enforced here is that a step's required fields are non-empty before the
//! wizard advances. Category values are not checked against their tables (see `categories`).

use crate::constants::FORM_STEPS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown form step {0} (expected 1..=3)")]
    UnknownStep(u8),

    #[error("step {step} is missing required fields: {}", .fields.join(", "))]
    MissingFields { step: u8, fields: Vec<&'static str> },
}

/// Raw answers as typed or selected by the applicant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentForm {
    // Step 1: company information.
    pub company_name: String,
    pub industry: String,
    pub revenue: String,
    pub employees: String,

    // Step 2: risk factors.
    pub business_type: String,
    pub risk_history: String,
    pub security_measures: String,
    pub compliance_level: String,

    // Step 3: coverage.
    pub coverage_type: String,
    pub coverage_amount: String,
    pub deductible: String,
    pub additional_notes: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormField {
    CompanyName,
    Industry,
    Revenue,
    Employees,
    BusinessType,
    RiskHistory,
    SecurityMeasures,
    ComplianceLevel,
    CoverageType,
    CoverageAmount,
    Deductible,
    AdditionalNotes,
}

impl FormField {
    pub fn name(&self) -> &'static str {
        match self {
            FormField::CompanyName => "companyName",
            FormField::Industry => "industry",
            FormField::Revenue => "revenue",
            FormField::Employees => "employees",
            FormField::BusinessType => "businessType",
            FormField::RiskHistory => "riskHistory",
            FormField::SecurityMeasures => "securityMeasures",
            FormField::ComplianceLevel => "complianceLevel",
            FormField::CoverageType => "coverageType",
            FormField::CoverageAmount => "coverageAmount",
            FormField::Deductible => "deductible",
            FormField::AdditionalNotes => "additionalNotes",
        }
    }
}

/// Fields that must be non-empty before leaving `step`. `additionalNotes` is never required.
pub fn required_fields(step: u8) -> Result<&'static [FormField], FormError> {
    match step {
        1 => Ok(&[
            FormField::CompanyName,
            FormField::Industry,
            FormField::Revenue,
            FormField::Employees,
        ]),
        2 => Ok(&[
            FormField::BusinessType,
            FormField::RiskHistory,
            FormField::SecurityMeasures,
            FormField::ComplianceLevel,
        ]),
        3 => Ok(&[
            FormField::CoverageType,
            FormField::CoverageAmount,
            FormField::Deductible,
        ]),
        other => Err(FormError::UnknownStep(other)),
    }
}

impl AssessmentForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::CompanyName => &self.company_name,
            FormField::Industry => &self.industry,
            FormField::Revenue => &self.revenue,
            FormField::Employees => &self.employees,
            FormField::BusinessType => &self.business_type,
            FormField::RiskHistory => &self.risk_history,
            FormField::SecurityMeasures => &self.security_measures,
            FormField::ComplianceLevel => &self.compliance_level,
            FormField::CoverageType => &self.coverage_type,
            FormField::CoverageAmount => &self.coverage_amount,
            FormField::Deductible => &self.deductible,
            FormField::AdditionalNotes => &self.additional_notes,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::CompanyName => &mut self.company_name,
            FormField::Industry => &mut self.industry,
            FormField::Revenue => &mut self.revenue,
            FormField::Employees => &mut self.employees,
            FormField::BusinessType => &mut self.business_type,
            FormField::RiskHistory => &mut self.risk_history,
            FormField::SecurityMeasures => &mut self.security_measures,
            FormField::ComplianceLevel => &mut self.compliance_level,
            FormField::CoverageType => &mut self.coverage_type,
            FormField::CoverageAmount => &mut self.coverage_amount,
            FormField::Deductible => &mut self.deductible,
            FormField::AdditionalNotes => &mut self.additional_notes,
        };
        *slot = value.into();
    }

    /// Required fields of `step` that are empty or whitespace-only.
    pub fn missing_fields(&self, step: u8) -> Result<Vec<&'static str>, FormError> {
        Ok(required_fields(step)?
            .iter()
            .filter(|f| self.value(**f).trim().is_empty())
            .map(|f| f.name())
            .collect())
    }

    pub fn validate_step(&self, step: u8) -> Result<(), FormError> {
        let fields = self.missing_fields(step)?;
        if fields.is_empty() {
            Ok(())
        } else {
            Err(FormError::MissingFields { step, fields })
        }
    }

    /// Validate every step, reporting the first incomplete one.
    pub fn validate_all(&self) -> Result<(), FormError> {
        (1..=FORM_STEPS).try_for_each(|step| self.validate_step(step))
    }
}

/// Step-by-step collector around an `AssessmentForm`.
#[derive(Clone, Debug)]
pub struct FormWizard {
    form: AssessmentForm,
    step: u8,
}

impl Default for FormWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl FormWizard {
    pub fn new() -> Self {
        Self {
            form: AssessmentForm::default(),
            step: 1,
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn form(&self) -> &AssessmentForm {
        &self.form
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    /// Completion percentage shown next to the step counter.
    pub fn progress(&self) -> u8 {
        (u16::from(self.step) * 100 / u16::from(FORM_STEPS)) as u8
    }

    pub fn is_last_step(&self) -> bool {
        self.step == FORM_STEPS
    }

    /// Advance one step if the current step is complete. Stays on the last step.
    pub fn advance(&mut self) -> Result<u8, FormError> {
        self.form.validate_step(self.step)?;
        if self.step < FORM_STEPS {
            self.step += 1;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> u8 {
        if self.step > 1 {
            self.step -= 1;
        }
        self.step
    }

    /// Hand the collected answers to the encoder. The form is unchanged.
    pub fn finish(self) -> Result<AssessmentForm, FormError> {
        self.form.validate_all()?;
        Ok(self.form)
    }
}
