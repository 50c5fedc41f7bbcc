//! Confidential underwriting workflow for the FHE insurance contract.
//!
//! This crate contains:
//! - Category tables and the form encoder that turn questionnaire answers into small integer codes.
//! - The three-step form model and its per-step validation.
//! - The encryption adapter that seals all eight codes in one bundle with a single proof.
//! - Submission and authorized-decryption orchestrators driven by an explicit `Session`.
//! - Traits for the external collaborators (FHE service, wallet, contract) and in-process
//!   development implementations of them.

pub mod categories;
pub mod constants;
pub mod decryption;
pub mod deployment;
pub mod deposit;
pub mod encryption;
pub mod error;
pub mod form;
pub mod handles;
pub mod local;
pub mod services;
pub mod session;
pub mod submission;
pub mod types;
