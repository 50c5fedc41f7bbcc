//! In-memory underwriting contract.
//!
//! Mirrors the state transitions of the deployed contract closely enough for development:
//! payable submission with proof check, owner-only processing and withdrawal, and the view
//! calls.

use super::fhe::LocalFhe;
use crate::constants::NUM_ENCRYPTED_FIELDS;
use crate::handles::HandleHex;
use crate::services::{ContractError, ContractReader};
use crate::types::{
    Address, Assessment, AssessmentId, Bytes32, ContractCall, ContractStats,
    EncryptedAssessmentData, SubmitAssessmentCall, TransactionRequest, TxHash, UserProfile,
};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Scores at or below this are approved.
pub const RISK_APPROVAL_THRESHOLD: u64 = 50;

/// Risk score computed from the submitted codes, in submission order.
///
/// Business type and claims history dominate; better compliance lowers the score; larger
/// coverage raises it.
pub fn risk_score(codes: &[u64]) -> u64 {
    let [_revenue, _employees, _industry, business_type, risk_history, compliance, coverage, _deductible] =
        codes
    else {
        return u64::MAX;
    };
    10 * (business_type + risk_history) + 5 * 5u64.saturating_sub(*compliance) + 2 * coverage
}

struct StoredAssessment {
    record: Assessment,
    data: EncryptedAssessmentData,
}

#[derive(Default)]
struct ChainState {
    assessments: HashMap<AssessmentId, StoredAssessment>,
    by_user: HashMap<Address, Vec<AssessmentId>>,
    profiles: HashMap<Address, UserProfile>,
    stats: ContractStats,
    nonce: u64,
}

pub struct LocalChain {
    address: Address,
    fhe: LocalFhe,
    state: Mutex<ChainState>,
}

impl LocalChain {
    /// "Deploy" a fresh contract; its address is derived from the deployer.
    pub fn deploy(fhe: LocalFhe, deployer: Address) -> Arc<Self> {
        let digest = Sha256::new()
            .chain_update(b"shield-local-chain/contract")
            .chain_update(deployer.as_bytes())
            .finalize();

        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..]);

        Arc::new(Self {
            address: Address(address),
            fhe,
            state: Mutex::new(ChainState::default()),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Apply a transaction sent by `from`.
    pub fn execute(&self, from: Address, tx: TransactionRequest) -> Result<TxHash, ContractError> {
        if tx.to != self.address {
            return Err(ContractError::Reverted(format!("no contract at {}", tx.to)));
        }

        let mut state = self.lock();
        match tx.call {
            ContractCall::SubmitAssessment(call) => self.submit(&mut state, from, call, tx.value)?,
            ContractCall::ProcessAssessment { id } => {
                if tx.value != 0 {
                    return Err(ContractError::Reverted("processAssessment is not payable".into()));
                }
                self.process(&mut state, from, id)?
            }
            ContractCall::WithdrawFunds { id } => {
                if tx.value != 0 {
                    return Err(ContractError::Reverted("withdrawFunds is not payable".into()));
                }
                self.withdraw(&mut state, from, id)?
            }
        }

        Ok(next_id(&mut state, b"shield-local-chain/tx", from))
    }

    fn submit(
        &self,
        state: &mut ChainState,
        from: Address,
        call: SubmitAssessmentCall,
        value: u128,
    ) -> Result<(), ContractError> {
        if value != call.deposit_amount {
            return Err(ContractError::Reverted("attached value does not match deposit".into()));
        }

        let expected = LocalFhe::input_proof(self.address, from, &call.handles);
        if call.input_proof != expected {
            return Err(ContractError::Reverted("invalid input proof".into()));
        }

        let [revenue, employees, industry, business_type, risk_history, compliance_level, coverage_amount, deductible]: [HandleHex; NUM_ENCRYPTED_FIELDS] =
            call.handles;

        let id = next_id(state, b"shield-local-chain/assessment", from);
        let timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or_default();

        let stored = StoredAssessment {
            record: Assessment {
                owner: from,
                id,
                timestamp,
                is_processed: false,
                is_approved: false,
                deposit_amount: value,
            },
            data: EncryptedAssessmentData {
                revenue,
                employees,
                industry,
                business_type,
                risk_history,
                compliance_level,
                coverage_amount,
                deductible,
                risk_score: self.fhe.trivial_encrypt(self.address, 0, from),
            },
        };

        state.assessments.insert(id, stored);
        state.by_user.entry(from).or_default().push(id);

        let profile = state.profiles.entry(from).or_default();
        profile.exists = true;
        profile.is_active = true;
        profile.total_assessments += 1;
        profile.total_deposits += value;
        profile.balance += value;

        state.stats.assessments += 1;
        state.stats.deposits += value;
        state.stats.contract_balance += value;

        debug!(assessment_id = %id, owner = %from, "local chain stored assessment");
        Ok(())
    }

    fn process(&self, state: &mut ChainState, from: Address, id: AssessmentId) -> Result<(), ContractError> {
        let stored = state
            .assessments
            .get_mut(&id)
            .ok_or_else(|| ContractError::NotFound(format!("assessment {id}")))?;

        if stored.record.owner != from {
            return Err(ContractError::Reverted("caller is not the assessment owner".into()));
        }
        if stored.record.is_processed {
            return Err(ContractError::Reverted("assessment already processed".into()));
        }

        let d = &stored.data;
        let inputs = [
            d.revenue.clone(),
            d.employees.clone(),
            d.industry.clone(),
            d.business_type.clone(),
            d.risk_history.clone(),
            d.compliance_level.clone(),
            d.coverage_amount.clone(),
            d.deductible.clone(),
        ];

        let (score_handle, score) = self
            .fhe
            .evaluate(self.address, from, &inputs, risk_score)
            .map_err(|e| ContractError::Reverted(e.to_string()))?;

        stored.data.risk_score = score_handle;
        stored.record.is_processed = true;
        stored.record.is_approved = score <= RISK_APPROVAL_THRESHOLD;

        debug!(assessment_id = %id, approved = stored.record.is_approved, "local chain processed assessment");
        Ok(())
    }

    /// Pay the deposit of `id` back out of the owner's balance. Each deposit leaves once.
    fn withdraw(&self, state: &mut ChainState, from: Address, id: AssessmentId) -> Result<(), ContractError> {
        let stored = state
            .assessments
            .get_mut(&id)
            .ok_or_else(|| ContractError::NotFound(format!("assessment {id}")))?;

        if stored.record.owner != from {
            return Err(ContractError::Reverted("caller is not the assessment owner".into()));
        }
        let amount = stored.record.deposit_amount;
        if amount == 0 {
            return Err(ContractError::Reverted("no funds to withdraw".into()));
        }

        let profile = state.profiles.entry(from).or_default();
        if profile.balance < amount {
            return Err(ContractError::Reverted("insufficient balance".into()));
        }
        profile.balance -= amount;
        profile.total_withdrawals += amount;
        stored.record.deposit_amount = 0;

        state.stats.withdrawals += amount;
        state.stats.contract_balance = state.stats.contract_balance.saturating_sub(amount);

        debug!(assessment_id = %id, owner = %from, amount, "local chain paid out deposit");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn next_id(state: &mut ChainState, domain: &[u8], from: Address) -> Bytes32 {
    state.nonce += 1;
    let digest = Sha256::new()
        .chain_update(domain)
        .chain_update(from.as_bytes())
        .chain_update(state.nonce.to_be_bytes())
        .finalize();
    Bytes32(digest.into())
}

#[async_trait]
impl ContractReader for LocalChain {
    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, ContractError> {
        self.lock()
            .assessments
            .get(&id)
            .map(|s| s.record.clone())
            .ok_or_else(|| ContractError::NotFound(format!("assessment {id}")))
    }

    async fn get_encrypted_assessment_data(
        &self,
        id: AssessmentId,
    ) -> Result<EncryptedAssessmentData, ContractError> {
        self.lock()
            .assessments
            .get(&id)
            .map(|s| s.data.clone())
            .ok_or_else(|| ContractError::NotFound(format!("assessment {id}")))
    }

    async fn get_user_assessments(&self, user: Address) -> Result<Vec<AssessmentId>, ContractError> {
        Ok(self.lock().by_user.get(&user).cloned().unwrap_or_default())
    }

    async fn get_user_profile(&self, user: Address) -> Result<UserProfile, ContractError> {
        Ok(self.lock().profiles.get(&user).cloned().unwrap_or_default())
    }

    async fn get_contract_stats(&self) -> Result<ContractStats, ContractError> {
        Ok(self.lock().stats.clone())
    }
}
