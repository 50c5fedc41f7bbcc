use chrono::Utc;
use shield_core::decryption::{authorize, decrypt_field};
use shield_core::error::WorkflowError;
use shield_core::form::{AssessmentForm, FormField, FormWizard};
use shield_core::local::{
    LocalStack, LocalWallet, RISK_APPROVAL_THRESHOLD, address_of, signing_key_from_seed,
};
use shield_core::services::{
    ContractReader, EncryptionService, HandleContractPair, ServiceError, UserDecryptRequest,
};
use shield_core::session::Session;
use shield_core::submission::{process_assessment, submit_assessment, withdraw_funds};
use std::sync::Arc;
use shield_core::types::StoredField;

fn filled_form() -> AssessmentForm {
    let mut wizard = FormWizard::new();
    wizard.set(FormField::CompanyName, "Acme Robotics");
    wizard.set(FormField::Industry, "technology");
    wizard.set(FormField::Revenue, "1m-10m");
    wizard.set(FormField::Employees, "11-50");
    wizard.advance().unwrap();

    wizard.set(FormField::BusinessType, "low-risk");
    wizard.set(FormField::RiskHistory, "none");
    wizard.set(FormField::SecurityMeasures, "MFA, quarterly audits");
    wizard.set(FormField::ComplianceLevel, "basic");
    wizard.advance().unwrap();

    wizard.set(FormField::CoverageType, "cyber-security");
    wizard.set(FormField::CoverageAmount, "5m");
    wizard.set(FormField::Deductible, "5k");
    assert!(wizard.is_last_step());
    wizard.finish().unwrap()
}

#[tokio::test]
async fn submit_read_process_and_decrypt() {
    let stack = LocalStack::bootstrap("test test test");
    let session = stack.session();
    let contract = stack.contract();
    let user = session.address.unwrap();

    let receipt = submit_assessment(&session, contract.address, filled_form(), "0.01")
        .await
        .unwrap();
    assert_eq!(receipt.deposit_wei, 10_000_000_000_000_000);

    let ids = contract.reader.get_user_assessments(user).await.unwrap();
    assert_eq!(ids.len(), 1);
    let id = ids[0];

    let record = contract.reader.get_assessment(id).await.unwrap();
    assert_eq!(record.owner, user);
    assert_eq!(record.deposit_amount, receipt.deposit_wei);
    assert!(!record.is_processed);

    let stored = contract.reader.get_encrypted_assessment_data(id).await.unwrap();
    assert_eq!(stored.revenue, receipt.handles[0]);
    assert_eq!(stored.deductible, receipt.handles[7]);

    let revenue = decrypt_field(&session, &contract, id, StoredField::Revenue).await.unwrap();
    assert_eq!(revenue.value, 2);
    let industry = decrypt_field(&session, &contract, id, StoredField::Industry).await.unwrap();
    assert_eq!(industry.value, 1);

    // Before processing the score is a trivial zero.
    let score = decrypt_field(&session, &contract, id, StoredField::RiskScore).await.unwrap();
    assert_eq!(score.value, 0);

    process_assessment(&session, contract.address, id).await.unwrap();

    let record = contract.reader.get_assessment(id).await.unwrap();
    assert!(record.is_processed);

    let score = decrypt_field(&session, &contract, id, StoredField::RiskScore).await.unwrap();
    assert_eq!(score.value, 44);
    assert_eq!(record.is_approved, score.value <= RISK_APPROVAL_THRESHOLD);

    let profile = contract.reader.get_user_profile(user).await.unwrap();
    assert!(profile.exists);
    assert_eq!(profile.total_assessments, 1);
    assert_eq!(profile.total_deposits, receipt.deposit_wei);

    let stats = contract.reader.get_contract_stats().await.unwrap();
    assert_eq!(stats.assessments, 1);
    assert_eq!(stats.contract_balance, receipt.deposit_wei);
}

#[tokio::test]
async fn processing_twice_is_rejected() {
    let stack = LocalStack::bootstrap("twice");
    let session = stack.session();
    let contract = stack.contract();

    submit_assessment(&session, contract.address, filled_form(), "0.5")
        .await
        .unwrap();
    let id = contract.reader.get_user_assessments(session.address.unwrap()).await.unwrap()[0];

    process_assessment(&session, contract.address, id).await.unwrap();
    let err = process_assessment(&session, contract.address, id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Transaction(_)));
}

#[tokio::test]
async fn high_risk_assessments_are_not_approved() {
    let stack = LocalStack::bootstrap("risky");
    let session = stack.session();
    let contract = stack.contract();

    let mut form = filled_form();
    form.business_type = "high-risk".into();
    form.risk_history = "major".into();
    form.coverage_amount = "custom".into();

    submit_assessment(&session, contract.address, form, "0.01").await.unwrap();
    let id = contract.reader.get_user_assessments(session.address.unwrap()).await.unwrap()[0];
    process_assessment(&session, contract.address, id).await.unwrap();

    assert!(!contract.reader.get_assessment(id).await.unwrap().is_approved);
}

#[tokio::test]
async fn another_users_stack_cannot_read_the_ciphertexts() {
    let owner = LocalStack::bootstrap("owner");
    let session = owner.session();
    let contract = owner.contract();

    submit_assessment(&session, contract.address, filled_form(), "0.01").await.unwrap();
    let id = contract.reader.get_user_assessments(session.address.unwrap()).await.unwrap()[0];

    // A wallet from a different deployment is not a trusted signer here.
    let stranger = LocalStack::bootstrap("stranger");
    let mut foreign = stranger.session();
    foreign.encryption = session.encryption.clone();

    let err = decrypt_field(&foreign, &contract, id, StoredField::Revenue).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Decryption(_)));
}

#[tokio::test]
async fn expired_or_tampered_grants_are_refused() {
    let stack = LocalStack::bootstrap("grants");
    let session = stack.session();
    let contract = stack.contract();
    let user = session.address.unwrap();

    submit_assessment(&session, contract.address, filled_form(), "0.01").await.unwrap();
    let id = contract.reader.get_user_assessments(user).await.unwrap()[0];
    let handle = contract.reader.get_encrypted_assessment_data(id).await.unwrap().revenue;

    let contracts = vec![contract.address];
    let grant = authorize(&stack.fhe, stack.wallet.as_ref(), &contracts).await.unwrap();
    assert!(!grant.signature.starts_with("0x"));
    assert_eq!(grant.expires_at() - grant.start_timestamp(), 604_800);

    let request = UserDecryptRequest {
        pairs: vec![HandleContractPair {
            handle: handle.clone(),
            contract_address: contract.address,
        }],
        keypair: grant.keypair.clone(),
        signature: grant.signature.clone(),
        contract_addresses: contracts.clone(),
        user_address: user,
        start_timestamp: grant.start_timestamp(),
        duration_days: grant.duration_days(),
    };

    let values = stack.fhe.user_decrypt(request.clone()).await.unwrap();
    assert_eq!(values[&handle], 2);

    // Window already over.
    let mut expired = request.clone();
    expired.start_timestamp = Utc::now().timestamp() - 8 * 86_400;
    assert!(matches!(
        stack.fhe.user_decrypt(expired).await,
        Err(ServiceError::Unauthorized(_))
    ));

    // Signature does not cover a different keypair.
    let mut swapped = request.clone();
    swapped.keypair = stack.fhe.generate_keypair();
    assert!(matches!(
        stack.fhe.user_decrypt(swapped).await,
        Err(ServiceError::Unauthorized(_))
    ));

    // Prefixed signatures are not accepted by the relayer.
    let mut prefixed = request;
    prefixed.signature = format!("0x{}", prefixed.signature);
    assert!(matches!(
        stack.fhe.user_decrypt(prefixed).await,
        Err(ServiceError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn withdrawal_returns_the_deposit_once() {
    let stack = LocalStack::bootstrap("withdraw");
    let session = stack.session();
    let contract = stack.contract();
    let user = session.address.unwrap();

    let receipt = submit_assessment(&session, contract.address, filled_form(), "0.25")
        .await
        .unwrap();
    let id = contract.reader.get_user_assessments(user).await.unwrap()[0];

    withdraw_funds(&session, contract.address, id).await.unwrap();

    let profile = contract.reader.get_user_profile(user).await.unwrap();
    assert_eq!(profile.total_deposits, receipt.deposit_wei);
    assert_eq!(profile.total_withdrawals, receipt.deposit_wei);
    assert_eq!(profile.balance, 0);

    let stats = contract.reader.get_contract_stats().await.unwrap();
    assert_eq!(stats.withdrawals, receipt.deposit_wei);
    assert_eq!(stats.contract_balance, 0);
    assert_eq!(contract.reader.get_assessment(id).await.unwrap().deposit_amount, 0);

    let err = withdraw_funds(&session, contract.address, id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Transaction(_)));
    assert_eq!(contract.reader.get_contract_stats().await.unwrap().withdrawals, receipt.deposit_wei);

    // Processing does not depend on the deposit still being held.
    process_assessment(&session, contract.address, id).await.unwrap();
}

/// A second wallet on the same chain whose key the encryption service also trusts.
fn second_user(stack: &LocalStack, seed: &str) -> Session {
    let key = signing_key_from_seed(seed);
    stack.fhe.trust_signer(address_of(&key.verifying_key()), key.verifying_key());
    let wallet = Arc::new(LocalWallet::new(key, Arc::clone(&stack.chain)));
    Session::connected(wallet, Arc::new(stack.fhe.clone()))
}

#[tokio::test]
async fn only_the_owner_may_withdraw() {
    let stack = LocalStack::bootstrap("owner withdraw");
    let owner = stack.session();
    let other = second_user(&stack, "someone else");
    let contract = stack.contract();

    let receipt = submit_assessment(&owner, contract.address, filled_form(), "0.01")
        .await
        .unwrap();
    let id = contract.reader.get_user_assessments(receipt.submitter).await.unwrap()[0];

    let err = withdraw_funds(&other, contract.address, id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Transaction(_)));
    assert_eq!(contract.reader.get_contract_stats().await.unwrap().withdrawals, 0);
}

#[tokio::test]
async fn trusted_signers_only_decrypt_their_own_handles() {
    let stack = LocalStack::bootstrap("acl");
    let owner = stack.session();
    let other = second_user(&stack, "neighbour");
    let contract = stack.contract();

    submit_assessment(&owner, contract.address, filled_form(), "0.01").await.unwrap();
    let owner_id = contract.reader.get_user_assessments(owner.address.unwrap()).await.unwrap()[0];
    process_assessment(&owner, contract.address, owner_id).await.unwrap();

    for field in [StoredField::Revenue, StoredField::RiskScore] {
        let err = decrypt_field(&other, &contract, owner_id, field).await.unwrap_err();
        let WorkflowError::Decryption(msg) = err else {
            panic!("expected a decryption error, got {err:?}");
        };
        assert!(msg.contains("may not decrypt"), "{msg}");
    }

    // The same signer reads its own submission.
    submit_assessment(&other, contract.address, filled_form(), "0.01").await.unwrap();
    let other_id = contract.reader.get_user_assessments(other.address.unwrap()).await.unwrap()[0];
    let revenue = decrypt_field(&other, &contract, other_id, StoredField::Revenue).await.unwrap();
    assert_eq!(revenue.value, 2);
}
