use async_trait::async_trait;
use shield_core::constants::{GRANT_DURATION_DAYS, NUM_ENCRYPTED_FIELDS, SECONDS_PER_DAY};
use shield_core::decryption::decrypt_field;
use shield_core::error::WorkflowError;
use shield_core::form::AssessmentForm;
use shield_core::handles::{HandleError, HandleHex, RawHandle};
use shield_core::services::{
    AuthorizationMessage, AuthorizationStatement, ContractError, ContractReader, DecryptedValues,
    EncryptedInput, EncryptionService, FheKeypair, SealedInput, ServiceError, UserDecryptRequest,
    Wallet, WalletError,
};
use shield_core::session::{ContractContext, Session};
use shield_core::submission::{process_assessment, submit_assessment, withdraw_funds};
use shield_core::types::{
    Address, Assessment, AssessmentId, Bytes32, ContractCall, ContractStats,
    EncryptedAssessmentData, StoredField, TransactionRequest, TxHash, UserProfile,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const CONTRACT: Address = Address([0xc0; 20]);
const USER: Address = Address([0x05; 20]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Added {
    U8(u8),
    U32(u32),
}

/// Encryption service that records every call and hands out predictable handles.
#[derive(Default)]
struct RecordingFhe {
    inputs_created: AtomicUsize,
    encrypt_calls: AtomicUsize,
    keypairs: AtomicUsize,
    decrypt_calls: AtomicUsize,
    added: Mutex<Vec<Added>>,
    scopes: Mutex<Vec<(Address, Address)>>,
    requests: Mutex<Vec<UserDecryptRequest>>,
    /// Number of handles `encrypt` returns; `None` means one per added value.
    handle_count: Option<usize>,
    /// Hand out 33-byte handles, one more than a bytes32 holds.
    oversized_handles: bool,
    fail_decrypt: bool,
}

struct RecordingInput {
    log: Arc<RecordingFhe>,
    values: usize,
}

#[async_trait]
impl EncryptedInput for RecordingInput {
    fn add8(&mut self, value: u8) {
        self.values += 1;
        self.log.added.lock().unwrap().push(Added::U8(value));
    }

    fn add32(&mut self, value: u32) {
        self.values += 1;
        self.log.added.lock().unwrap().push(Added::U32(value));
    }

    async fn encrypt(self: Box<Self>) -> Result<SealedInput, ServiceError> {
        self.log.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.log.handle_count.unwrap_or(self.values);
        if self.log.oversized_handles {
            return Ok(SealedInput {
                handles: (0..n).map(|i| RawHandle::Bytes(vec![i as u8; 33])).collect(),
                input_proof: vec![0xde, 0xad, 0xbe, 0xef],
            });
        }
        Ok(SealedInput {
            // Mixed representations, all normalizing to a left-padded bytes32.
            handles: (0..n)
                .map(|i| match i % 3 {
                    0 => RawHandle::Text(format!("0xAB{i:02X}")),
                    1 => RawHandle::Bytes(vec![0xab, i as u8]),
                    _ => RawHandle::from(0xab00 + i as u128),
                })
                .collect(),
            input_proof: vec![0xde, 0xad, 0xbe, 0xef],
        })
    }
}

/// Wrapper so the test keeps a handle on the shared log.
struct FheHandle(Arc<RecordingFhe>);

#[async_trait]
impl EncryptionService for FheHandle {
    fn create_encrypted_input(&self, contract: Address, user: Address) -> Box<dyn EncryptedInput> {
        self.0.inputs_created.fetch_add(1, Ordering::SeqCst);
        self.0.scopes.lock().unwrap().push((contract, user));
        Box::new(RecordingInput {
            log: Arc::clone(&self.0),
            values: 0,
        })
    }

    fn generate_keypair(&self) -> FheKeypair {
        let n = self.0.keypairs.fetch_add(1, Ordering::SeqCst);
        FheKeypair {
            public_key: format!("0xpub{n}"),
            private_key: format!("0xpriv{n}"),
        }
    }

    fn create_authorization(
        &self,
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: i64,
        duration_days: u32,
    ) -> AuthorizationStatement {
        AuthorizationStatement::new(
            AuthorizationStatement::domain(31337, contract_addresses[0]),
            AuthorizationMessage {
                public_key: public_key.to_string(),
                contract_addresses: contract_addresses.to_vec(),
                start_timestamp,
                duration_days,
            },
        )
    }

    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<DecryptedValues, ServiceError> {
        self.0.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.0.requests.lock().unwrap().push(request.clone());
        if self.0.fail_decrypt {
            return Err(ServiceError::Unauthorized("relayer said no".into()));
        }
        Ok(request.pairs.iter().map(|p| (p.handle.clone(), 42)).collect())
    }
}

#[derive(Default)]
struct RecordingWallet {
    sign_calls: AtomicUsize,
    sent: Mutex<Vec<TransactionRequest>>,
    signed: Mutex<Vec<AuthorizationStatement>>,
    reject: bool,
}

struct WalletHandle(Arc<RecordingWallet>);

#[async_trait]
impl Wallet for WalletHandle {
    fn address(&self) -> Address {
        USER
    }

    async fn sign_typed_data(&self, statement: &AuthorizationStatement) -> Result<String, WalletError> {
        self.0.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.0.signed.lock().unwrap().push(statement.clone());
        Ok(format!("0x{}", "ab".repeat(65)))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        self.0.sent.lock().unwrap().push(tx);
        if self.0.reject {
            return Err(WalletError::Rejected("user denied transaction signature".into()));
        }
        Ok(Bytes32([0x77; 32]))
    }
}

#[derive(Default)]
struct RecordingReader {
    calls: AtomicUsize,
}

fn stored_handles() -> EncryptedAssessmentData {
    let h = |b: u8| HandleHex::new([b; 32]);
    EncryptedAssessmentData {
        revenue: h(1),
        employees: h(2),
        industry: h(3),
        business_type: h(4),
        risk_history: h(5),
        compliance_level: h(6),
        coverage_amount: h(7),
        deductible: h(8),
        risk_score: h(9),
    }
}

#[async_trait]
impl ContractReader for RecordingReader {
    async fn get_assessment(&self, _id: AssessmentId) -> Result<Assessment, ContractError> {
        Err(ContractError::Rpc("not used".into()))
    }

    async fn get_encrypted_assessment_data(
        &self,
        _id: AssessmentId,
    ) -> Result<EncryptedAssessmentData, ContractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(stored_handles())
    }

    async fn get_user_assessments(&self, _user: Address) -> Result<Vec<AssessmentId>, ContractError> {
        Ok(Vec::new())
    }

    async fn get_user_profile(&self, _user: Address) -> Result<UserProfile, ContractError> {
        Ok(UserProfile::default())
    }

    async fn get_contract_stats(&self) -> Result<ContractStats, ContractError> {
        Ok(ContractStats::default())
    }
}

fn reference_form() -> AssessmentForm {
    AssessmentForm {
        company_name: "Acme".into(),
        industry: "technology".into(),
        revenue: "1m-10m".into(),
        employees: "11-50".into(),
        business_type: "low-risk".into(),
        risk_history: "none".into(),
        security_measures: "SOC2".into(),
        compliance_level: "basic".into(),
        coverage_type: "cyber-security".into(),
        coverage_amount: "5m".into(),
        deductible: "5k".into(),
        additional_notes: String::new(),
    }
}

fn connected(fhe: &Arc<RecordingFhe>, wallet: &Arc<RecordingWallet>) -> Session {
    Session::connected(
        Arc::new(WalletHandle(Arc::clone(wallet))),
        Arc::new(FheHandle(Arc::clone(fhe))),
    )
}

#[tokio::test]
async fn submits_reference_form_end_to_end() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);

    let receipt = submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap();

    assert_eq!(receipt.submitter, USER);
    assert_eq!(receipt.deposit_wei, 10_000_000_000_000_000);
    assert_eq!(receipt.tx_hash, Bytes32([0x77; 32]));

    // One builder, one seal.
    assert_eq!(fhe.inputs_created.load(Ordering::SeqCst), 1);
    assert_eq!(fhe.encrypt_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fhe.scopes.lock().unwrap().as_slice(), &[(CONTRACT, USER)]);

    let sent = wallet.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert_eq!(tx.to, CONTRACT);
    assert_eq!(tx.value, 10_000_000_000_000_000);
    let ContractCall::SubmitAssessment(call) = &tx.call else {
        panic!("expected submitAssessment, got {:?}", tx.call);
    };
    assert_eq!(call.deposit_amount, tx.value);
    assert_eq!(call.input_proof, vec![0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(call.handles.len(), NUM_ENCRYPTED_FIELDS);
    assert_eq!(call.handles[0].to_string(), format!("0x{:0>64}", "ab00"));
    assert_eq!(call.handles[1].to_string(), format!("0x{:0>64}", "ab01"));
    assert_eq!(call.handles[2].to_string(), format!("0x{:0>64}", "ab02"));
    assert_eq!(call.handles, receipt.handles);
}

#[tokio::test]
async fn fields_are_added_in_contract_order_with_contract_widths() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);

    submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap();

    assert_eq!(
        fhe.added.lock().unwrap().as_slice(),
        &[
            Added::U32(2), // revenue
            Added::U32(2), // employees
            Added::U8(1),  // industry
            Added::U8(1),  // businessType
            Added::U8(1),  // riskHistory
            Added::U8(1),  // complianceLevel
            Added::U32(2), // coverageAmount
            Added::U32(2), // deductible
        ]
    );
}

#[tokio::test]
async fn unlisted_categories_are_submitted_as_the_first_code() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);

    let mut form = reference_form();
    form.industry = "aerospace".into();
    form.revenue = String::new();

    submit_assessment(&session, CONTRACT, form, "1").await.unwrap();

    let added = fhe.added.lock().unwrap();
    assert_eq!(added[0], Added::U32(1));
    assert_eq!(added[2], Added::U8(1));
    assert_eq!(wallet.sent.lock().unwrap()[0].value, 1_000_000_000_000_000_000);
}

#[tokio::test]
async fn disconnected_session_makes_no_external_calls() {
    let fhe = Arc::new(RecordingFhe::default());
    let session = Session::disconnected().with_encryption(Arc::new(FheHandle(Arc::clone(&fhe))));
    assert!(!session.is_connected());

    let err = submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::WalletNotConnected));
    assert!(err.is_precondition());
    assert_eq!(fhe.inputs_created.load(Ordering::SeqCst), 0);
    assert_eq!(fhe.encrypt_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_encryption_service_makes_no_external_calls() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet).without_encryption();

    let err = submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::EncryptionUnavailable));
    assert!(wallet.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_deposit_stops_before_encryption() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);

    for bad in ["", "abc", "-1", "1.", "0.1.2"] {
        let err = submit_assessment(&session, CONTRACT, reference_form(), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidDeposit(_)), "{bad:?}: {err}");
    }
    assert_eq!(fhe.inputs_created.load(Ordering::SeqCst), 0);
    assert!(wallet.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_handle_count_is_an_encryption_error() {
    let fhe = Arc::new(RecordingFhe {
        handle_count: Some(7),
        ..Default::default()
    });
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);

    let err = submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Encryption(_)));
    assert!(wallet.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn handles_wider_than_bytes32_are_refused_before_sending() {
    let fhe = Arc::new(RecordingFhe {
        oversized_handles: true,
        ..Default::default()
    });
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);

    let err = submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidHandle(HandleError::TooLong(33))), "{err}");
    assert!(wallet.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_transaction_is_reported_unchanged() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet {
        reject: true,
        ..Default::default()
    });
    let session = connected(&fhe, &wallet);

    let err = submit_assessment(&session, CONTRACT, reference_form(), "0.01")
        .await
        .unwrap_err();
    let WorkflowError::Transaction(msg) = err else {
        panic!("expected a transaction error");
    };
    assert!(msg.contains("user denied transaction signature"));
}

#[tokio::test]
async fn process_sends_a_non_payable_call() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);
    let id = Bytes32([0x42; 32]);

    process_assessment(&session, CONTRACT, id).await.unwrap();

    let sent = wallet.sent.lock().unwrap();
    assert_eq!(sent[0].value, 0);
    assert_eq!(sent[0].call, ContractCall::ProcessAssessment { id });
    assert_eq!(fhe.inputs_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn withdraw_sends_a_non_payable_call() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);
    let id = Bytes32([0x24; 32]);

    withdraw_funds(&session, CONTRACT, id).await.unwrap();

    let sent = wallet.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, CONTRACT);
    assert_eq!(sent[0].value, 0);
    assert_eq!(sent[0].call, ContractCall::WithdrawFunds { id });
    assert_eq!(sent[0].call.function_name(), "withdrawFunds");
    assert_eq!(fhe.inputs_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn withdraw_needs_a_wallet() {
    let session = Session::disconnected();
    let err = withdraw_funds(&session, CONTRACT, Bytes32([0x24; 32])).await.unwrap_err();
    assert!(matches!(err, WorkflowError::WalletNotConnected));
}

#[tokio::test]
async fn decryption_uses_a_fresh_grant_each_time() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);
    let reader = Arc::new(RecordingReader::default());
    let contract = ContractContext::new(CONTRACT, reader.clone());
    let id = Bytes32([0x42; 32]);

    let before = chrono::Utc::now().timestamp();
    let first = decrypt_field(&session, &contract, id, StoredField::Revenue).await.unwrap();
    let second = decrypt_field(&session, &contract, id, StoredField::Revenue).await.unwrap();
    let after = chrono::Utc::now().timestamp();

    assert_eq!(first.value, 42);
    assert_eq!(first.handle, stored_handles().revenue);
    assert_eq!(first, second);

    assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fhe.keypairs.load(Ordering::SeqCst), 2);
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 2);

    let requests = fhe.requests.lock().unwrap();
    assert_ne!(requests[0].keypair, requests[1].keypair);
    for request in requests.iter() {
        assert_eq!(request.pairs.len(), 1);
        assert_eq!(request.pairs[0].handle, stored_handles().revenue);
        assert_eq!(request.pairs[0].contract_address, CONTRACT);
        assert_eq!(request.contract_addresses, vec![CONTRACT]);
        assert_eq!(request.user_address, USER);
        assert_eq!(request.signature, "ab".repeat(65));
        assert!(request.start_timestamp >= before && request.start_timestamp <= after);
        assert_eq!(request.duration_days, GRANT_DURATION_DAYS);
        assert_eq!(i64::from(request.duration_days) * SECONDS_PER_DAY, 604_800);
    }

    // The wallet signed exactly the statement the request describes.
    let signed = wallet.signed.lock().unwrap();
    assert_eq!(signed[0].message.public_key, requests[0].keypair.public_key);
    assert_eq!(signed[0].message.start_timestamp, requests[0].start_timestamp);
}

#[tokio::test]
async fn risk_score_reads_the_score_handle() {
    let fhe = Arc::new(RecordingFhe::default());
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);
    let contract = ContractContext::new(CONTRACT, Arc::new(RecordingReader::default()));

    let out = decrypt_field(&session, &contract, Bytes32([1; 32]), StoredField::RiskScore)
        .await
        .unwrap();
    assert_eq!(out.handle, stored_handles().risk_score);
    assert_eq!(fhe.requests.lock().unwrap()[0].pairs[0].handle, stored_handles().risk_score);
}

#[tokio::test]
async fn decryption_preconditions_skip_the_contract() {
    let fhe = Arc::new(RecordingFhe::default());
    let reader = Arc::new(RecordingReader::default());
    let contract = ContractContext::new(CONTRACT, reader.clone());

    let session = Session::disconnected();
    let err = decrypt_field(&session, &contract, Bytes32([1; 32]), StoredField::Revenue)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::WalletNotConnected));

    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet).without_encryption();
    let err = decrypt_field(&session, &contract, Bytes32([1; 32]), StoredField::Revenue)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::EncryptionUnavailable));

    assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn relayer_failure_is_a_decryption_error() {
    let fhe = Arc::new(RecordingFhe {
        fail_decrypt: true,
        ..Default::default()
    });
    let wallet = Arc::new(RecordingWallet::default());
    let session = connected(&fhe, &wallet);
    let contract = ContractContext::new(CONTRACT, Arc::new(RecordingReader::default()));

    let err = decrypt_field(&session, &contract, Bytes32([1; 32]), StoredField::Deductible)
        .await
        .unwrap_err();
    let WorkflowError::Decryption(msg) = err else {
        panic!("expected a decryption error");
    };
    assert!(msg.contains("relayer said no"));
}
