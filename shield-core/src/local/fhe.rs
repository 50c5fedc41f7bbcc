//! Simulated FHE service.
//!
//! SECURITY NOTE: nothing here is encrypted. Handles are hashes and the plaintexts live in
//! process memory. The simulation keeps the protocol shape (scoped inputs, one proof per
//! bundle, keypair-bound and signature-checked decryption, validity windows, a per-handle
//! access list) so the orchestrators can run end to end without the external SDK.

use crate::constants::SECONDS_PER_DAY;
use crate::handles::{HandleHex, RawHandle};
use crate::services::{
    AuthorizationMessage, AuthorizationStatement, DecryptedValues, EncryptedInput, EncryptionService,
    FheKeypair, SealedInput, ServiceError, UserDecryptRequest,
};
use crate::types::Address;
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

const HANDLE_DOMAIN: &[u8] = b"shield-local-fhe/handle";
const PROOF_DOMAIN: &[u8] = b"shield-local-fhe/proof";

#[derive(Default)]
struct FheState {
    plaintexts: HashMap<HandleHex, u64>,
    /// Users allowed to decrypt each handle.
    acl: HashMap<HandleHex, HashSet<Address>>,
    signers: HashMap<Address, VerifyingKey>,
    nonce: u64,
}

/// In-memory stand-in for the FHE SDK and its decryption relayer.
#[derive(Clone)]
pub struct LocalFhe {
    chain_id: u64,
    state: Arc<Mutex<FheState>>,
}

impl LocalFhe {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Arc::new(Mutex::new(FheState::default())),
        }
    }

    /// Accept decryption requests signed by `key` on behalf of `user`.
    pub fn trust_signer(&self, user: Address, key: VerifyingKey) {
        lock(&self.state).signers.insert(user, key);
    }

    /// Proof binding `handles` to (contract, user). Recomputed by the chain on submission.
    pub fn input_proof(contract: Address, user: Address, handles: &[HandleHex]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(PROOF_DOMAIN);
        hasher.update(contract.as_bytes());
        hasher.update(user.as_bytes());
        hasher.update((handles.len() as u64).to_be_bytes());
        for h in handles {
            hasher.update((h.as_bytes().len() as u64).to_be_bytes());
            hasher.update(h.as_bytes());
        }
        hasher.finalize().to_vec()
    }

    /// Let `user` decrypt `handle`.
    pub fn allow(&self, handle: &HandleHex, user: Address) {
        lock(&self.state).acl.entry(handle.clone()).or_default().insert(user);
    }

    /// Compute on stored ciphertexts and store the result under a new handle readable by
    /// `allowed`.
    ///
    /// Returns the new handle and the clear result (which a real deployment would only
    /// learn through a public decryption).
    pub fn evaluate(
        &self,
        contract: Address,
        allowed: Address,
        inputs: &[HandleHex],
        f: impl FnOnce(&[u64]) -> u64,
    ) -> Result<(HandleHex, u64), ServiceError> {
        let mut state = lock(&self.state);
        let values = inputs
            .iter()
            .map(|h| {
                state
                    .plaintexts
                    .get(h)
                    .copied()
                    .ok_or_else(|| ServiceError::UnknownHandle(h.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = f(&values);
        let handle = next_handle(&mut state, contract, Address::default(), 0);
        store(&mut state, &handle, result, allowed);
        Ok((handle, result))
    }

    /// Store a public constant under a fresh handle readable by `allowed`.
    pub fn trivial_encrypt(&self, contract: Address, value: u64, allowed: Address) -> HandleHex {
        let mut state = lock(&self.state);
        let handle = next_handle(&mut state, contract, Address::default(), 0);
        store(&mut state, &handle, value, allowed);
        handle
    }

    fn check_grant(&self, request: &UserDecryptRequest) -> Result<(), ServiceError> {
        let private = hex::decode(request.keypair.private_key.trim_start_matches("0x"))
            .map_err(|_| ServiceError::Unauthorized("malformed private key".into()))?;
        let expected_public = format!("0x{}", hex::encode(Sha256::digest(&private)));
        if expected_public != request.keypair.public_key {
            return Err(ServiceError::Unauthorized("keypair mismatch".into()));
        }

        let now = Utc::now().timestamp();
        let end = request.start_timestamp + i64::from(request.duration_days) * SECONDS_PER_DAY;
        if now < request.start_timestamp || now >= end {
            return Err(ServiceError::Unauthorized("grant is outside its validity window".into()));
        }

        for pair in &request.pairs {
            if !request.contract_addresses.contains(&pair.contract_address) {
                return Err(ServiceError::Unauthorized(format!(
                    "contract {} is not covered by the grant",
                    pair.contract_address
                )));
            }
        }

        if request.signature.is_empty() || request.signature.starts_with("0x") {
            return Err(ServiceError::Unauthorized("signature must be bare hex".into()));
        }
        let sig_bytes = hex::decode(&request.signature)
            .map_err(|_| ServiceError::Unauthorized("signature is not hex".into()))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| ServiceError::Unauthorized("malformed signature".into()))?;

        let key = lock(&self.state)
            .signers
            .get(&request.user_address)
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized(format!("unknown signer {}", request.user_address)))?;

        // Rebuild exactly what the wallet was asked to sign.
        let statement = self.create_authorization(
            &request.keypair.public_key,
            &request.contract_addresses,
            request.start_timestamp,
            request.duration_days,
        );
        let digest = statement
            .signing_digest()
            .map_err(|e| ServiceError::Failed(format!("{e}")))?;

        key.verify(&digest, &signature)
            .map_err(|_| ServiceError::Unauthorized("signature does not match statement".into()))
    }
}

fn lock(state: &Mutex<FheState>) -> MutexGuard<'_, FheState> {
    // A panic while holding the lock cannot leave the maps half-updated.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn store(state: &mut FheState, handle: &HandleHex, value: u64, allowed: Address) {
    state.plaintexts.insert(handle.clone(), value);
    state.acl.entry(handle.clone()).or_default().insert(allowed);
}

fn next_handle(state: &mut FheState, contract: Address, user: Address, index: u8) -> HandleHex {
    state.nonce += 1;
    let mut hasher = Sha256::new();
    hasher.update(HANDLE_DOMAIN);
    hasher.update(contract.as_bytes());
    hasher.update(user.as_bytes());
    hasher.update(state.nonce.to_be_bytes());
    hasher.update([index]);
    HandleHex::new(hasher.finalize().into())
}

struct LocalInput {
    state: Arc<Mutex<FheState>>,
    contract: Address,
    user: Address,
    values: Vec<u64>,
}

#[async_trait]
impl EncryptedInput for LocalInput {
    fn add8(&mut self, value: u8) {
        self.values.push(u64::from(value));
    }

    fn add32(&mut self, value: u32) {
        self.values.push(u64::from(value));
    }

    async fn encrypt(self: Box<Self>) -> Result<SealedInput, ServiceError> {
        if self.values.len() > usize::from(u8::MAX) {
            return Err(ServiceError::Failed("too many values in one input".into()));
        }

        let mut state = lock(&self.state);
        let mut handles = Vec::with_capacity(self.values.len());
        for (index, value) in self.values.iter().enumerate() {
            let handle = next_handle(&mut state, self.contract, self.user, index as u8);
            store(&mut state, &handle, *value, self.user);
            handles.push(handle);
        }
        drop(state);

        let input_proof = LocalFhe::input_proof(self.contract, self.user, &handles);
        Ok(SealedInput {
            handles: handles
                .into_iter()
                .map(|h| RawHandle::Bytes(h.as_bytes().to_vec()))
                .collect(),
            input_proof,
        })
    }
}

#[async_trait]
impl EncryptionService for LocalFhe {
    fn create_encrypted_input(&self, contract: Address, user: Address) -> Box<dyn EncryptedInput> {
        Box::new(LocalInput {
            state: Arc::clone(&self.state),
            contract,
            user,
            values: Vec::new(),
        })
    }

    fn generate_keypair(&self) -> FheKeypair {
        let mut private = [0u8; 32];
        OsRng.fill_bytes(&mut private);
        FheKeypair {
            public_key: format!("0x{}", hex::encode(Sha256::digest(private))),
            private_key: format!("0x{}", hex::encode(private)),
        }
    }

    fn create_authorization(
        &self,
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: i64,
        duration_days: u32,
    ) -> AuthorizationStatement {
        let verifying_contract = contract_addresses.first().copied().unwrap_or_default();
        AuthorizationStatement::new(
            AuthorizationStatement::domain(self.chain_id, verifying_contract),
            AuthorizationMessage {
                public_key: public_key.to_string(),
                contract_addresses: contract_addresses.to_vec(),
                start_timestamp,
                duration_days,
            },
        )
    }

    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<DecryptedValues, ServiceError> {
        self.check_grant(&request)?;

        let state = lock(&self.state);
        request
            .pairs
            .iter()
            .map(|pair| -> Result<(HandleHex, u64), ServiceError> {
                let value = state
                    .plaintexts
                    .get(&pair.handle)
                    .ok_or_else(|| ServiceError::UnknownHandle(pair.handle.clone()))?;
                let allowed = state
                    .acl
                    .get(&pair.handle)
                    .is_some_and(|users| users.contains(&request.user_address));
                if !allowed {
                    return Err(ServiceError::Unauthorized(format!(
                        "{} may not decrypt {}",
                        request.user_address, pair.handle
                    )));
                }
                Ok((pair.handle.clone(), *value))
            })
            .collect()
    }
}
