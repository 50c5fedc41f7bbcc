//! Development wallet: an ed25519 key derived from a seed phrase, sending straight to the
//! in-memory chain.

use super::chain::LocalChain;
use crate::services::{AuthorizationStatement, Wallet, WalletError};
use crate::types::{Address, TransactionRequest, TxHash};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Same seed, same key.
pub fn signing_key_from_seed(seed: &str) -> SigningKey {
    let mut rng = ChaCha20Rng::from_seed(Sha256::digest(seed.as_bytes()).into());
    let mut secret = [0u8; 32];
    rng.fill_bytes(&mut secret);
    SigningKey::from_bytes(&secret)
}

/// Last 20 bytes of the SHA-256 of the public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let digest = Sha256::digest(key.as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address(out)
}

pub struct LocalWallet {
    key: SigningKey,
    address: Address,
    chain: Arc<LocalChain>,
}

impl LocalWallet {
    pub fn new(key: SigningKey, chain: Arc<LocalChain>) -> Self {
        let address = address_of(&key.verifying_key());
        Self { key, address, chain }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, statement: &AuthorizationStatement) -> Result<String, WalletError> {
        let digest = statement
            .signing_digest()
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        let signature = self.key.sign(&digest);
        Ok(format!("0x{}", hex::encode(signature.to_bytes())))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        if tx.to != self.chain.address() {
            return Err(WalletError::Rejected(format!("unknown contract {}", tx.to)));
        }

        debug!(from = %self.address, function = tx.call.function_name(), "sending local transaction");
        self.chain
            .execute(self.address, tx)
            .map_err(|e| WalletError::Rejected(e.to_string()))
    }
}
