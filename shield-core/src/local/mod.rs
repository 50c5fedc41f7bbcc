//! In-process development backends for the encryption service, the contract and the wallet.
//!
//! SECURITY NOTE: these are simulations for local runs and tests. They keep plaintexts in
//! memory and must never be pointed at real user data.

pub mod chain;
pub mod fhe;
pub mod wallet;

pub use chain::{LocalChain, RISK_APPROVAL_THRESHOLD};
pub use fhe::LocalFhe;
pub use wallet::{LocalWallet, address_of, signing_key_from_seed};

use crate::services::Wallet;
use crate::session::{ContractContext, Session};
use crate::types::Address;
use std::sync::Arc;
use tracing::info;

/// Chain id reported by the local network.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// A deployed local contract with a wallet whose signatures the encryption service trusts.
#[derive(Clone)]
pub struct LocalStack {
    pub fhe: LocalFhe,
    pub chain: Arc<LocalChain>,
    pub wallet: Arc<LocalWallet>,
}

impl LocalStack {
    /// Derive the wallet from `seed`, deploy a fresh contract from it and register the
    /// wallet's key with the encryption service.
    pub fn bootstrap(seed: &str) -> Self {
        let key = signing_key_from_seed(seed);
        let deployer = address_of(&key.verifying_key());

        let fhe = LocalFhe::new(LOCAL_CHAIN_ID);
        let chain = LocalChain::deploy(fhe.clone(), deployer);
        let wallet = Arc::new(LocalWallet::new(key, Arc::clone(&chain)));
        fhe.trust_signer(deployer, wallet.verifying_key());

        info!(contract = %chain.address(), %deployer, "local stack deployed");

        Self { fhe, chain, wallet }
    }

    pub fn contract_address(&self) -> Address {
        self.chain.address()
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    pub fn session(&self) -> Session {
        Session::connected(self.wallet.clone(), Arc::new(self.fhe.clone()))
    }

    pub fn contract(&self) -> ContractContext {
        ContractContext::new(self.chain.address(), self.chain.clone())
    }
}
