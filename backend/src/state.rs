use crate::config::Config;
use crate::db::Db;
use crate::errors::ApiError;
use shield_core::deployment::DeploymentRecord;
use shield_core::local::LocalStack;
use shield_core::session::{ContractContext, Session};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<Config>,
    pub session: Session,
    pub contract: ContractContext,
    pub deployment: DeploymentRecord,
    // One submission and one decryption in flight at a time.
    submit_guard: Arc<Mutex<()>>,
    decrypt_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        db: Db,
        config: Config,
        session: Session,
        contract: ContractContext,
        deployment: DeploymentRecord,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            session,
            contract,
            deployment,
            submit_guard: Arc::new(Mutex::new(())),
            decrypt_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Deploy the development stack and record the deployment under the data dir.
    ///
    /// An existing record is kept when it describes the same network and contract.
    pub async fn bootstrap_local(db: Db, config: Config) -> Result<Self, ApiError> {
        let stack = LocalStack::bootstrap(&config.dev_wallet_seed);
        let session = stack.session();
        let contract = stack.contract();

        let data_dir = config.data_dir.clone();
        let fresh = DeploymentRecord::new(
            stack.contract_address(),
            config.network.clone(),
            stack.wallet_address(),
        );

        let deployment = tokio::task::spawn_blocking(move || -> Result<DeploymentRecord, ApiError> {
            let existing = DeploymentRecord::read(&data_dir).map_err(|e| {
                tracing::warn!(error = %e, "ignoring unreadable deployment record");
            });

            match existing {
                Ok(Some(record))
                    if record.network == fresh.network
                        && record.contract_address == fresh.contract_address =>
                {
                    Ok(record)
                }
                _ => {
                    let path = fresh.write(&data_dir).map_err(|e| {
                        tracing::warn!(error = %e, "writing deployment record failed");
                        ApiError::Internal
                    })?;
                    tracing::info!(path = %path.display(), "deployment record written");
                    Ok(fresh)
                }
            }
        })
        .await
        .map_err(|_| ApiError::Internal)??;

        tracing::info!(
            contract = %deployment.contract_address,
            network = %deployment.network,
            "contract ready"
        );

        Ok(Self::new(db, config, session, contract, deployment))
    }

    pub fn try_begin_submission(&self) -> Result<MutexGuard<'_, ()>, ApiError> {
        self.submit_guard
            .try_lock()
            .map_err(|_| ApiError::Conflict("a submission is already in progress".to_string()))
    }

    pub fn try_begin_decryption(&self) -> Result<MutexGuard<'_, ()>, ApiError> {
        self.decrypt_guard
            .try_lock()
            .map_err(|_| ApiError::Conflict("a decryption is already in progress".to_string()))
    }
}
