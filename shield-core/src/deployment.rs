//! Deployment record written after the underwriting contract is deployed.

use crate::constants::DEPLOYMENT_RECORD_FILE;
use crate::types::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_address: Address,
    pub network: String,
    pub deployer: Address,
    pub timestamp: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn new(contract_address: Address, network: impl Into<String>, deployer: Address) -> Self {
        Self {
            contract_address,
            network: network.into(),
            deployer,
            timestamp: Utc::now(),
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(DEPLOYMENT_RECORD_FILE)
    }

    /// Write the record as pretty JSON into `dir`, replacing any previous record.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, DeploymentError> {
        let path = Self::path_in(dir);
        let body = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, body)?;
        Ok(path)
    }

    /// Read the record from `dir`. `Ok(None)` if none was written yet.
    pub fn read(dir: &Path) -> Result<Option<Self>, DeploymentError> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
