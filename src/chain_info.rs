use alloy::{
    json_abi::JsonAbi,
    primitives::Address,
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use thiserror::Error;

pub const DEFAULT_CHAIN_INFO_DIR: &str = "./chain-info";
const CONTRACTS_DIR: &str = "contracts";
const DEPLOYMENTS_MAP_FILE: &str = "deployments/map.json";

/// Failures while loading or resolving contract metadata. Lookup misses are
/// typed so callers can tell a bad network flag from a broken artifact file.
#[derive(Debug, Error)]
pub enum ChainInfoError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("network {chain_id} is not present in the deployment map")]
    UnknownNetwork { chain_id: u64 },
    #[error("no deployment of '{name}' recorded for network {chain_id}")]
    UnknownContract { name: String, chain_id: u64 },
    #[error("deployment entry for '{name}' on network {chain_id} lists no addresses")]
    NoAddresses { name: String, chain_id: u64 },
}

/// Compiler artifact for one contract. Only the ABI is consumed; the rest of
/// the artifact (bytecode, source map) is ignored by the front end.
#[derive(Clone, Debug, Deserialize)]
pub struct ContractArtifact {
    #[serde(default, rename = "contractName")]
    pub contract_name: Option<String>,
    pub abi: JsonAbi,
}

/// Per-network registry of deployed addresses, keyed by chain id (as a
/// string, matching the JSON produced at deploy time) and then by contract
/// name. The first address in a list is the active deployment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct DeploymentMap(BTreeMap<String, BTreeMap<String, Vec<Address>>>);

impl DeploymentMap {
    pub fn address_for(&self, chain_id: u64, name: &str) -> Result<Address, ChainInfoError> {
        let network = self
            .0
            .get(&chain_id.to_string())
            .ok_or(ChainInfoError::UnknownNetwork { chain_id })?;
        let addresses = network
            .get(name)
            .ok_or_else(|| ChainInfoError::UnknownContract {
                name: name.to_string(),
                chain_id,
            })?;
        addresses
            .first()
            .copied()
            .ok_or_else(|| ChainInfoError::NoAddresses {
                name: name.to_string(),
                chain_id,
            })
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[derive(Clone, Debug)]
pub struct ChainInfo {
    root: PathBuf,
}

impl ChainInfo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_artifact(&self, name: &str) -> Result<ContractArtifact, ChainInfoError> {
        let path = self.root.join(CONTRACTS_DIR).join(format!("{name}.json"));
        read_json(&path)
    }

    pub fn load_deployment_map(&self) -> Result<DeploymentMap, ChainInfoError> {
        let path = self.root.join(DEPLOYMENTS_MAP_FILE);
        read_json(&path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ChainInfoError> {
    let data = fs::read(path).map_err(|source| ChainInfoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| ChainInfoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
