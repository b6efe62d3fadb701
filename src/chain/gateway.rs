use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::ChainError;
use super::reader::ChainReader;
use super::rpc::RpcChainReader;
use super::types::Chain;
use crate::config::Config;

/// Registry of one reader per configured chain
#[derive(Clone, Default)]
pub struct ChainGateway {
    readers: HashMap<Chain, Arc<dyn ChainReader>>,
}

impl ChainGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect an RPC reader for every chain in the configuration.
    ///
    /// A chain whose endpoint cannot be parsed is skipped with a warning so the
    /// remaining chains stay usable.
    pub fn from_config(config: &Config) -> Self {
        let mut gateway = Self::new();

        for endpoint in &config.chains {
            match RpcChainReader::new(
                endpoint.chain,
                &endpoint.rpc_url,
                endpoint.contracts(),
                config.rpc_timeout(),
            ) {
                Ok(reader) => {
                    info!("Connected {} (chain id {})", endpoint.chain, endpoint.chain.chain_id());
                    gateway.readers.insert(endpoint.chain, Arc::new(reader));
                }
                Err(e) => warn!("Skipping {}: {}", endpoint.chain, e),
            }
        }

        gateway
    }

    /// Register (or replace) the reader for its chain
    pub fn with_reader(mut self, reader: Arc<dyn ChainReader>) -> Self {
        self.readers.insert(reader.chain(), reader);
        self
    }

    pub fn reader(&self, chain: Chain) -> Result<Arc<dyn ChainReader>, ChainError> {
        self.readers
            .get(&chain)
            .cloned()
            .ok_or_else(|| ChainError::Unconfigured(format!("no RPC endpoint for {}", chain)))
    }

    pub fn chains(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self.readers.keys().copied().collect();
        chains.sort_by_key(|c| c.chain_id());
        chains
    }
}
