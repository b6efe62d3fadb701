//! In-memory `ChainReader` for tests

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use super::error::ChainError;
use super::reader::ChainReader;
use super::types::{
    Chain, ChainContracts, FeeGrowthGlobal, OnChainPosition, Slot0, TickFeeGrowth, TokenMetadata,
};

/// Canned answers per call; anything not registered reads as `NotFound`
pub struct MockChainReader {
    pub chain: Chain,
    pub contracts: ChainContracts,
    pub positions: HashMap<U256, Result<OnChainPosition, ChainError>>,
    pub slot0: HashMap<Address, Result<Slot0, ChainError>>,
    pub fee_growth: HashMap<Address, FeeGrowthGlobal>,
    pub ticks: HashMap<(Address, i32), TickFeeGrowth>,
    pub metadata: HashMap<Address, TokenMetadata>,
    pub factory: Result<Address, ChainError>,
    pub events: HashMap<(Address, Address, u32), Vec<Address>>,
    pub events_error: Option<ChainError>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockChainReader {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            contracts: chain.default_contracts().unwrap_or(ChainContracts {
                factory: Address::ZERO,
                position_manager: Address::ZERO,
            }),
            positions: HashMap::new(),
            slot0: HashMap::new(),
            fee_growth: HashMap::new(),
            ticks: HashMap::new(),
            metadata: HashMap::new(),
            factory: Ok(Address::ZERO),
            events: HashMap::new(),
            events_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_position(mut self, id: u64, position: OnChainPosition) -> Self {
        self.positions.insert(U256::from(id), Ok(position));
        self
    }

    pub fn with_token(mut self, token: Address, symbol: &str, decimals: u8) -> Self {
        self.metadata.insert(
            token,
            TokenMetadata {
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }

    pub fn with_pool(mut self, pool: Address, sqrt_price_x96: U256, tick: i32) -> Self {
        self.slot0.insert(pool, Ok(Slot0 { sqrt_price_x96, tick }));
        self
    }

    pub fn with_fee_growth(mut self, pool: Address, global0: U256, global1: U256) -> Self {
        self.fee_growth.insert(pool, FeeGrowthGlobal { global0, global1 });
        self
    }

    pub fn with_tick(mut self, pool: Address, tick: i32, outside0: U256, outside1: U256) -> Self {
        self.ticks.insert(
            (pool, tick),
            TickFeeGrowth {
                fee_growth_outside0: outside0,
                fee_growth_outside1: outside1,
            },
        );
        self
    }

    /// Names of the calls made so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

fn not_found(what: &str) -> ChainError {
    ChainError::NotFound(format!("{} not registered in mock", what))
}

#[async_trait]
impl ChainReader for MockChainReader {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn contracts(&self) -> ChainContracts {
        self.contracts
    }

    async fn position(&self, position_id: U256) -> Result<OnChainPosition, ChainError> {
        self.record("positions");
        self.positions
            .get(&position_id)
            .cloned()
            .unwrap_or_else(|| Err(not_found("position")))
    }

    async fn pool_slot0(&self, pool: Address) -> Result<Slot0, ChainError> {
        self.record("slot0");
        self.slot0.get(&pool).cloned().unwrap_or_else(|| Err(not_found("slot0")))
    }

    async fn pool_fee_growth_global(&self, pool: Address) -> Result<FeeGrowthGlobal, ChainError> {
        self.record("feeGrowthGlobal");
        self.fee_growth.get(&pool).copied().ok_or_else(|| not_found("feeGrowthGlobal"))
    }

    async fn tick_info(&self, pool: Address, tick: i32) -> Result<TickFeeGrowth, ChainError> {
        self.record("ticks");
        self.ticks.get(&(pool, tick)).copied().ok_or_else(|| not_found("ticks"))
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        self.record("metadata");
        self.metadata.get(&token).cloned().ok_or_else(|| not_found("metadata"))
    }

    async fn pool_from_factory(
        &self,
        _token_a: Address,
        _token_b: Address,
        _fee: u32,
    ) -> Result<Address, ChainError> {
        self.record("getPool");
        self.factory.clone()
    }

    async fn pool_created_events(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Vec<Address>, ChainError> {
        self.record("PoolCreated");
        if let Some(err) = &self.events_error {
            return Err(err.clone());
        }
        Ok(self.events.get(&(token_a, token_b, fee)).cloned().unwrap_or_default())
    }
}
