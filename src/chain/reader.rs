use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use super::error::ChainError;
use super::types::{
    Chain, ChainContracts, FeeGrowthGlobal, OnChainPosition, Slot0, TickFeeGrowth, TokenMetadata,
};

/// Typed read calls against the three contract kinds of one chain.
///
/// Every method is independent network I/O and may fail on its own; callers
/// decide which failures are fatal.
#[async_trait]
pub trait ChainReader: Send + Sync {
    fn chain(&self) -> Chain;

    /// Factory and position manager this reader talks to
    fn contracts(&self) -> ChainContracts;

    /// `positions(tokenId)` on the position manager
    async fn position(&self, position_id: U256) -> Result<OnChainPosition, ChainError>;

    async fn pool_slot0(&self, pool: Address) -> Result<Slot0, ChainError>;

    async fn pool_fee_growth_global(&self, pool: Address) -> Result<FeeGrowthGlobal, ChainError>;

    async fn tick_info(&self, pool: Address, tick: i32) -> Result<TickFeeGrowth, ChainError>;

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainError>;

    /// Factory `getPool`; the zero address means the registry has no such pool
    async fn pool_from_factory(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Address, ChainError>;

    /// Pools from `PoolCreated` logs matching the exact token order, oldest first
    async fn pool_created_events(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Vec<Address>, ChainError>;
}
