//! JSON-RPC chain reader
//!
//! Plain `eth_call` / `eth_getLogs` against the position manager, pools,
//! the factory and ERC-20 tokens. Every read is bounded by a timeout and
//! its failure is classified into a [`ChainError`] variant.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{Filter, TransactionRequest};
use alloy_sol_types::{sol, SolCall, SolEvent};
use alloy_transport::TransportError;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{debug, trace};

use super::error::ChainError;
use super::reader::ChainReader;
use super::types::{
    Chain, ChainContracts, FeeGrowthGlobal, OnChainPosition, Slot0, TickFeeGrowth, TokenMetadata,
};

// ============================================
// CONTRACT INTERFACES
// ============================================

sol! {
    interface INonfungiblePositionManager {
        function positions(uint256 tokenId) external view returns (
            uint96 nonce, address operator, address token0, address token1, uint24 fee,
            int24 tickLower, int24 tickUpper, uint128 liquidity,
            uint256 feeGrowthInside0LastX128, uint256 feeGrowthInside1LastX128,
            uint128 tokensOwed0, uint128 tokensOwed1
        );
    }

    interface IUniswapV3Pool {
        function slot0() external view returns (
            uint160 sqrtPriceX96, int24 tick, uint16 observationIndex,
            uint16 observationCardinality, uint16 observationCardinalityNext,
            uint8 feeProtocol, bool unlocked
        );
        function feeGrowthGlobal0X128() external view returns (uint256);
        function feeGrowthGlobal1X128() external view returns (uint256);
        function ticks(int24 tick) external view returns (
            uint128 liquidityGross, int128 liquidityNet,
            uint256 feeGrowthOutside0X128, uint256 feeGrowthOutside1X128,
            int56 tickCumulativeOutside, uint160 secondsPerLiquidityOutsideX128,
            uint32 secondsOutside, bool initialized
        );
    }

    interface IUniswapV3Factory {
        event PoolCreated(
            address indexed token0, address indexed token1, uint24 indexed fee,
            int24 tickSpacing, address pool
        );
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    interface IERC20Metadata {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

// ============================================
// RPC READER
// ============================================

pub struct RpcChainReader {
    chain: Chain,
    contracts: ChainContracts,
    provider: DynProvider,
    timeout: Duration,
}

impl RpcChainReader {
    pub fn new(
        chain: Chain,
        rpc_url: &str,
        contracts: ChainContracts,
        timeout: Duration,
    ) -> Result<Self, ChainError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Unconfigured(format!("invalid RPC URL for {}: {}", chain, e)))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            chain,
            contracts,
            provider,
            timeout,
        })
    }

    /// Run one `eth_call` and decode its return data
    async fn call<C: SolCall>(&self, to: Address, call: C, what: &str) -> Result<C::Return, ChainError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(call.abi_encode().into());

        let raw = self.bounded(self.provider.call(tx), what).await?;

        if raw.is_empty() {
            return Err(ChainError::NotFound(format!("{}: empty return data from {}", what, to)));
        }

        trace!("{} on {:?} returned {} bytes", what, to, raw.len());

        C::abi_decode_returns(&raw).map_err(|e| ChainError::Malformed(format!("{}: {}", what, e)))
    }

    /// Apply the per-read timeout and classify transport failures
    async fn bounded<F, T>(&self, fut: F, what: &str) -> Result<T, ChainError>
    where
        F: IntoFuture<Output = Result<T, TransportError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(e, what)),
            Err(_) => Err(ChainError::Timeout(format!(
                "{} exceeded {:?} on {}",
                what, self.timeout, self.chain
            ))),
        }
    }
}

/// Reverts become `NotFound`, decode failures `Malformed`, the rest `Network`
fn classify(err: TransportError, what: &str) -> ChainError {
    if let Some(payload) = err.as_error_resp() {
        return ChainError::NotFound(format!("{}: {}", what, payload.message));
    }
    if err.is_deser_error() || err.is_ser_error() {
        return ChainError::Malformed(format!("{}: {}", what, err));
    }
    ChainError::Network(format!("{}: {}", what, err))
}

fn fee_to_u24(fee: u32) -> Result<alloy_primitives::aliases::U24, ChainError> {
    alloy_primitives::aliases::U24::try_from(fee)
        .map_err(|_| ChainError::Malformed(format!("fee {} does not fit uint24", fee)))
}

#[async_trait]
impl ChainReader for RpcChainReader {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn contracts(&self) -> ChainContracts {
        self.contracts
    }

    async fn position(&self, position_id: U256) -> Result<OnChainPosition, ChainError> {
        let p = self
            .call(
                self.contracts.position_manager,
                INonfungiblePositionManager::positionsCall { tokenId: position_id },
                "positions",
            )
            .await?;

        debug!("Position {} on {}: {:?}/{:?}", position_id, self.chain, p.token0, p.token1);

        Ok(OnChainPosition {
            token0: p.token0,
            token1: p.token1,
            fee: p.fee.to::<u32>(),
            tick_lower: p.tickLower.as_i32(),
            tick_upper: p.tickUpper.as_i32(),
            liquidity: p.liquidity,
            fee_growth_inside_last0: p.feeGrowthInside0LastX128,
            fee_growth_inside_last1: p.feeGrowthInside1LastX128,
            tokens_owed0: p.tokensOwed0,
            tokens_owed1: p.tokensOwed1,
        })
    }

    async fn pool_slot0(&self, pool: Address) -> Result<Slot0, ChainError> {
        let s = self.call(pool, IUniswapV3Pool::slot0Call {}, "slot0").await?;

        Ok(Slot0 {
            sqrt_price_x96: s.sqrtPriceX96.to::<U256>(),
            tick: s.tick.as_i32(),
        })
    }

    async fn pool_fee_growth_global(&self, pool: Address) -> Result<FeeGrowthGlobal, ChainError> {
        let (global0, global1) = tokio::join!(
            self.call(pool, IUniswapV3Pool::feeGrowthGlobal0X128Call {}, "feeGrowthGlobal0X128"),
            self.call(pool, IUniswapV3Pool::feeGrowthGlobal1X128Call {}, "feeGrowthGlobal1X128"),
        );

        Ok(FeeGrowthGlobal {
            global0: global0?,
            global1: global1?,
        })
    }

    async fn tick_info(&self, pool: Address, tick: i32) -> Result<TickFeeGrowth, ChainError> {
        let tick24 = alloy_primitives::aliases::I24::try_from(tick)
            .map_err(|_| ChainError::Malformed(format!("tick {} does not fit int24", tick)))?;

        let t = self
            .call(pool, IUniswapV3Pool::ticksCall { tick: tick24 }, "ticks")
            .await?;

        Ok(TickFeeGrowth {
            fee_growth_outside0: t.feeGrowthOutside0X128,
            fee_growth_outside1: t.feeGrowthOutside1X128,
        })
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        let (symbol, decimals) = tokio::join!(
            self.call(token, IERC20Metadata::symbolCall {}, "symbol"),
            self.call(token, IERC20Metadata::decimalsCall {}, "decimals"),
        );

        Ok(TokenMetadata {
            symbol: symbol?,
            decimals: decimals?,
        })
    }

    async fn pool_from_factory(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Address, ChainError> {
        let call = IUniswapV3Factory::getPoolCall {
            tokenA: token_a,
            tokenB: token_b,
            fee: fee_to_u24(fee)?,
        };

        self.call(self.contracts.factory, call, "getPool").await
    }

    async fn pool_created_events(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Vec<Address>, ChainError> {
        let filter = Filter::new()
            .address(self.contracts.factory)
            .event_signature(IUniswapV3Factory::PoolCreated::SIGNATURE_HASH)
            .topic1(token_a.into_word())
            .topic2(token_b.into_word())
            .topic3(B256::from(U256::from(fee)))
            .from_block(BlockNumberOrTag::Earliest)
            .to_block(BlockNumberOrTag::Latest);

        let logs = self.bounded(self.provider.get_logs(&filter), "PoolCreated logs").await?;

        logs.iter()
            .map(|log| {
                IUniswapV3Factory::PoolCreated::decode_log_data(&log.inner.data)
                    .map(|event| event.pool)
                    .map_err(|e| ChainError::Malformed(format!("PoolCreated log: {}", e)))
            })
            .collect()
    }
}
