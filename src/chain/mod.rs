//! Chain access: per-chain readers for the position manager, pools, the
//! factory and ERC-20 metadata.

pub mod error;
pub mod gateway;
pub mod reader;
pub mod rpc;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use error::ChainError;
pub use gateway::ChainGateway;
pub use reader::ChainReader;
pub use rpc::RpcChainReader;
pub use types::{
    Chain, ChainContracts, FeeGrowthGlobal, OnChainPosition, Slot0, TickFeeGrowth, TokenInfo,
    TokenMetadata, MAX_TICK, MIN_TICK,
};
