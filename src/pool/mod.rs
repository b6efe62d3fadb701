//! Pool address resolution

pub mod create2;
pub mod resolver;

pub use create2::{compute_pool_address, sort_tokens, POOL_INIT_CODE_HASH};
pub use resolver::{PoolResolver, PoolSource, Resolution, ResolutionStrategy};
