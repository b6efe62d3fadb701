//! Deterministic pool addresses
//!
//! Pools are deployed by the factory with CREATE2, so their address follows
//! from the factory, the sorted token pair and the fee tier alone.

use alloy_primitives::{b256, keccak256, Address, B256};

/// keccak256 of the pool creation code, identical on every chain
pub const POOL_INIT_CODE_HASH: B256 =
    b256!("e34f199b19b2b4f47f68442619d555527d244f78a3297ea89325f843f87b8b54");

/// Largest value a `uint24` fee can hold
const MAX_FEE: u32 = (1 << 24) - 1;

/// Canonical (token0, token1) ordering
pub fn sort_tokens(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// `keccak256(abi.encode(token0, token1, uint24 fee))`
pub fn pool_salt(token0: Address, token1: Address, fee: u32) -> B256 {
    let mut encoded = [0u8; 96];
    encoded[12..32].copy_from_slice(token0.as_slice());
    encoded[44..64].copy_from_slice(token1.as_slice());
    encoded[93..96].copy_from_slice(&fee.to_be_bytes()[1..]);
    keccak256(encoded)
}

/// Address the factory would deploy the (a, b, fee) pool to.
///
/// Pure computation; the pool may not exist. `None` for inputs that can never
/// name a pool: zero factory, identical tokens, or a fee wider than 24 bits.
pub fn compute_pool_address(factory: Address, a: Address, b: Address, fee: u32) -> Option<Address> {
    if factory == Address::ZERO || a == b || fee > MAX_FEE {
        return None;
    }

    let (token0, token1) = sort_tokens(a, b);
    Some(factory.create2(pool_salt(token0, token1, fee), POOL_INIT_CODE_HASH))
}
