//! Integer arithmetic shared by the facade: pagination, funding progress,
//! slippage floors, gas buffers and transaction deadlines.

use alloy_primitives::{U256, U512};

use crate::errors::{LaunchpadError, Result};

pub const DEFAULT_DEADLINE_SECS: u64 = 300;
pub const DEFAULT_GAS_BUFFER_PERCENT: u64 = 110;

/// Whether another page exists after `offset + limit`.
pub fn has_more(offset: u64, limit: u64, total_count: u64) -> bool {
    offset.saturating_add(limit) < total_count
}

/// Percentage of the funding target raised so far, floored and capped at 100.
pub fn funding_progress(raised: U256, target: U256) -> u8 {
    if target.is_zero() {
        return 0;
    }
    if raised >= target {
        return 100;
    }
    // raised * 100 can exceed 256 bits; widen before dividing.
    let percent = U512::from(raised) * U512::from(100u8) / U512::from(target);
    percent.to::<u8>()
}

/// Minimum acceptable output: `floor(amount * (100 - slippage) / 100)`.
pub fn min_amount_with_slippage(amount: U256, slippage_percent: u32) -> Result<U256> {
    if slippage_percent > 100 {
        return Err(LaunchpadError::InvalidSlippage(slippage_percent));
    }
    let keep = U256::from(100 - slippage_percent);
    // amount * keep overflows only above U256::MAX / 100; fall back to
    // dividing first, which loses at most the last two digits.
    Ok(match amount.checked_mul(keep) {
        Some(product) => product / U256::from(100u8),
        None => amount / U256::from(100u8) * keep,
    })
}

/// Gas limit submitted with a transaction: `floor(estimate * buffer / 100)`.
pub fn gas_limit_with_buffer(estimate: u64, buffer_percent: u64) -> u64 {
    let limit = u128::from(estimate) * u128::from(buffer_percent) / 100;
    u64::try_from(limit).unwrap_or(u64::MAX)
}

/// Contract-enforced expiry for swaps and liquidity adds.
pub fn deadline_after(now_unix: u64, seconds: u64) -> U256 {
    U256::from(now_unix.saturating_add(seconds))
}
