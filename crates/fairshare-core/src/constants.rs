//! Protocol constants. Amounts are in the pool token's smallest unit; weights
//! are fixed-point with [`SCALE`] as the denominator.

/// Fixed-point scale factor. A weight of `SCALE` represents `1.0`.
pub const SCALE: u128 = 10_000_000;

/// Default minimum contribution required to create a channel.
pub const DEFAULT_MIN_CONTRIBUTION: u128 = 50;

/// Default maximum contribution accepted when creating a channel.
///
/// # Examples
///
/// ```
/// use fairshare_core::constants::{DEFAULT_MAX_CONTRIBUTION, DEFAULT_MIN_CONTRIBUTION};
/// assert_eq!(DEFAULT_MAX_CONTRIBUTION, 250_000 * DEFAULT_MIN_CONTRIBUTION);
/// ```
pub const DEFAULT_MAX_CONTRIBUTION: u128 = 250_000 * DEFAULT_MIN_CONTRIBUTION;

/// Timestamp carried by an accumulator that has never been readjusted.
///
/// The logical clock supplied by callers starts at `GENESIS_TIME + 1`.
pub const GENESIS_TIME: u64 = 0;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "FAIRSHARE";

/// Length in bytes of a participant identity.
pub const IDENTITY_LEN: usize = 20;
