//! Fair-share accumulator for one weighted group.
//!
//! The accumulator tracks only aggregate statistics of a group (member count,
//! total and normalized weight, historical Z, last update time). It knows
//! nothing about individual members: callers supply the weight being added,
//! and on removal or reweight the weight that was previously added.
//!
//! Every readjustment first advances Z by `normalized_weight * elapsed`,
//! capturing the weight-time accrued under the old composition, and only
//! then applies the membership change. This makes each update O(1).
//!
//! A fresh accumulator sits at [`GENESIS_TIME`]; the first readjustment
//! must happen strictly after it.

use fairshare_core::constants::GENESIS_TIME;
use fairshare_core::error::{AccrualError, MathError};
use fairshare_core::math::{checked_add, checked_mul, mul_div};
use fairshare_core::types::{Timestamp, Weight};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A membership change applied to an [`Accumulator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readjustment {
    /// A member joins with `weight`.
    Add { weight: Weight },
    /// A member that joined with `weight` leaves.
    Remove { weight: Weight },
    /// A member's weight changes from `previous` to `new`; count unchanged.
    Reweight { previous: Weight, new: Weight },
}

/// Aggregate fair-share state of one group.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accumulator {
    /// Number of active members.
    pub count: u64,
    /// Average weight per member. Each readjustment re-averages from
    /// `normalized_weight * count`, so truncation carries forward.
    pub normalized_weight: Weight,
    /// Exact sum of member weights, used for apportioning.
    pub total_weight: Weight,
    /// Integral of `normalized_weight` over logical time up to `last_update`.
    pub historical_z: u128,
    /// Logical time of the last readjustment.
    pub last_update: Timestamp,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    /// An empty group that has never been readjusted.
    pub fn new() -> Self {
        Self {
            count: 0,
            normalized_weight: 0,
            total_weight: 0,
            historical_z: 0,
            last_update: GENESIS_TIME,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Compute the state after applying `action` at `now`, without mutating.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::StaleOrDuplicateUpdate`] if `now <= last_update`
    /// - [`AccrualError::EmptyGroup`] on `Remove`/`Reweight` of an empty group
    /// - [`AccrualError::InconsistentWeight`] if the removed weight exceeds the
    ///   exact total or the `normalized_weight * count` it is averaged out of
    /// - [`AccrualError::Math`] on overflow
    pub fn readjusted(&self, action: Readjustment, now: Timestamp) -> Result<Self, AccrualError> {
        if now <= self.last_update {
            return Err(AccrualError::StaleOrDuplicateUpdate {
                now,
                last_update: self.last_update,
            });
        }

        let historical_z = self.z_at(now)?;
        if self.count == 0 && !matches!(action, Readjustment::Add { .. }) {
            return Err(AccrualError::EmptyGroup);
        }

        let (count, normalized_weight, total_weight) = match action {
            Readjustment::Add { weight } => {
                let (count, normalized_weight) =
                    averaged_add(self.count, self.normalized_weight, weight)?;
                (count, normalized_weight, checked_add(self.total_weight, weight)?)
            }
            Readjustment::Remove { weight } => {
                let total_weight = self.without(weight)?;
                let (count, normalized_weight) = self.averaged_remove(weight)?;
                // An emptied group forgets any residual weight.
                (count, normalized_weight, if count == 0 { 0 } else { total_weight })
            }
            Readjustment::Reweight { previous, new } => {
                let total_weight = checked_add(self.without(previous)?, new)?;
                let (count, normalized_weight) = self.averaged_remove(previous)?;
                let (count, normalized_weight) = averaged_add(count, normalized_weight, new)?;
                (count, normalized_weight, total_weight)
            }
        };

        Ok(Self {
            count,
            normalized_weight,
            total_weight,
            historical_z,
            last_update: now,
        })
    }

    /// Apply `action` at `now`. On error the accumulator is unchanged.
    pub fn readjust(&mut self, action: Readjustment, now: Timestamp) -> Result<(), AccrualError> {
        let next = self.readjusted(action, now)?;
        debug!(
            ?action,
            now,
            count = next.count,
            normalized_weight = next.normalized_weight,
            historical_z = next.historical_z,
            "accumulator readjusted"
        );
        *self = next;
        Ok(())
    }

    /// Historical Z as it would read at `now`, without mutating.
    ///
    /// Unlike [`readjusted`](Self::readjusted), `now == last_update` is allowed.
    pub fn projected_z(&self, now: Timestamp) -> Result<u128, AccrualError> {
        if now < self.last_update {
            return Err(AccrualError::StaleOrDuplicateUpdate {
                now,
                last_update: self.last_update,
            });
        }
        self.z_at(now)
    }

    /// Weight-time accrued by a member of `weight` between two Z readings,
    /// relative to the current group total: `(z_to - z_from) * weight / total_weight`.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::InvalidInterval`] if `z_to < z_from`
    /// - [`MathError::DivisionByZero`] (wrapped) for an empty group
    pub fn fair_share(&self, z_from: u128, z_to: u128, weight: Weight) -> Result<u128, AccrualError> {
        let delta = z_to
            .checked_sub(z_from)
            .ok_or(AccrualError::InvalidInterval { z_from, z_to })?;
        Ok(mul_div(delta, weight, self.total_weight)?)
    }

    /// Portion of `amount` owed to a member of `weight` at the group's current
    /// composition: `amount * weight / total_weight`, truncated.
    pub fn apportion(&self, amount: u128, weight: Weight) -> Result<u128, AccrualError> {
        if weight > self.total_weight {
            return Err(AccrualError::InconsistentWeight {
                weight,
                total: self.total_weight,
            });
        }
        Ok(mul_div(amount, weight, self.total_weight)?)
    }

    fn z_at(&self, now: Timestamp) -> Result<u128, AccrualError> {
        let elapsed = u128::from(now - self.last_update);
        Ok(checked_add(
            self.historical_z,
            checked_mul(self.normalized_weight, elapsed)?,
        )?)
    }

    /// `(normalized_weight * count - weight) / (count - 1)`, zero once empty.
    fn averaged_remove(&self, weight: Weight) -> Result<(u64, Weight), AccrualError> {
        let next = self.count.checked_sub(1).ok_or(AccrualError::EmptyGroup)?;
        if next == 0 {
            return Ok((0, 0));
        }
        let sum = checked_mul(self.normalized_weight, u128::from(self.count))?;
        let remaining = sum
            .checked_sub(weight)
            .ok_or(AccrualError::InconsistentWeight { weight, total: sum })?;
        Ok((next, remaining / u128::from(next)))
    }

    fn without(&self, weight: Weight) -> Result<Weight, AccrualError> {
        self.total_weight
            .checked_sub(weight)
            .ok_or(AccrualError::InconsistentWeight {
                weight,
                total: self.total_weight,
            })
    }
}

/// `(normalized_weight * count + weight) / (count + 1)`.
fn averaged_add(
    count: u64,
    normalized_weight: Weight,
    weight: Weight,
) -> Result<(u64, Weight), AccrualError> {
    let next = count.checked_add(1).ok_or(MathError::ArithmeticOverflow)?;
    let sum = checked_add(checked_mul(normalized_weight, u128::from(count))?, weight)?;
    Ok((next, sum / u128::from(next)))
}
