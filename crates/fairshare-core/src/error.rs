//! Error types for the Fairshare pool.
use thiserror::Error;

use crate::types::{Amount, Identity, Timestamp};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("division by zero")] DivisionByZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("stale or duplicate update: now {now} <= last update {last_update}")] StaleOrDuplicateUpdate { now: Timestamp, last_update: Timestamp },
    #[error("inconsistent weight: removing {weight} from group total {total}")] InconsistentWeight { weight: u128, total: u128 },
    #[error("cannot remove from an empty group")] EmptyGroup,
    #[error("invalid interval: z_to {z_to} < z_from {z_from}")] InvalidInterval { z_from: u128, z_to: u128 },
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("participant already active: {0}")] DuplicateParticipant(Identity),
    #[error("participant not found: {0}")] NotFound(Identity),
    #[error("no participant at index {0}")] IndexOutOfRange(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum YieldSourceError {
    #[error("deposit rejected: {0}")] Rejected(String),
    #[error("yield source unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("external deposit of {amount} failed: {source}")] ExternalDepositFailed { amount: Amount, source: YieldSourceError },
    #[error("negative yield observed: balance {balance} < principal {principal}")] NegativeYieldObserved { balance: Amount, principal: Amount },
    #[error("balance query failed: {0}")] BalanceQueryFailed(YieldSourceError),
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("not whitelisted for channel creation: {0}")] NotWhitelisted(Identity),
    #[error("invalid channel type: {0}")] InvalidChannelType(u8),
    #[error("contribution {amount} outside [{min}, {max}]")] ContributionOutOfBounds { amount: Amount, min: Amount, max: Amount },
    #[error("already owns an active channel: {0}")] AlreadyOwnsChannel(Identity),
    #[error("channel deactivated or missing: {0}")] ChannelNotActive(Identity),
    #[error("channel has external subscribers: {0}")] HasExternalSubscribers(Identity),
    #[error("{caller} is not the owner of channel {channel}")] NotChannelOwner { caller: Identity, channel: Identity },
    #[error("promoter channel already exists")] PromoterChannelAlreadyExists,
    #[error("{user} already subscribed to {channel}")] AlreadySubscribed { user: Identity, channel: Identity },
    #[error("{user} not subscribed to {channel}")] NotSubscribed { user: Identity, channel: Identity },
    #[error("owner cannot unsubscribe from own channel: {0}")] OwnerCannotUnsubscribe(Identity),
    #[error("clock regression: now {now} < last seen {last}")] ClockRegression { now: Timestamp, last: Timestamp },
    #[error(transparent)] Accrual(#[from] AccrualError),
    #[error(transparent)] Registry(#[from] RegistryError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("scale must be non-zero")] ZeroScale,
    #[error("minimum contribution must be non-zero")] ZeroMinimum,
    #[error("minimum contribution {min} exceeds maximum {max}")] InvertedBounds { min: Amount, max: Amount },
    #[error("allowed channel type set is empty")] NoAllowedTypes,
    #[error("protocol-only channel type cannot be user-created: {0}")] ProtocolTypeAllowed(u8),
    #[error("default channel and promoter share identity {0}")] SharedProtocolIdentity(Identity),
    #[error("load: {0}")] Load(String),
}

#[derive(Error, Debug)]
pub enum FairShareError {
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Accrual(#[from] AccrualError),
    #[error(transparent)] Registry(#[from] RegistryError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Channel(#[from] ChannelError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] YieldSource(#[from] YieldSourceError),
}
