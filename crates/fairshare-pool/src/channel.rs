//! Channel, subscriber-group, and user records.
//!
//! A channel's registry entry (weight, start time, active flag, member count)
//! lives in the manager's channel registry. Everything else a channel owns
//! is kept in a [`ChannelState`] at the same registry index. [`Channel`] is
//! the read-only view combining both.

use fairshare_accrual::{Accumulator, ParticipantRegistry, Readjustment};
use fairshare_core::error::ChannelError;
use fairshare_core::types::{Amount, ChannelType, Identity, Participant, Timestamp, Weight};
use serde::{Deserialize, Serialize};

/// Read-only view of a channel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub owner: Identity,
    pub channel_type: ChannelType,
    pub deactivated: bool,
    /// Amount deposited into the pool when the channel was created.
    pub pool_contribution: Amount,
    /// Size of the subscriber group, owner included.
    pub member_count: u64,
    /// Subscriber accumulator Z.
    pub historical_z: u128,
    /// Subscriber accumulator count.
    pub fair_share_count: u64,
    /// Subscriber accumulator last update.
    pub last_update: Timestamp,
    pub start_time: Timestamp,
    pub update_time: Timestamp,
    pub weight: Weight,
}

impl Channel {
    pub(crate) fn assemble(entry: &Participant, state: &ChannelState) -> Self {
        let subscribers = state.subscribers.accumulator();
        Self {
            owner: entry.identity,
            channel_type: state.channel_type,
            deactivated: !entry.active,
            pool_contribution: state.pool_contribution,
            member_count: entry.member_count,
            historical_z: subscribers.historical_z,
            fair_share_count: subscribers.count,
            last_update: subscribers.last_update,
            start_time: entry.joined_at,
            update_time: state.update_time,
            weight: entry.weight,
        }
    }
}

/// Per-channel state stored alongside the channel's registry entry.
#[derive(Clone, Debug)]
pub(crate) struct ChannelState {
    pub channel_type: ChannelType,
    pub pool_contribution: Amount,
    pub update_time: Timestamp,
    pub subscribers: SubscriberGroup,
}

/// Pending subscriber join: validated and computed, not yet applied.
#[derive(Debug)]
pub(crate) struct StagedJoin {
    accumulator: Accumulator,
    participant: Participant,
}

/// Pending subscriber leave.
#[derive(Debug)]
pub(crate) struct StagedLeave {
    accumulator: Accumulator,
    user: Identity,
}

/// A channel's subscribers: their accumulator and registry.
///
/// Changes are two-phase. `stage_*` validates and computes the new
/// accumulator without touching state; `commit_*` applies it. This lets the
/// manager stage every change of a lifecycle call before committing any.
#[derive(Clone, Debug, Default)]
pub struct SubscriberGroup {
    accumulator: Accumulator,
    members: ParticipantRegistry,
}

impl SubscriberGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn members(&self) -> &ParticipantRegistry {
        &self.members
    }

    pub fn is_member(&self, user: &Identity) -> bool {
        self.members.contains_active(user)
    }

    pub(crate) fn stage_join(
        &self,
        channel: Identity,
        user: Identity,
        weight: Weight,
        now: Timestamp,
    ) -> Result<StagedJoin, ChannelError> {
        if self.is_member(&user) {
            return Err(ChannelError::AlreadySubscribed { user, channel });
        }
        let accumulator = self
            .accumulator
            .readjusted(Readjustment::Add { weight }, now)?;
        Ok(StagedJoin {
            accumulator,
            participant: Participant::new(user, weight, now),
        })
    }

    pub(crate) fn commit_join(&mut self, staged: StagedJoin) -> Result<u64, ChannelError> {
        self.members.add(staged.participant)?;
        self.accumulator = staged.accumulator;
        Ok(self.accumulator.count)
    }

    pub(crate) fn stage_leave(
        &self,
        channel: Identity,
        user: Identity,
        now: Timestamp,
    ) -> Result<StagedLeave, ChannelError> {
        let weight = match self.members.find(&user) {
            Some(p) if p.active => p.weight,
            _ => return Err(ChannelError::NotSubscribed { user, channel }),
        };
        let accumulator = self
            .accumulator
            .readjusted(Readjustment::Remove { weight }, now)?;
        Ok(StagedLeave { accumulator, user })
    }

    pub(crate) fn commit_leave(&mut self, staged: StagedLeave) -> Result<u64, ChannelError> {
        self.members.deactivate(&staged.user)?;
        self.accumulator = staged.accumulator;
        Ok(self.accumulator.count)
    }
}

/// What the pool knows about a user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    /// Time the user first subscribed or created a channel.
    pub start_time: Timestamp,
    /// Whether the user currently owns an active channel.
    pub channellized: bool,
    /// Number of channels the user is subscribed to.
    pub subscriptions: u64,
}

impl UserRecord {
    pub fn new(start_time: Timestamp) -> Self {
        Self {
            start_time,
            channellized: false,
            subscriptions: 0,
        }
    }
}
