//! Channel lifecycle manager.
//!
//! [`ChannelManager`] owns the channel-level accumulator, the channel
//! registry, every channel's subscriber group, the user table and the pool
//! ledger. Each mutating call runs in four phases:
//!
//! 1. validate preconditions in a fixed order
//! 2. stage every accumulator change (pure, may fail)
//! 3. perform the one external effect, the yield-source deposit
//! 4. commit staged state and emit events
//!
//! A failure in phases 1-3 leaves the manager untouched.
//!
//! The default channel is created at construction and always sits at
//! registry index 0. Channel creators are subscribed to it automatically.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fairshare_accrual::{Accumulator, ParticipantRegistry, Readjustment};
use fairshare_core::error::{ChannelError, FairShareError, LedgerError, RegistryError};
use fairshare_core::events::ChannelEvent;
use fairshare_core::math::ratio_of;
use fairshare_core::traits::{AccessControl, EventSink, YieldSource};
use fairshare_core::types::{Amount, ChannelType, Identity, Participant, Timestamp, Weight};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channel::{Channel, ChannelState, SubscriberGroup, UserRecord};
use crate::config::PoolConfig;
use crate::ledger::PoolLedger;

const DEFAULT_CHANNEL_INDEX: usize = 0;

/// A manager shared across threads.
pub type SharedManager = Arc<Mutex<ChannelManager>>;

/// Point-in-time view of the whole pool.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub clock: Timestamp,
    pub pool_funds: Amount,
    /// `None` when the yield source cannot report a non-negative yield.
    pub current_yield: Option<Amount>,
    pub channel_group: Accumulator,
    pub channels: Vec<Channel>,
    pub users_count: usize,
}

pub struct ChannelManager {
    config: PoolConfig,
    channel_group: Accumulator,
    channels: ParticipantRegistry,
    /// Parallel to `channels`: `states[i]` belongs to registry entry `i`.
    states: Vec<ChannelState>,
    users: HashMap<Identity, UserRecord>,
    ledger: PoolLedger,
    access: Arc<dyn AccessControl>,
    events: Arc<dyn EventSink>,
    clock: Timestamp,
}

impl fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelManager")
            .field("clock", &self.clock)
            .field("channel_group", &self.channel_group)
            .field("channels", &self.channels.len())
            .field("users", &self.users.len())
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl ChannelManager {
    /// Build a pool and create its default channel at `genesis`.
    ///
    /// `genesis` must be after time zero, since accumulators start there.
    pub fn new(
        config: PoolConfig,
        yield_source: Arc<dyn YieldSource>,
        access: Arc<dyn AccessControl>,
        events: Arc<dyn EventSink>,
        genesis: Timestamp,
    ) -> Result<Self, FairShareError> {
        config.validate()?;
        let default_channel = config.default_channel;
        let mut manager = Self {
            config,
            channel_group: Accumulator::new(),
            channels: ParticipantRegistry::new(),
            states: Vec::new(),
            users: HashMap::new(),
            ledger: PoolLedger::new(yield_source),
            access,
            events,
            clock: genesis,
        };
        manager.open_channel(
            default_channel,
            0,
            ChannelType::ProtocolNonInterest,
            Vec::new(),
            genesis,
        )?;
        info!(%default_channel, genesis, "pool initialised");
        Ok(manager)
    }

    /// Wrap the manager for use from several threads.
    pub fn into_shared(self) -> SharedManager {
        Arc::new(Mutex::new(self))
    }

    // --- lifecycle ---

    /// Create a user channel funded with `contribution`. Returns its registry index.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - [`ChannelError::ClockRegression`]
    /// - [`ChannelError::NotWhitelisted`]
    /// - [`ChannelError::AlreadyOwnsChannel`]
    /// - [`ChannelError::InvalidChannelType`] if the type is not user-creatable
    /// - [`ChannelError::ContributionOutOfBounds`]
    /// - accrual errors while staging, then [`ChannelError::Ledger`] on deposit failure
    pub fn create_channel(
        &mut self,
        owner: Identity,
        contribution: Amount,
        channel_type: ChannelType,
        meta: Vec<u8>,
        now: Timestamp,
    ) -> Result<usize, ChannelError> {
        self.check_clock(now)?;
        if !self.access.is_whitelisted(&owner) {
            return Err(ChannelError::NotWhitelisted(owner));
        }
        if self.channels.contains_active(&owner) {
            return Err(ChannelError::AlreadyOwnsChannel(owner));
        }
        if !self.config.is_allowed(channel_type) {
            return Err(ChannelError::InvalidChannelType(channel_type.into()));
        }
        if !self.config.in_bounds(contribution) {
            return Err(ChannelError::ContributionOutOfBounds {
                amount: contribution,
                min: self.config.min_contribution,
                max: self.config.max_contribution,
            });
        }
        self.open_channel(owner, contribution, channel_type, meta, now)
    }

    /// Create the protocol promotion channel, owned by the configured promoter
    /// and funded with the minimum contribution. No whitelist check.
    pub fn create_promoter_channel(&mut self, now: Timestamp) -> Result<usize, ChannelError> {
        self.check_clock(now)?;
        let promoter = self.config.promoter;
        if self.channels.contains_active(&promoter) {
            return Err(ChannelError::PromoterChannelAlreadyExists);
        }
        self.open_channel(
            promoter,
            self.config.min_contribution,
            ChannelType::ProtocolPromotion,
            Vec::new(),
            now,
        )
    }

    /// Replace a channel's metadata. Only allowed while the owner is the
    /// channel's sole subscriber.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::ClockRegression`]
    /// - [`ChannelError::NotChannelOwner`] if `caller != channel`
    /// - [`ChannelError::ChannelNotActive`]
    /// - [`ChannelError::HasExternalSubscribers`]
    pub fn update_channel_meta(
        &mut self,
        caller: Identity,
        channel: Identity,
        meta: Vec<u8>,
        now: Timestamp,
    ) -> Result<(), ChannelError> {
        self.check_clock(now)?;
        if caller != channel {
            return Err(ChannelError::NotChannelOwner { caller, channel });
        }
        let index = self.active_index(&channel)?;
        if self.channels.get(index)?.member_count > 1 {
            return Err(ChannelError::HasExternalSubscribers(channel));
        }

        self.state_mut(index)?.update_time = now;
        self.clock = now;
        debug!(%channel, meta_len = meta.len(), now, "channel meta updated");
        self.events.emit(ChannelEvent::ChannelUpdated { identity: channel, meta });
        Ok(())
    }

    /// Deactivate `owner`'s channel and withdraw its weight from the channel group.
    ///
    /// Subscribers keep their membership records; the channel no longer
    /// accepts subscription changes.
    pub fn deactivate_channel(&mut self, owner: Identity, now: Timestamp) -> Result<(), ChannelError> {
        self.check_clock(now)?;
        let index = self.active_index(&owner)?;
        let weight = self.channels.get(index)?.weight;
        let channel_group = if weight > 0 {
            Some(self.channel_group.readjusted(Readjustment::Remove { weight }, now)?)
        } else {
            None
        };

        self.channels.deactivate(&owner)?;
        if let Some(channel_group) = channel_group {
            self.channel_group = channel_group;
        }
        if let Some(user) = self.users.get_mut(&owner) {
            user.channellized = false;
        }
        self.clock = now;
        info!(%owner, index, weight, "channel deactivated");
        self.events.emit(ChannelEvent::ChannelDeactivated { identity: owner });
        Ok(())
    }

    /// Subscribe `user` to an active channel. Every subscriber weighs `1.0`
    /// at the configured scale.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::ClockRegression`]
    /// - [`ChannelError::ChannelNotActive`]
    /// - [`ChannelError::AlreadySubscribed`]
    pub fn subscribe(&mut self, user: Identity, channel: Identity, now: Timestamp) -> Result<(), ChannelError> {
        self.check_clock(now)?;
        let index = self.active_index(&channel)?;
        let scale = self.config.scale;
        let staged = self.state(index)?.subscribers.stage_join(channel, user, scale, now)?;

        let members = self.state_mut(index)?.subscribers.commit_join(staged)?;
        self.channels.set_member_count(&channel, members)?;
        self.users
            .entry(user)
            .or_insert_with(|| UserRecord::new(now))
            .subscriptions += 1;
        self.clock = now;
        debug!(%channel, %user, members, "subscribed");
        self.events.emit(ChannelEvent::Subscribed { channel, user });
        Ok(())
    }

    /// Remove `user` from an active channel's subscriber group.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::ClockRegression`]
    /// - [`ChannelError::ChannelNotActive`]
    /// - [`ChannelError::OwnerCannotUnsubscribe`]
    /// - [`ChannelError::NotSubscribed`]
    pub fn unsubscribe(&mut self, user: Identity, channel: Identity, now: Timestamp) -> Result<(), ChannelError> {
        self.check_clock(now)?;
        let index = self.active_index(&channel)?;
        if user == channel {
            return Err(ChannelError::OwnerCannotUnsubscribe(channel));
        }
        let staged = self.state(index)?.subscribers.stage_leave(channel, user, now)?;

        let members = self.state_mut(index)?.subscribers.commit_leave(staged)?;
        self.channels.set_member_count(&channel, members)?;
        if let Some(record) = self.users.get_mut(&user) {
            record.subscriptions = record.subscriptions.saturating_sub(1);
        }
        self.clock = now;
        debug!(%channel, %user, members, "unsubscribed");
        self.events.emit(ChannelEvent::Unsubscribed { channel, user });
        Ok(())
    }

    // --- queries ---

    /// Most recent channel owned by `owner`, active or not.
    pub fn channel(&self, owner: &Identity) -> Result<Channel, ChannelError> {
        self.channel_at(self.channels.index_of(owner)?)
    }

    /// Channel at registry position `index`.
    pub fn channel_at(&self, index: usize) -> Result<Channel, ChannelError> {
        Ok(Channel::assemble(self.channels.get(index)?, self.state(index)?))
    }

    /// Number of channels ever created, including the default channel and
    /// deactivated ones.
    pub fn channels_count(&self) -> usize {
        self.channels.len()
    }

    /// Active channels in creation order.
    pub fn active_channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channels
            .iter()
            .zip(&self.states)
            .filter(|(entry, _)| entry.active)
            .map(|(entry, state)| Channel::assemble(entry, state))
    }

    /// Whether `user` currently belongs to `channel`'s subscriber group.
    pub fn member_exists(&self, user: &Identity, channel: &Identity) -> bool {
        self.subscriber_group(channel)
            .is_some_and(|group| group.is_member(user))
    }

    pub fn subscriber_group(&self, channel: &Identity) -> Option<&SubscriberGroup> {
        let index = self.channels.index_of(channel).ok()?;
        self.states.get(index).map(|state| &state.subscribers)
    }

    pub fn user(&self, identity: &Identity) -> Option<&UserRecord> {
        self.users.get(identity)
    }

    pub fn users_count(&self) -> usize {
        self.users.len()
    }

    /// Fair-share accumulator over all yield-bearing channels.
    pub fn channel_group(&self) -> &Accumulator {
        &self.channel_group
    }

    pub fn pool_funds(&self) -> Amount {
        self.ledger.pool_funds()
    }

    pub fn current_yield(&self) -> Result<Amount, LedgerError> {
        self.ledger.current_yield()
    }

    /// Part of the current yield owed to an active channel at the present
    /// channel-group composition.
    pub fn channel_yield_share(&self, channel: &Identity) -> Result<Amount, ChannelError> {
        let index = self.active_index(channel)?;
        let weight = self.channels.get(index)?.weight;
        if weight == 0 {
            return Ok(0);
        }
        let total_yield = self.ledger.current_yield()?;
        Ok(self.channel_group.apportion(total_yield, weight)?)
    }

    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            clock: self.clock,
            pool_funds: self.ledger.pool_funds(),
            current_yield: self.ledger.current_yield().ok(),
            channel_group: self.channel_group,
            channels: self
                .channels
                .iter()
                .zip(&self.states)
                .map(|(entry, state)| Channel::assemble(entry, state))
                .collect(),
            users_count: self.users.len(),
        }
    }

    // --- internals ---

    fn open_channel(
        &mut self,
        owner: Identity,
        contribution: Amount,
        channel_type: ChannelType,
        meta: Vec<u8>,
        now: Timestamp,
    ) -> Result<usize, ChannelError> {
        let weight: Weight = if channel_type.accrues_yield() {
            ratio_of(contribution, self.config.min_contribution, self.config.scale)?
        } else {
            0
        };

        // Stage.
        let channel_group = if weight > 0 {
            Some(self.channel_group.readjusted(Readjustment::Add { weight }, now)?)
        } else {
            None
        };
        let mut subscribers = SubscriberGroup::new();
        let own_join = subscribers.stage_join(owner, owner, self.config.scale, now)?;
        let default_join = if self.joins_default_channel(&owner)? {
            let default_owner = self.config.default_channel;
            let default_group = &self.state(DEFAULT_CHANNEL_INDEX)?.subscribers;
            Some(default_group.stage_join(default_owner, owner, self.config.scale, now)?)
        } else {
            None
        };

        // External effect.
        if contribution > 0 {
            self.ledger.deposit(contribution)?;
        }

        // Commit.
        let index = self.channels.add(Participant::new(owner, weight, now))?;
        let members = subscribers.commit_join(own_join)?;
        self.channels.set_member_count(&owner, members)?;
        self.states.push(ChannelState {
            channel_type,
            pool_contribution: contribution,
            update_time: now,
            subscribers,
        });
        if let Some(channel_group) = channel_group {
            self.channel_group = channel_group;
        }
        let default_owner = self.config.default_channel;
        let joined_default = default_join.is_some();
        if let Some(staged) = default_join {
            let members = self
                .state_mut(DEFAULT_CHANNEL_INDEX)?
                .subscribers
                .commit_join(staged)?;
            self.channels.set_member_count(&default_owner, members)?;
        }
        let user = self.users.entry(owner).or_insert_with(|| UserRecord::new(now));
        user.channellized = true;
        user.subscriptions += 1 + u64::from(joined_default);
        self.clock = now;

        info!(
            %owner,
            ?channel_type,
            contribution,
            weight,
            index,
            channels = self.channel_group.count,
            normalized_weight = self.channel_group.normalized_weight,
            "channel created"
        );

        let mut events = vec![
            ChannelEvent::ChannelAdded { identity: owner, channel_type, meta },
            ChannelEvent::Subscribed { channel: owner, user: owner },
        ];
        if joined_default {
            events.push(ChannelEvent::Subscribed { channel: default_owner, user: owner });
        }
        self.events.emit_all(events);
        Ok(index)
    }

    /// Whether a new channel owner should be added to the default channel.
    fn joins_default_channel(&self, owner: &Identity) -> Result<bool, ChannelError> {
        if *owner == self.config.default_channel {
            return Ok(false);
        }
        if !self.channels.get(DEFAULT_CHANNEL_INDEX)?.active {
            return Ok(false);
        }
        Ok(!self.state(DEFAULT_CHANNEL_INDEX)?.subscribers.is_member(owner))
    }

    fn check_clock(&self, now: Timestamp) -> Result<(), ChannelError> {
        if now < self.clock {
            return Err(ChannelError::ClockRegression { now, last: self.clock });
        }
        Ok(())
    }

    /// Registry index of `channel` if it exists and is active.
    fn active_index(&self, channel: &Identity) -> Result<usize, ChannelError> {
        match self.channels.index_of(channel) {
            Ok(index) if self.channels.get(index)?.active => Ok(index),
            _ => Err(ChannelError::ChannelNotActive(*channel)),
        }
    }

    fn state(&self, index: usize) -> Result<&ChannelState, ChannelError> {
        self.states
            .get(index)
            .ok_or(ChannelError::Registry(RegistryError::IndexOutOfRange(index)))
    }

    fn state_mut(&mut self, index: usize) -> Result<&mut ChannelState, ChannelError> {
        self.states
            .get_mut(index)
            .ok_or(ChannelError::Registry(RegistryError::IndexOutOfRange(index)))
    }
}
