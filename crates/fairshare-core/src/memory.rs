//! In-memory collaborators for tests, simulations, and the CLI.
//!
//! All types are `Send + Sync` and use `parking_lot` locks for interior
//! mutability, since collaborator traits take `&self`.

use std::collections::HashSet;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::error::YieldSourceError;
use crate::events::ChannelEvent;
use crate::traits::{AccessControl, EventSink, YieldSource};
use crate::types::{Amount, Identity};

#[derive(Debug, Default)]
struct VenueState {
    balance: Amount,
    deposits: u64,
    fail_next_deposit: Option<String>,
}

/// Yield venue simulated in memory. Interest is added explicitly with
/// [`accrue`](Self::accrue); losses with [`slash`](Self::slash).
#[derive(Debug, Default)]
pub struct MemoryYieldSource {
    state: Mutex<VenueState>,
}

impl MemoryYieldSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit interest to the venue balance.
    pub fn accrue(&self, amount: Amount) {
        let mut state = self.state.lock();
        state.balance = state.balance.saturating_add(amount);
    }

    /// Remove funds from the venue balance, e.g. to model a loss.
    pub fn slash(&self, amount: Amount) {
        let mut state = self.state.lock();
        state.balance = state.balance.saturating_sub(amount);
    }

    /// Make the next deposit fail with the given reason.
    pub fn fail_next_deposit(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_deposit = Some(reason.into());
    }

    /// Number of successful deposits.
    pub fn deposit_count(&self) -> u64 {
        self.state.lock().deposits
    }
}

impl YieldSource for MemoryYieldSource {
    fn deposit(&self, amount: Amount) -> Result<(), YieldSourceError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_deposit.take() {
            return Err(YieldSourceError::Rejected(reason));
        }
        state.balance = state
            .balance
            .checked_add(amount)
            .ok_or_else(|| YieldSourceError::Rejected("balance overflow".into()))?;
        state.deposits += 1;
        Ok(())
    }

    fn balance(&self) -> Result<Amount, YieldSourceError> {
        Ok(self.state.lock().balance)
    }
}

/// Explicit whitelist of identities allowed to create channels.
#[derive(Debug, Default)]
pub struct Whitelist {
    members: RwLock<HashSet<Identity>>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a whitelist from a list of identities.
    pub fn with_members(members: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            members: RwLock::new(members.into_iter().collect()),
        }
    }

    /// Returns `true` if the identity was newly added.
    pub fn add(&self, identity: Identity) -> bool {
        self.members.write().insert(identity)
    }

    /// Returns `true` if the identity was present.
    pub fn remove(&self, identity: &Identity) -> bool {
        self.members.write().remove(identity)
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

impl AccessControl for Whitelist {
    fn is_whitelisted(&self, identity: &Identity) -> bool {
        self.members.read().contains(identity)
    }
}

/// Access control that admits everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn is_whitelisted(&self, _identity: &Identity) -> bool {
        true
    }
}

/// Event sink that records every event in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ChannelEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events.
    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    /// Drain and return recorded events.
    pub fn take(&self) -> Vec<ChannelEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: ChannelEvent) {
        self.events.lock().push(event);
    }
}

/// Event sink that writes each event to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: ChannelEvent) {
        match &event {
            ChannelEvent::ChannelAdded { identity, channel_type, meta } => {
                info!(%identity, ?channel_type, meta_len = meta.len(), "{}", event.name())
            }
            ChannelEvent::ChannelUpdated { identity, meta } => {
                info!(%identity, meta_len = meta.len(), "{}", event.name())
            }
            ChannelEvent::ChannelDeactivated { identity } => {
                info!(%identity, "{}", event.name())
            }
            ChannelEvent::Subscribed { channel, user }
            | ChannelEvent::Unsubscribed { channel, user } => {
                info!(%channel, %user, "{}", event.name())
            }
        }
    }
}
