//! Ordered participant registry with stable indices.
//!
//! Provides:
//! - O(1) append with a stable index for the participant's lifetime
//! - O(1) lookup by identity
//! - positional enumeration ("nth channel")
//!
//! Removal is logical: a participant is deactivated in place and its slot is
//! never reused. An identity that left may join again; it gets a new slot and
//! the identity index points to the newest one.
//!
//! Not thread-safe; callers should wrap the owning structure in a `Mutex`
//! if concurrent access is needed.

use std::collections::HashMap;

use fairshare_core::error::RegistryError;
use fairshare_core::types::{Identity, Participant};

#[derive(Clone, Debug, Default)]
pub struct ParticipantRegistry {
    /// Every participant ever added, in insertion order.
    entries: Vec<Participant>,
    /// Identity to index of its most recent entry.
    by_identity: HashMap<Identity, usize>,
    /// Number of entries with `active == true`.
    active: usize,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a participant and return its index.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateParticipant`] if the identity is currently active
    pub fn add(&mut self, participant: Participant) -> Result<usize, RegistryError> {
        if self.contains_active(&participant.identity) {
            return Err(RegistryError::DuplicateParticipant(participant.identity));
        }
        let index = self.entries.len();
        self.by_identity.insert(participant.identity, index);
        if participant.active {
            self.active += 1;
        }
        self.entries.push(participant);
        Ok(index)
    }

    /// Participant at `index`, active or not.
    pub fn get(&self, index: usize) -> Result<&Participant, RegistryError> {
        self.entries
            .get(index)
            .ok_or(RegistryError::IndexOutOfRange(index))
    }

    /// Index of the identity's most recent entry.
    pub fn index_of(&self, identity: &Identity) -> Result<usize, RegistryError> {
        self.by_identity
            .get(identity)
            .copied()
            .ok_or(RegistryError::NotFound(*identity))
    }

    /// Most recent entry for the identity.
    pub fn find(&self, identity: &Identity) -> Option<&Participant> {
        self.by_identity.get(identity).map(|&i| &self.entries[i])
    }

    /// Whether the identity is currently an active participant.
    pub fn contains_active(&self, identity: &Identity) -> bool {
        self.find(identity).is_some_and(|p| p.active)
    }

    /// Number of active participants.
    pub fn count(&self) -> usize {
        self.active
    }

    /// Number of entries ever added, including inactive ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter()
    }

    /// Active entries in insertion order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter().filter(|p| p.active)
    }

    /// Mark the identity's entry inactive and return it.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if the identity has no active entry
    pub fn deactivate(&mut self, identity: &Identity) -> Result<&Participant, RegistryError> {
        let entry = self.active_entry_mut(identity)?;
        entry.active = false;
        self.active -= 1;
        self.get(self.index_of(identity)?)
    }

    /// Record a channel's subscriber-group size.
    pub fn set_member_count(&mut self, identity: &Identity, member_count: u64) -> Result<(), RegistryError> {
        self.active_entry_mut(identity)?.member_count = member_count;
        Ok(())
    }

    fn active_entry_mut(&mut self, identity: &Identity) -> Result<&mut Participant, RegistryError> {
        let index = self.index_of(identity)?;
        let entry = &mut self.entries[index];
        if !entry.active {
            return Err(RegistryError::NotFound(*identity));
        }
        Ok(entry)
    }
}
