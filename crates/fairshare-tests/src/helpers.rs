//! Shared fixtures for integration tests.

use std::sync::Arc;

use fairshare_core::memory::{EventLog, MemoryYieldSource, Whitelist};
use fairshare_core::types::{Amount, ChannelType, Identity, Timestamp};
use fairshare_pool::{ChannelManager, PoolConfig};

/// Logical time the test pool is created at.
pub const GENESIS: Timestamp = 1;

/// A pool plus handles to its in-memory collaborators.
pub struct TestPool {
    pub manager: ChannelManager,
    pub source: Arc<MemoryYieldSource>,
    pub whitelist: Arc<Whitelist>,
    pub events: Arc<EventLog>,
    now: Timestamp,
}

impl TestPool {
    /// Pool with the default config and an empty whitelist.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let source = Arc::new(MemoryYieldSource::new());
        let whitelist = Arc::new(Whitelist::new());
        let events = Arc::new(EventLog::new());
        let manager = ChannelManager::new(
            config,
            source.clone(),
            whitelist.clone(),
            events.clone(),
            GENESIS,
        )
        .unwrap();
        Self {
            manager,
            source,
            whitelist,
            events,
            now: GENESIS,
        }
    }

    /// Advance the logical clock by one tick and return the new time.
    pub fn tick(&mut self) -> Timestamp {
        self.now += 1;
        self.now
    }

    /// Current logical time of the fixture.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Whitelist `label` and open an interest-bearing channel for it at the next tick.
    pub fn open(&mut self, label: &str, contribution: Amount) -> Identity {
        let owner = id(label);
        self.whitelist.add(owner);
        let now = self.tick();
        self.manager
            .create_channel(owner, contribution, ChannelType::InterestBearingOpen, label.as_bytes().to_vec(), now)
            .unwrap();
        owner
    }
}

impl Default for TestPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity derived from a readable label.
pub fn id(label: &str) -> Identity {
    Identity::from_label(label)
}
