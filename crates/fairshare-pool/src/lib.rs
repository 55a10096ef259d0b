//! # fairshare-pool
//!
//! Pool funds bookkeeping and the channel lifecycle state machine.
//!
//! - [`config::PoolConfig`]: contribution bounds, scale, allowed channel types
//! - [`ledger::PoolLedger`]: principal vs. yield-source balance
//! - [`channel`]: channel, subscriber-group, and user records
//! - [`manager::ChannelManager`]: create / update / deactivate / subscribe

pub mod channel;
pub mod config;
pub mod ledger;
pub mod manager;

pub use crate::channel::{Channel, SubscriberGroup, UserRecord};
pub use crate::config::PoolConfig;
pub use crate::ledger::PoolLedger;
pub use crate::manager::{ChannelManager, PoolSnapshot, SharedManager};
