//! Integration and adversarial test suite for Fairshare.
//!
//! Tests drive a full [`ChannelManager`](fairshare_pool::ChannelManager)
//! through its public API with in-memory collaborators and check the pool's
//! invariants from the outside.

pub mod helpers;
