//! # fairshare-accrual: Weighted fair-share accrual.
//!
//! All calculations use integer fixed-point arithmetic for determinism.
//!
//! - **Accumulator**: per-group aggregate state (`count`, `normalized_weight`,
//!   `historical_z`, `last_update`). Adding, removing, or reweighting a member
//!   is O(1) and never enumerates the group.
//! - **Historical Z**: running integral of the normalized weight over logical
//!   time. Differences of Z between two instants give a member's accrued share
//!   without scanning other members.
//! - **Participant registry**: append-only ordered membership with O(1)
//!   identity lookup and stable indices.

pub mod accumulator;
pub mod registry;

pub use accumulator::{Accumulator, Readjustment};
pub use registry::ParticipantRegistry;
