//! # fairshare-core
//! Foundation types, fixed-point math, and collaborator traits for the
//! Fairshare channel pool.

pub mod constants;
pub mod error;
pub mod events;
pub mod math;
pub mod memory;
pub mod traits;
pub mod types;
