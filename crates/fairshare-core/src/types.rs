//! Core pool types: identities, channel types, participants.
//!
//! Amounts and weights are `u128`; weights are fixed-point with
//! [`SCALE`](crate::constants::SCALE) as denominator. Timestamps are logical
//! clock ticks supplied by the caller.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::IDENTITY_LEN;
use crate::error::ChannelError;

/// Token amount in the pool's smallest unit.
pub type Amount = u128;

/// Fixed-point weight (`SCALE` = 1.0).
pub type Weight = u128;

/// Logical clock value. Monotonically non-decreasing across calls.
pub type Timestamp = u64;

/// Opaque participant identity (20 bytes, rendered as hex).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity(pub [u8; IDENTITY_LEN]);

impl Identity {
    /// The all-zero identity.
    pub const ZERO: Self = Self([0u8; IDENTITY_LEN]);

    /// Create an identity from raw bytes.
    pub fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic identity from a human-readable label.
    ///
    /// Takes the first 20 bytes of the BLAKE3 hash of the label.
    ///
    /// # Examples
    ///
    /// ```
    /// use fairshare_core::types::Identity;
    /// assert_eq!(Identity::from_label("alice"), Identity::from_label("alice"));
    /// assert_ne!(Identity::from_label("alice"), Identity::from_label("bob"));
    /// ```
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..IDENTITY_LEN]);
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Check if this is the zero identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Error parsing an [`Identity`] from hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("expected {IDENTITY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(trimmed).map_err(|e| IdentityParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; IDENTITY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| IdentityParseError::InvalidLength(raw.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

/// Kind of channel. The discriminants match the wire encoding.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Protocol-owned channel that carries no weight in yield accrual.
    ProtocolNonInterest = 0,
    /// The singleton self-funded promoter channel.
    ProtocolPromotion = 1,
    /// Fee-funded channel open to any subscriber.
    InterestBearingOpen = 2,
    /// Fee-funded channel with mutual subscription.
    InterestBearingMutual = 3,
}

impl ChannelType {
    /// Whether the type is reserved for protocol-created channels.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::ProtocolNonInterest | Self::ProtocolPromotion)
    }

    /// Whether channels of this type take part in the channel fair-share group.
    pub fn accrues_yield(&self) -> bool {
        !matches!(self, Self::ProtocolNonInterest)
    }
}

impl TryFrom<u8> for ChannelType {
    type Error = ChannelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ProtocolNonInterest),
            1 => Ok(Self::ProtocolPromotion),
            2 => Ok(Self::InterestBearingOpen),
            3 => Ok(Self::InterestBearingMutual),
            other => Err(ChannelError::InvalidChannelType(other)),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(value: ChannelType) -> Self {
        value as u8
    }
}

/// A weighted member of a fair-share group: a channel in the global group,
/// or a subscriber inside one channel's group.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub identity: Identity,
    /// Fixed-point weight the participant was added to its accumulator with.
    pub weight: Weight,
    pub joined_at: Timestamp,
    /// `false` once the participant left; the registry slot is kept.
    pub active: bool,
    /// Size of a channel's subscriber group. Always 0 for subscribers.
    pub member_count: u64,
}

impl Participant {
    /// A newly joined, active participant with no members.
    pub fn new(identity: Identity, weight: Weight, joined_at: Timestamp) -> Self {
        Self {
            identity,
            weight,
            joined_at,
            active: true,
            member_count: 0,
        }
    }
}
