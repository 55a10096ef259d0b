//! Pool configuration.
//!
//! [`PoolConfig`] has sensible defaults and can be layered from a TOML file
//! and `FAIRSHARE_*` environment variables via [`PoolConfig::load`]. The
//! manager copies it at construction; it is immutable afterwards.
//!
//! Amounts are `u128`. In files and env vars they may be written as integers
//! or as decimal strings (for values beyond `u64`). Identities are hex
//! strings and should carry the `0x` prefix in env vars.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use fairshare_core::constants::{
    DEFAULT_MAX_CONTRIBUTION, DEFAULT_MIN_CONTRIBUTION, ENV_PREFIX, SCALE,
};
use fairshare_core::error::ConfigError;
use fairshare_core::types::{Amount, ChannelType, Identity};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Configuration for a channel pool.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    /// Fixed-point scale. A minimum contribution maps to this weight.
    #[serde(deserialize_with = "amount")]
    pub scale: u128,
    /// Smallest accepted channel contribution.
    #[serde(deserialize_with = "amount")]
    pub min_contribution: Amount,
    /// Largest accepted channel contribution.
    #[serde(deserialize_with = "amount")]
    pub max_contribution: Amount,
    /// Channel types users may create.
    pub allowed_channel_types: Vec<ChannelType>,
    /// Owner of the protocol channel created at pool construction.
    pub default_channel: Identity,
    /// Owner of the promoter channel.
    pub promoter: Identity,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            scale: SCALE,
            min_contribution: DEFAULT_MIN_CONTRIBUTION,
            max_contribution: DEFAULT_MAX_CONTRIBUTION,
            allowed_channel_types: vec![
                ChannelType::InterestBearingOpen,
                ChannelType::InterestBearingMutual,
            ],
            default_channel: Identity::from_label("fairshare/default"),
            promoter: Identity::from_label("fairshare/promoter"),
        }
    }
}

impl PoolConfig {
    /// Load defaults, then `path` (TOML) if given, then `FAIRSHARE_*` env vars.
    /// The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "loading pool config file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_channel_types"),
        );

        let cfg = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroScale`], [`ConfigError::ZeroMinimum`]
    /// - [`ConfigError::InvertedBounds`] if `min > max`
    /// - [`ConfigError::NoAllowedTypes`] if no channel type is user-creatable
    /// - [`ConfigError::ProtocolTypeAllowed`] if a protocol-only type is allowed
    /// - [`ConfigError::SharedProtocolIdentity`] if default and promoter coincide
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scale == 0 {
            return Err(ConfigError::ZeroScale);
        }
        if self.min_contribution == 0 {
            return Err(ConfigError::ZeroMinimum);
        }
        if self.min_contribution > self.max_contribution {
            return Err(ConfigError::InvertedBounds {
                min: self.min_contribution,
                max: self.max_contribution,
            });
        }
        if self.allowed_channel_types.is_empty() {
            return Err(ConfigError::NoAllowedTypes);
        }
        if let Some(t) = self.allowed_channel_types.iter().find(|t| t.is_protocol()) {
            return Err(ConfigError::ProtocolTypeAllowed((*t).into()));
        }
        if self.default_channel == self.promoter {
            return Err(ConfigError::SharedProtocolIdentity(self.promoter));
        }
        Ok(())
    }

    /// Whether users may create channels of `channel_type`.
    pub fn is_allowed(&self, channel_type: ChannelType) -> bool {
        self.allowed_channel_types.contains(&channel_type)
    }

    /// Whether `amount` lies within `[min_contribution, max_contribution]`.
    pub fn in_bounds(&self, amount: Amount) -> bool {
        (self.min_contribution..=self.max_contribution).contains(&amount)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Int(u64),
    Text(String),
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match RawAmount::deserialize(deserializer)? {
        RawAmount::Int(v) => Ok(u128::from(v)),
        RawAmount::Text(s) => s
            .trim()
            .replace('_', "")
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {s}"))),
    }
}
