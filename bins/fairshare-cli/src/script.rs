//! Simulation scripts.
//!
//! A script is a JSON document listing pool operations in order:
//!
//! ```json
//! {
//!   "genesis": 1,
//!   "operations": [
//!     { "op": "whitelist", "identity": "alice" },
//!     { "op": "create_channel", "owner": "alice", "contribution": 50,
//!       "channel_type": "interest_bearing_open", "meta": "hello", "at": 2 },
//!     { "op": "subscribe", "user": "bob", "channel": "alice", "at": 3 },
//!     { "op": "accrue", "amount": 120 }
//!   ]
//! }
//! ```
//!
//! Identities are `0x`-prefixed 40-digit hex strings, or any other string,
//! which is hashed into an identity.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fairshare_core::memory::{MemoryYieldSource, TracingEventSink, Whitelist};
use fairshare_core::types::{Amount, ChannelType, Identity, Timestamp};
use fairshare_pool::{ChannelManager, PoolConfig, PoolSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

fn default_genesis() -> Timestamp {
    1
}

#[derive(Deserialize, Debug)]
pub struct Script {
    #[serde(default = "default_genesis")]
    pub genesis: Timestamp,
    pub operations: Vec<Operation>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Whitelist {
        identity: String,
    },
    CreateChannel {
        owner: String,
        contribution: Amount,
        channel_type: ChannelType,
        #[serde(default)]
        meta: String,
        at: Timestamp,
    },
    CreatePromoter {
        at: Timestamp,
    },
    Subscribe {
        user: String,
        channel: String,
        at: Timestamp,
    },
    Unsubscribe {
        user: String,
        channel: String,
        at: Timestamp,
    },
    UpdateMeta {
        channel: String,
        #[serde(default)]
        meta: String,
        at: Timestamp,
    },
    Deactivate {
        channel: String,
        at: Timestamp,
    },
    /// Credit interest at the yield source.
    Accrue {
        amount: Amount,
    },
}

/// A step the pool refused.
#[derive(Serialize, Debug)]
pub struct Rejection {
    pub step: usize,
    pub error: String,
}

#[derive(Serialize, Debug)]
pub struct Report {
    pub snapshot: PoolSnapshot,
    pub rejected: Vec<Rejection>,
}

/// Resolve a script identity: hex if it parses as one, otherwise a label.
pub fn resolve_identity(raw: &str) -> Identity {
    raw.parse().unwrap_or_else(|_| Identity::from_label(raw))
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid simulation script")
    }

    /// Replay the script against in-memory collaborators.
    ///
    /// With `keep_going` a rejected step is logged and recorded; otherwise
    /// the first rejection aborts the run.
    pub fn run(&self, config: PoolConfig, keep_going: bool) -> Result<Report> {
        let source = Arc::new(MemoryYieldSource::new());
        let whitelist = Arc::new(Whitelist::new());
        let mut manager = ChannelManager::new(
            config,
            source.clone(),
            whitelist.clone(),
            Arc::new(TracingEventSink),
            self.genesis,
        )
        .context("failed to create pool")?;

        let mut rejected = Vec::new();
        for (step, op) in self.operations.iter().enumerate() {
            let result = match op {
                Operation::Whitelist { identity } => {
                    whitelist.add(resolve_identity(identity));
                    Ok(())
                }
                Operation::CreateChannel { owner, contribution, channel_type, meta, at } => manager
                    .create_channel(
                        resolve_identity(owner),
                        *contribution,
                        *channel_type,
                        meta.as_bytes().to_vec(),
                        *at,
                    )
                    .map(|_| ()),
                Operation::CreatePromoter { at } => manager.create_promoter_channel(*at).map(|_| ()),
                Operation::Subscribe { user, channel, at } => {
                    manager.subscribe(resolve_identity(user), resolve_identity(channel), *at)
                }
                Operation::Unsubscribe { user, channel, at } => {
                    manager.unsubscribe(resolve_identity(user), resolve_identity(channel), *at)
                }
                Operation::UpdateMeta { channel, meta, at } => {
                    let channel = resolve_identity(channel);
                    manager.update_channel_meta(channel, channel, meta.as_bytes().to_vec(), *at)
                }
                Operation::Deactivate { channel, at } => {
                    manager.deactivate_channel(resolve_identity(channel), *at)
                }
                Operation::Accrue { amount } => {
                    source.accrue(*amount);
                    Ok(())
                }
            };

            if let Err(err) = result {
                if !keep_going {
                    bail!("step {step} ({op:?}) rejected: {err}");
                }
                warn!(step, error = %err, "step rejected");
                rejected.push(Rejection { step, error: err.to_string() });
            }
        }

        info!(
            steps = self.operations.len(),
            rejected = rejected.len(),
            channels = manager.channels_count(),
            "simulation finished"
        );
        Ok(Report { snapshot: manager.snapshot(), rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "operations": [
            { "op": "whitelist", "identity": "alice" },
            { "op": "whitelist", "identity": "bob" },
            { "op": "create_channel", "owner": "alice", "contribution": 50,
              "channel_type": "interest_bearing_open", "meta": "a", "at": 2 },
            { "op": "create_channel", "owner": "bob", "contribution": 100,
              "channel_type": "interest_bearing_mutual", "at": 3 },
            { "op": "subscribe", "user": "carol", "channel": "alice", "at": 4 },
            { "op": "accrue", "amount": 30 }
        ]
    }"#;

    #[test]
    fn replays_scenario() {
        let script = Script::from_json(SCRIPT).unwrap();
        assert_eq!(script.genesis, 1);
        let report = script.run(PoolConfig::default(), false).unwrap();
        let snap = report.snapshot;
        assert_eq!(snap.channels.len(), 3);
        assert_eq!(snap.channel_group.count, 2);
        assert_eq!(snap.channel_group.normalized_weight, 15_000_000);
        assert_eq!(snap.pool_funds, 150);
        assert_eq!(snap.current_yield, Some(30));
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn first_rejection_aborts_by_default() {
        let script = Script::from_json(
            r#"{ "operations": [ { "op": "deactivate", "channel": "ghost", "at": 2 } ] }"#,
        )
        .unwrap();
        let err = script.run(PoolConfig::default(), false).unwrap_err();
        assert!(err.to_string().contains("step 0"));
    }

    #[test]
    fn keep_going_records_rejections() {
        let script = Script::from_json(
            r#"{ "operations": [
                { "op": "create_channel", "owner": "eve", "contribution": 50,
                  "channel_type": "interest_bearing_open", "at": 2 },
                { "op": "create_promoter", "at": 3 }
            ] }"#,
        )
        .unwrap();
        let report = script.run(PoolConfig::default(), true).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].step, 0);
        assert_eq!(report.snapshot.channel_group.count, 1);
    }

    #[test]
    fn identities_parse_as_hex_or_label() {
        let hex = format!("0x{}", "ab".repeat(20));
        assert_eq!(resolve_identity(&hex).as_bytes(), &[0xab; 20]);
        assert_eq!(resolve_identity("alice"), Identity::from_label("alice"));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        assert!(Script::from_json(r#"{ "operations": [ { "op": "mint" } ] }"#).is_err());
    }
}
