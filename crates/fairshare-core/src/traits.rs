//! Collaborator interfaces for the Fairshare pool.
//!
//! These traits are the boundary between the accrual core and the outside
//! world:
//! - [`YieldSource`]: the external interest-bearing venue holding the pool's funds
//! - [`AccessControl`]: the channel-creation whitelist
//! - [`EventSink`]: the notification channel consumed by indexers
//!
//! In-memory implementations live in [`memory`](crate::memory).

use crate::error::YieldSourceError;
use crate::events::ChannelEvent;
use crate::types::{Amount, Identity};

/// External yield-bearing venue that holds the pool's principal.
///
/// The pool never retries a failed call; retry safety depends on the
/// venue's own idempotence, which the pool does not assume.
pub trait YieldSource: Send + Sync {
    /// Forward `amount` into the venue.
    fn deposit(&self, amount: Amount) -> Result<(), YieldSourceError>;

    /// Total balance the venue reports for the pool: principal plus accrued yield.
    fn balance(&self) -> Result<Amount, YieldSourceError>;
}

/// Whitelist consulted before a user creates a channel.
pub trait AccessControl: Send + Sync {
    /// Whether `identity` may create a channel.
    fn is_whitelisted(&self, identity: &Identity) -> bool;
}

/// Receiver of lifecycle notifications.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must not fail the triggering operation.
    fn emit(&self, event: ChannelEvent);

    /// Deliver events in order.
    ///
    /// Default implementation calls [`emit`](Self::emit) for each event.
    fn emit_all(&self, events: Vec<ChannelEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        balance: Amount,
    }

    impl YieldSource for FixedSource {
        fn deposit(&self, amount: Amount) -> Result<(), YieldSourceError> {
            if amount == 0 {
                return Err(YieldSourceError::Rejected("zero deposit".into()));
            }
            Ok(())
        }

        fn balance(&self) -> Result<Amount, YieldSourceError> {
            Ok(self.balance)
        }
    }

    struct Counter(AtomicUsize);

    impl EventSink for Counter {
        fn emit(&self, _event: ChannelEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct DenyAll;

    impl AccessControl for DenyAll {
        fn is_whitelisted(&self, _identity: &Identity) -> bool {
            false
        }
    }

    #[test]
    fn yield_source_is_object_safe() {
        let src = FixedSource { balance: 42 };
        let dyn_src: &dyn YieldSource = &src;
        assert_eq!(dyn_src.balance().unwrap(), 42);
        assert!(dyn_src.deposit(0).is_err());
        assert!(dyn_src.deposit(1).is_ok());
    }

    #[test]
    fn emit_all_default_forwards_each_event() {
        let sink = Counter(AtomicUsize::new(0));
        let id = Identity::from_label("x");
        sink.emit_all(vec![
            ChannelEvent::ChannelDeactivated { identity: id },
            ChannelEvent::ChannelUpdated { identity: id, meta: vec![] },
        ]);
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn access_control_is_object_safe() {
        let acl: &dyn AccessControl = &DenyAll;
        assert!(!acl.is_whitelisted(&Identity::ZERO));
    }
}
