//! Adversarial property-based tests for the channel pool.
//!
//! Random operation sequences are replayed against a pool, including calls
//! that must fail: duplicate timestamps, clock regressions, unknown channels,
//! out-of-bounds contributions and venue-side deposit failures. After every
//! call the pool's bookkeeping is checked against its own snapshot.
//!
//! Invariants checked:
//! - a failed call changes nothing and emits nothing
//! - channel-group count and total weight match the active yield-bearing channels
//! - pool funds equal the sum of all contributions ever accepted
//! - every channel's member count matches its subscriber accumulator
//! - historical Z never decreases

use fairshare_core::constants::SCALE;
use fairshare_core::error::{AccrualError, ChannelError};
use fairshare_core::types::{ChannelType, Identity};
use fairshare_pool::PoolSnapshot;
use fairshare_tests::helpers::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const OWNERS: usize = 6;
const USERS: usize = 10;

fn owner(i: usize) -> Identity {
    id(&format!("owner-{}", i % OWNERS))
}

fn user(i: usize) -> Identity {
    id(&format!("user-{}", i % USERS))
}

#[derive(Clone, Debug)]
enum Op {
    Create { owner: usize, units: u128, mutual: bool },
    CreateOutOfBounds { owner: usize, over: bool },
    Promoter,
    Subscribe { user: usize, owner: usize },
    Unsubscribe { user: usize, owner: usize },
    UpdateMeta { caller: usize, owner: usize },
    Deactivate { owner: usize },
    FailNextDeposit,
    Accrue(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 1u128..=40, any::<bool>())
            .prop_map(|(owner, units, mutual)| Op::Create { owner, units, mutual }),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(owner, over)| Op::CreateOutOfBounds { owner, over }),
        1 => Just(Op::Promoter),
        5 => (any::<usize>(), any::<usize>()).prop_map(|(user, owner)| Op::Subscribe { user, owner }),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(user, owner)| Op::Unsubscribe { user, owner }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(caller, owner)| Op::UpdateMeta { caller, owner }),
        2 => any::<usize>().prop_map(|owner| Op::Deactivate { owner }),
        1 => Just(Op::FailNextDeposit),
        1 => (1u64..=1_000).prop_map(Op::Accrue),
    ]
}

fn pool_with_owners() -> TestPool {
    let pool = TestPool::new();
    // One owner is never whitelisted.
    for i in 0..OWNERS - 1 {
        pool.whitelist.add(owner(i));
    }
    pool
}

fn apply(pool: &mut TestPool, op: &Op, now: u64) -> Result<(), ChannelError> {
    let min = pool.manager.config().min_contribution;
    let max = pool.manager.config().max_contribution;
    let m = &mut pool.manager;
    match *op {
        Op::Create { owner: o, units, mutual } => {
            let channel_type = if mutual {
                ChannelType::InterestBearingMutual
            } else {
                ChannelType::InterestBearingOpen
            };
            m.create_channel(owner(o), units * min, channel_type, vec![], now).map(|_| ())
        }
        Op::CreateOutOfBounds { owner: o, over } => {
            let amount = if over { max + 1 } else { min - 1 };
            m.create_channel(owner(o), amount, ChannelType::InterestBearingOpen, vec![], now)
                .map(|_| ())
        }
        Op::Promoter => m.create_promoter_channel(now).map(|_| ()),
        Op::Subscribe { user: u, owner: o } => m.subscribe(user(u), owner(o), now),
        Op::Unsubscribe { user: u, owner: o } => m.unsubscribe(user(u), owner(o), now),
        Op::UpdateMeta { caller, owner: o } => {
            m.update_channel_meta(owner(caller), owner(o), b"meta".to_vec(), now)
        }
        Op::Deactivate { owner: o } => m.deactivate_channel(owner(o), now),
        Op::FailNextDeposit => {
            pool.source.fail_next_deposit("adversarial");
            Ok(())
        }
        Op::Accrue(amount) => {
            pool.source.accrue(u128::from(amount));
            Ok(())
        }
    }
}

fn check_bookkeeping(pool: &TestPool, snap: &PoolSnapshot) -> Result<(), TestCaseError> {
    let active_weighted: Vec<_> = snap
        .channels
        .iter()
        .filter(|c| !c.deactivated && c.channel_type.accrues_yield())
        .collect();
    prop_assert_eq!(snap.channel_group.count, active_weighted.len() as u64);
    let total: u128 = active_weighted.iter().map(|c| c.weight).sum();
    prop_assert_eq!(snap.channel_group.total_weight, total);

    let contributed: u128 = snap.channels.iter().map(|c| c.pool_contribution).sum();
    prop_assert_eq!(snap.pool_funds, contributed);
    prop_assert_eq!(pool.manager.pool_funds(), contributed);

    for channel in &snap.channels {
        prop_assert_eq!(channel.member_count, channel.fair_share_count);
        prop_assert!(channel.member_count >= 1 || channel.deactivated);
        let group = pool.manager.subscriber_group(&channel.owner);
        prop_assert!(group.is_some());
        if !channel.deactivated {
            prop_assert!(pool.manager.member_exists(&channel.owner, &channel.owner));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Random lifecycles
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Random operation streams keep every bookkeeping invariant, and every
    /// rejected call leaves the pool exactly as it was.
    #[test]
    fn random_lifecycles_preserve_invariants(
        ops in prop::collection::vec(op_strategy(), 1..120),
        gaps in prop::collection::vec(0u64..=2, 120),
    ) {
        let mut pool = pool_with_owners();
        let mut now = GENESIS;
        let mut prev_z = 0u128;

        for (op, gap) in ops.iter().zip(gaps) {
            now += gap;
            let before = pool.manager.snapshot();
            let events_before = pool.events.len();

            match apply(&mut pool, op, now) {
                Ok(()) => {}
                Err(err) => {
                    prop_assert_eq!(&pool.manager.snapshot(), &before, "state changed on {:?}", err);
                    prop_assert_eq!(pool.events.len(), events_before);
                }
            }

            let snap = pool.manager.snapshot();
            check_bookkeeping(&pool, &snap)?;
            prop_assert!(snap.channel_group.historical_z >= prev_z);
            prev_z = snap.channel_group.historical_z;
        }
    }

    /// A contribution of `k * min` always yields weight `k * scale`.
    #[test]
    fn weight_is_linear_in_contribution(k in 1u128..=250_000) {
        let mut pool = TestPool::new();
        let min = pool.manager.config().min_contribution;
        let alice = pool.open("alice", k * min);
        prop_assert_eq!(pool.manager.channel(&alice).unwrap().weight, k * SCALE);
    }

    /// Contributions outside the bounds never reach the yield source.
    #[test]
    fn out_of_bounds_never_deposits(amount in prop_oneof![0u128..50, 12_500_001u128..=u128::from(u64::MAX)]) {
        let mut pool = TestPool::new();
        let alice = id("alice");
        pool.whitelist.add(alice);
        let now = pool.tick();
        let result = pool
            .manager
            .create_channel(alice, amount, ChannelType::InterestBearingOpen, vec![], now);
        let out_of_bounds = matches!(result, Err(ChannelError::ContributionOutOfBounds { .. }));
        prop_assert!(out_of_bounds);
        prop_assert_eq!(pool.source.deposit_count(), 0);
        prop_assert_eq!(pool.manager.pool_funds(), 0);
    }

    /// Two subscriptions to the same channel at the same instant: the second
    /// is rejected as a duplicate update and leaves the channel unchanged.
    #[test]
    fn duplicate_instant_subscription_rejected(a in 0usize..USERS, b in 0usize..USERS) {
        prop_assume!(a != b);
        let mut pool = TestPool::new();
        let alice = pool.open("alice", 50);
        let now = pool.tick();
        pool.manager.subscribe(user(a), alice, now).unwrap();
        let before = pool.manager.channel(&alice).unwrap();

        let result = pool.manager.subscribe(user(b), alice, now);
        prop_assert_eq!(
            result,
            Err(ChannelError::Accrual(AccrualError::StaleOrDuplicateUpdate { now, last_update: now }))
        );
        prop_assert_eq!(pool.manager.channel(&alice).unwrap(), before);
        prop_assert!(!pool.manager.member_exists(&user(b), &alice));
    }

    /// Calls dated before the pool clock are rejected before anything else.
    #[test]
    fn clock_regression_rejected(back in 1u64..=5) {
        let mut pool = TestPool::new();
        for _ in 0..5 {
            pool.tick();
        }
        let alice = pool.open("alice", 50);
        let now = pool.now();
        let stale = now - back;
        prop_assert_eq!(
            pool.manager.subscribe(id("carol"), alice, stale),
            Err(ChannelError::ClockRegression { now: stale, last: now })
        );
        prop_assert_eq!(
            pool.manager.deactivate_channel(alice, stale),
            Err(ChannelError::ClockRegression { now: stale, last: now })
        );
    }
}

// ---------------------------------------------------------------------------
// Targeted attacks
// ---------------------------------------------------------------------------

#[test]
fn unwhitelisted_owner_cannot_open_channel() {
    let mut pool = pool_with_owners();
    let outsider = owner(OWNERS - 1);
    let now = pool.tick();
    assert_eq!(
        pool.manager
            .create_channel(outsider, 50, ChannelType::InterestBearingOpen, vec![], now),
        Err(ChannelError::NotWhitelisted(outsider))
    );
}

#[test]
fn protocol_types_cannot_be_user_created() {
    let mut pool = TestPool::new();
    let alice = id("alice");
    pool.whitelist.add(alice);
    for channel_type in [ChannelType::ProtocolNonInterest, ChannelType::ProtocolPromotion] {
        let now = pool.tick();
        assert_eq!(
            pool.manager.create_channel(alice, 50, channel_type, vec![], now),
            Err(ChannelError::InvalidChannelType(channel_type.into()))
        );
    }
    assert_eq!(pool.manager.channels_count(), 1);
}

#[test]
fn deposit_failure_mid_stream_is_atomic() {
    let mut pool = TestPool::new();
    pool.open("alice", 50);
    let before = pool.manager.snapshot();
    let events_before = pool.events.len();

    let bob = id("bob");
    pool.whitelist.add(bob);
    pool.source.fail_next_deposit("paused");
    let now = pool.tick();
    assert!(matches!(
        pool.manager
            .create_channel(bob, 100, ChannelType::InterestBearingOpen, vec![], now),
        Err(ChannelError::Ledger(_))
    ));
    assert_eq!(pool.manager.snapshot(), before);
    assert_eq!(pool.events.len(), events_before);

    // Retry at the same instant succeeds: nothing was staged.
    pool.manager
        .create_channel(bob, 100, ChannelType::InterestBearingOpen, vec![], now)
        .unwrap();
    assert_eq!(pool.manager.pool_funds(), 150);
}
