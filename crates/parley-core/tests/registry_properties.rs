//! Property-based tests for the channel registry and echo suppressor.

use std::{collections::BTreeSet, time::Duration};

use parley_core::{Channel, ChannelId, ChannelRegistry, ECHO_TTL, EchoSuppressor};
use proptest::prelude::*;

fn channel_id() -> impl Strategy<Value = ChannelId> {
    prop_oneof![(0i64..6).prop_map(ChannelId::Room), (0i64..6).prop_map(ChannelId::Direct)]
}

fn channel(id: ChannelId) -> Channel {
    match id {
        ChannelId::Room(room) => Channel::room(room, format!("room {room}")),
        ChannelId::Direct(peer) => Channel::direct(peer, format!("user{peer}"), true),
    }
}

#[derive(Debug, Clone)]
enum Op {
    Refresh(Vec<ChannelId>),
    Increment(ChannelId),
    MarkRead(ChannelId),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => prop::collection::vec(channel_id(), 0..8).prop_map(Op::Refresh),
        4 => channel_id().prop_map(Op::Increment),
        2 => channel_id().prop_map(Op::MarkRead),
    ]
}

proptest! {
    /// After any refresh, counters exist for exactly the refreshed set and
    /// surviving counters keep their value.
    #[test]
    fn prop_refresh_counters_follow_channels(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut registry = ChannelRegistry::new();

        for op in ops {
            match op {
                Op::Refresh(ids) => {
                    let before: Vec<(ChannelId, u32)> = registry.counted().collect();
                    let known = registry.refresh(ids.iter().copied().map(channel).collect());

                    let expected: BTreeSet<ChannelId> = ids.into_iter().collect();
                    prop_assert_eq!(&known, &expected);
                    let counted: BTreeSet<ChannelId> = registry.counted().map(|(id, _)| id).collect();
                    prop_assert_eq!(&counted, &expected);

                    for (id, count) in before {
                        if expected.contains(&id) {
                            prop_assert_eq!(registry.unread(id), count);
                        }
                    }
                },
                Op::Increment(id) => {
                    if registry.contains(id) {
                        let before = registry.unread(id);
                        prop_assert_eq!(registry.increment(id), before + 1);
                    }
                },
                Op::MarkRead(id) => {
                    registry.mark_read(id);
                    prop_assert_eq!(registry.unread(id), 0);
                },
            }
        }
    }

    /// A remembered send is consumed once within the TTL and never after.
    #[test]
    fn prop_echo_consumed_at_most_once(
        content in "[a-z ]{0,12}",
        delay_ms in 0u64..30_000,
        id in channel_id(),
    ) {
        let mut echoes = EchoSuppressor::new(ECHO_TTL);
        echoes.remember(id, &content, Duration::ZERO);

        let at = Duration::from_millis(delay_ms);
        let first = echoes.consume(id, &content, at);
        prop_assert_eq!(first, at <= ECHO_TTL);
        prop_assert!(!echoes.consume(id, &content, at));
    }
}
