//! `proptest` strategies generating arbitrary sequences of mutation
//! operations, used to drive the WAL-replay-equals-direct-apply
//! property.

use crate::wal::{WalOp, WalRecord};
use proptest::prelude::*;

/// A generated operation, not yet assigned a sequence number (the
/// caller assigns `seq` in order as it feeds these through a real
/// [`crate::wal::WalWriter`]).
#[derive(Debug, Clone)]
pub struct ArbitraryOp {
    /// The operation kind.
    pub op: WalOp,
    /// Target issue id, drawn from a small fixed pool so ops frequently
    /// collide on the same issue.
    pub id: String,
    /// Operation timestamp, monotonically non-decreasing across a
    /// generated sequence by construction of the caller.
    pub ts: i64,
}

fn wal_op_strategy() -> impl Strategy<Value = WalOp> {
    prop_oneof![
        Just(WalOp::Add),
        Just(WalOp::Update),
        Just(WalOp::Close),
        Just(WalOp::Reopen),
        Just(WalOp::Delete),
        Just(WalOp::SetBlocked),
        Just(WalOp::UnsetBlocked),
        Just(WalOp::LabelAdded),
        Just(WalOp::LabelRemoved),
        Just(WalOp::CommentAdded),
    ]
}

fn issue_id_pool_strategy() -> impl Strategy<Value = String> {
    (0u32..8).prop_map(|n| format!("bd-{n:03}"))
}

/// A single arbitrary operation.
pub fn arbitrary_op() -> impl Strategy<Value = ArbitraryOp> {
    (wal_op_strategy(), issue_id_pool_strategy(), 0i64..1_000_000).prop_map(|(op, id, ts)| {
        ArbitraryOp { op, id, ts }
    })
}

/// A sequence of 0..=`max_len` arbitrary operations.
pub fn arbitrary_op_sequence(max_len: usize) -> impl Strategy<Value = Vec<ArbitraryOp>> {
    prop::collection::vec(arbitrary_op(), 0..=max_len)
}

/// Turn a generated `ArbitraryOp` sequence into [`WalRecord`]s with
/// monotonically assigned `seq` numbers, the way a real `WalWriter`
/// would. `Add`/`Update` records carry a minimal issue payload so
/// downstream consumers (snapshot codec, reference model) can decode
/// them.
pub fn to_wal_records(ops: &[ArbitraryOp]) -> Vec<WalRecord> {
    ops.iter()
        .enumerate()
        .map(|(i, op)| WalRecord {
            op: op.op,
            ts: op.ts,
            seq: i as u64 + 1,
            id: op.id.clone(),
            data: matches!(op.op, WalOp::Add | WalOp::Update).then(|| {
                serde_json::json!({
                    "id": op.id,
                    "title": "generated",
                    "issue_type": "task",
                    "status": "open",
                    "priority": 2,
                    "created_at": op.ts,
                    "updated_at": op.ts,
                })
            }),
        })
        .collect()
}
