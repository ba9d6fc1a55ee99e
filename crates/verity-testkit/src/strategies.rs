//! Property test strategies for Verity types

use crate::fixtures::{at, committee_approval, direct_approval};
use proptest::prelude::*;
use serde_json::Value;
use verity_core::{CommitteeApproval, DirectApproval, Timestamp};

pub use proptest;

/// Arbitrary JSON shaped like a tag payload: mostly arrays of short strings
/// with blanks, duplicates and non-string noise mixed in
pub fn arb_tag_payload() -> impl Strategy<Value = Value> {
    let element = prop_oneof![
        4 => "[a-d]{1,3}".prop_map(Value::from),
        1 => Just(Value::from("")),
        1 => Just(Value::from("  ")),
        1 => Just(Value::Null),
        1 => any::<i64>().prop_map(Value::from),
        1 => any::<bool>().prop_map(Value::from),
    ];
    prop_oneof![
        8 => prop::collection::vec(element, 0..12).prop_map(Value::Array),
        1 => Just(Value::Null),
        1 => "[a-z]{0,8}".prop_map(Value::from),
        1 => any::<i64>().prop_map(Value::from),
    ]
}

/// Optional timestamp drawn from a small window so ties are common
pub fn arb_approval_time() -> impl Strategy<Value = Option<Timestamp>> {
    prop::option::weighted(0.8, (0i64..5).prop_map(at))
}

/// Direct approvals for one letter, approvers named `a0`, `a1`, ...
pub fn arb_direct_approvals() -> impl Strategy<Value = Vec<DirectApproval>> {
    prop::collection::vec(arb_approval_time(), 0..6).prop_map(|times| {
        times
            .into_iter()
            .enumerate()
            .map(|(i, time)| direct_approval("letter", &format!("a{i}"), time))
            .collect()
    })
}

/// Committee approvals for one letter, approvers named `c0`, `c1`, ...
pub fn arb_committee_approvals() -> impl Strategy<Value = Vec<CommitteeApproval>> {
    prop::collection::vec(arb_approval_time(), 0..6).prop_map(|times| {
        times
            .into_iter()
            .enumerate()
            .map(|(i, time)| committee_approval("letter", &format!("c{i}"), time))
            .collect()
    })
}
