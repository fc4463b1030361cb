//! Reference kinds and the fixed policy table the resolver and the store both read.

use serde::Serialize;

/// The typed edge tables an artifact can own, excluding navigation choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Children,
    Answers,
    TestCases,
    ProgrammingResources,
}

/// How the targets of a reference kind are sequenced on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrdering {
    /// Ascending by the persisted `order` column; ties keep store order.
    Ordered,
    /// Store order (edge row id).
    StoreOrder,
}

/// Fetch and ordering policy for one reference kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePolicy {
    pub kind: ReferenceKind,
    /// Join table holding the edges.
    pub table: &'static str,
    /// Column in `table` pointing at the target artifact.
    pub target_column: &'static str,
    /// Field name on the serialized artifact.
    pub field: &'static str,
    pub ordering: EdgeOrdering,
}

pub const REFERENCE_POLICIES: [ReferencePolicy; 4] = [
    ReferencePolicy {
        kind: ReferenceKind::Children,
        table: "artifact_orders",
        target_column: "child_id",
        field: "artifacts",
        ordering: EdgeOrdering::Ordered,
    },
    ReferencePolicy {
        kind: ReferenceKind::Answers,
        table: "artifact_answers",
        target_column: "answer_id",
        field: "answers",
        ordering: EdgeOrdering::StoreOrder,
    },
    ReferencePolicy {
        kind: ReferenceKind::TestCases,
        table: "artifact_test_cases",
        target_column: "test_case_id",
        field: "test_cases",
        ordering: EdgeOrdering::StoreOrder,
    },
    ReferencePolicy {
        kind: ReferenceKind::ProgrammingResources,
        table: "artifact_programming_resources",
        target_column: "resource_id",
        field: "programming_resources",
        ordering: EdgeOrdering::StoreOrder,
    },
];

impl ReferenceKind {
    pub fn policy(self) -> &'static ReferencePolicy {
        match self {
            ReferenceKind::Children => &REFERENCE_POLICIES[0],
            ReferenceKind::Answers => &REFERENCE_POLICIES[1],
            ReferenceKind::TestCases => &REFERENCE_POLICIES[2],
            ReferenceKind::ProgrammingResources => &REFERENCE_POLICIES[3],
        }
    }
}
