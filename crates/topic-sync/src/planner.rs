//! Reconciliation planning.
//!
//! Pure set arithmetic over one topic's allow-list snapshot: who must be
//! granted access, who must lose it. A leaving member is always revoked, even
//! when a stale roster still lists them.

use std::collections::BTreeSet;

use crate::identity::MemberId;

/// Access changes needed to make one topic's allow-list match the roster.
///
/// `to_add` and `to_remove` are always disjoint and never contain the system
/// account (which has no [`MemberId`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_add: BTreeSet<MemberId>,
    pub to_remove: BTreeSet<MemberId>,
}

impl ReconciliationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of grant and revoke calls the plan requires.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Compute the plan for one topic.
///
/// * `desired` - the roster of the reference entity.
/// * `current` - managed members currently on the topic's allow-list.
/// * `leaving` - a member who just left; removed everywhere, never added.
#[must_use]
pub fn plan(
    desired: &BTreeSet<MemberId>,
    current: &BTreeSet<MemberId>,
    leaving: Option<MemberId>,
) -> ReconciliationPlan {
    let mut to_add: BTreeSet<MemberId> = desired.difference(current).copied().collect();
    let mut to_remove: BTreeSet<MemberId> = current.difference(desired).copied().collect();

    if let Some(member) = leaving {
        to_add.remove(&member);
        to_remove.insert(member);
    }

    ReconciliationPlan { to_add, to_remove }
}
