//! Join elimination.
//!
//! A join `T1.c1 = T2.c1 AND T1.c2 = T2.c2 ...` can be dropped, rewriting
//! every reference to `T2.cn` onto `T1.cn`, when
//!
//! 1. no join other than this one mentions `T2`, and
//! 2. every column of `T2` that is selected, filtered, ordered, or used by
//!    any retained expression already appears on `T2`'s side of the join
//!    condition.
//!
//! KNOWN LIMITATION: a third precondition is required for soundness — the
//! join must follow a foreign-key constraint from the kept side to the
//! dropped side, so that every kept-side value is guaranteed a partner
//! row. The database boundary exposes no foreign-key metadata, so this is
//! NOT enforced: on a mapping whose join does not follow such a
//! constraint, elimination can add rows that the unoptimized query would
//! have filtered out. Carried forward deliberately from the source
//! design; see DESIGN.md. Pinned by
//! `eliminates_without_foreign_key_evidence` below.

use std::collections::{BTreeMap, BTreeSet};

use crate::algebra::{Attribute, Join, RelationName, Renamer};
use crate::mapping::TripleRelation;

use super::Transformed;

#[derive(Debug, Default)]
pub struct JoinEliminationPass;

impl JoinEliminationPass {
    pub fn new() -> Self {
        JoinEliminationPass
    }

    /// Repeatedly drop removable joins until none remains.
    pub fn optimize(&self, bridge: &TripleRelation) -> Transformed<TripleRelation> {
        let mut current = bridge.clone();
        let mut changed = false;
        while let Some(next) = eliminate_one(&current) {
            current = next;
            changed = true;
        }
        if changed {
            Transformed::Yes(current)
        } else {
            Transformed::No(current)
        }
    }
}

/// All columns the bridge still needs: maker inputs, projections,
/// condition references, order keys. Computed once per round; each join's
/// two sides are then tested independently against it.
fn required_attributes(bridge: &TripleRelation) -> BTreeSet<Attribute> {
    let mut required: BTreeSet<Attribute> = BTreeSet::new();
    required.extend(bridge.subject().required_attributes());
    required.extend(bridge.predicate().required_attributes());
    required.extend(bridge.object().required_attributes());
    for spec in bridge.base().projections() {
        required.extend(spec.required_attributes());
    }
    required.extend(bridge.base().condition().attributes());
    for order in bridge.base().order() {
        required.insert(order.attribute.clone());
    }
    required
}

fn eliminate_one(bridge: &TripleRelation) -> Option<TripleRelation> {
    let relation = bridge.base();
    let required = required_attributes(bridge);

    for join in relation.joins() {
        for dropped in [join.side1().clone(), join.side2().clone()] {
            if !removable(relation.joins(), join, &dropped, &required) {
                continue;
            }
            let rename = redirect_map(join, &dropped);
            log::debug!(
                "join elimination: dropping {} via {}",
                dropped.qualified_name(),
                join
            );
            let renamer = Renamer::Columns(rename);
            let slimmed = relation.without_join(join).rename_columns(&renamer);
            return Some(TripleRelation::new(
                slimmed,
                bridge.subject().renamed(&renamer),
                bridge.predicate().renamed(&renamer),
                bridge.object().renamed(&renamer),
            ));
        }
    }
    None
}

fn removable(
    joins: &BTreeSet<Join>,
    candidate: &Join,
    dropped: &RelationName,
    required: &BTreeSet<Attribute>,
) -> bool {
    // (1) no other join may mention the dropped table
    if joins
        .iter()
        .any(|j| j != candidate && j.mentions(dropped))
    {
        return false;
    }
    // (2) every required column of the dropped table must have a partner
    // through this join's condition
    let join_columns: BTreeSet<&Attribute> = candidate.columns_of(dropped).into_iter().collect();
    required
        .iter()
        .filter(|attr| attr.relation() == dropped)
        .all(|attr| join_columns.contains(attr))
}

fn redirect_map(join: &Join, dropped: &RelationName) -> BTreeMap<Attribute, Attribute> {
    let mut map = BTreeMap::new();
    for attr in join.columns_of(dropped) {
        if let Some(partner) = join.other_side(attr) {
            map.insert(attr.clone(), partner.clone());
        }
    }
    map
}
