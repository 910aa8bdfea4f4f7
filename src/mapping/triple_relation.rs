//! Compiled mapping bridges.

use std::collections::BTreeSet;
use std::fmt;

use oxrdf::Term;

use crate::algebra::{Expression, ProjectionSpec, Relation, Renamer};
use crate::node_mapper::NodeMaker;

/// The three slots of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
}

impl TriplePosition {
    pub const ALL: [TriplePosition; 3] = [
        TriplePosition::Subject,
        TriplePosition::Predicate,
        TriplePosition::Object,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TriplePosition::Subject => "subject",
            TriplePosition::Predicate => "predicate",
            TriplePosition::Object => "object",
        }
    }
}

impl fmt::Display for TriplePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One compiled mapping bridge: a base [`Relation`] plus exactly three
/// named node makers, one per triple slot. Immutable once built; query
/// compilation renames copies instead of mutating.
#[derive(Debug, Clone)]
pub struct TripleRelation {
    base: Relation,
    subject: NodeMaker,
    predicate: NodeMaker,
    object: NodeMaker,
}

impl TripleRelation {
    pub fn new(
        base: Relation,
        subject: NodeMaker,
        predicate: NodeMaker,
        object: NodeMaker,
    ) -> Self {
        TripleRelation {
            base,
            subject,
            predicate,
            object,
        }
    }

    pub fn base(&self) -> &Relation {
        &self.base
    }

    pub fn subject(&self) -> &NodeMaker {
        &self.subject
    }

    pub fn predicate(&self) -> &NodeMaker {
        &self.predicate
    }

    pub fn object(&self) -> &NodeMaker {
        &self.object
    }

    pub fn maker(&self, position: TriplePosition) -> &NodeMaker {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }

    /// Feasibility of one slot against an optional concrete term; unbound
    /// slots fit anything.
    pub fn could_fit(&self, position: TriplePosition, term: Option<&Term>) -> bool {
        match term {
            None => true,
            Some(t) => self.maker(position).could_fit(t),
        }
    }

    /// Bind one slot to a concrete term: the forced column values become
    /// selection conditions. `None` when the term cannot originate from
    /// this bridge — the candidate is pruned before any SQL.
    pub fn select_term(&self, position: TriplePosition, term: &Term) -> Option<TripleRelation> {
        let forced = self.maker(position).column_values(term)?;
        let condition = Expression::conjunction(
            forced
                .into_iter()
                .map(|(attribute, value)| Expression::attribute_value(attribute, value))
                .collect(),
        );
        Some(TripleRelation {
            base: self.base.select(condition),
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        })
    }

    /// Every column any of the three makers reads.
    pub fn projections(&self) -> BTreeSet<ProjectionSpec> {
        let mut out = BTreeSet::new();
        out.extend(self.subject.projections());
        out.extend(self.predicate.projections());
        out.extend(self.object.projections());
        out
    }

    /// Restrict the base relation's SELECT list to what the makers need.
    pub fn project_to_makers(&self) -> TripleRelation {
        TripleRelation {
            base: self.base.project(self.projections()),
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        }
    }

    pub fn renamed(&self, renamer: &Renamer) -> TripleRelation {
        TripleRelation {
            base: self.base.rename_columns(renamer),
            subject: self.subject.renamed(renamer),
            predicate: self.predicate.renamed(renamer),
            object: self.object.renamed(renamer),
        }
    }

    /// Rename with the per-pattern table prefix that keeps table
    /// references of distinct triple patterns independent.
    pub fn with_prefix(&self, index: usize) -> TripleRelation {
        self.renamed(&Renamer::prefix(index))
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}
