//! The declarative mapping: bridges grouped by backing database.
//!
//! This crate consumes an already-parsed mapping — mapping-file syntax is
//! an external collaborator's concern. [`BridgeBuilder`] is the
//! programmatic surface those collaborators (and tests) assemble bridges
//! with.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::algebra::{
    AliasMap, Attribute, Expression, Join, OrderSpec, Relation, RelationName,
};
use crate::database::Database;
use crate::node_mapper::NodeMaker;

pub mod errors;
pub mod triple_relation;

pub use errors::MappingError;
pub use triple_relation::{TriplePosition, TripleRelation};

/// An already-parsed set of bridges. Bridges against distinct databases
/// coexist; the compiler joins only within one database.
#[derive(Debug, Clone, Default)]
pub struct GraphMapping {
    bridges: Vec<Arc<TripleRelation>>,
}

impl GraphMapping {
    pub fn new(bridges: Vec<TripleRelation>) -> Self {
        GraphMapping {
            bridges: bridges.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn bridges(&self) -> &[Arc<TripleRelation>] {
        &self.bridges
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    /// The distinct databases backing this mapping, by connection
    /// identity.
    pub fn databases(&self) -> Vec<Arc<Database>> {
        let mut out: Vec<Arc<Database>> = Vec::new();
        for bridge in &self.bridges {
            if let Some(db) = bridge.base().database() {
                if !out.iter().any(|seen| seen.same_as(db)) {
                    out.push(Arc::clone(db));
                }
            }
        }
        out
    }
}

/// Builder for one bridge. Compile-time mapping errors (missing makers,
/// malformed joins, duplicate aliases) surface here, eagerly.
#[derive(Debug)]
pub struct BridgeBuilder {
    database: Arc<Database>,
    aliases: AliasMap,
    joins: BTreeSet<Join>,
    condition: Expression,
    subject: Option<NodeMaker>,
    predicate: Option<NodeMaker>,
    object: Option<NodeMaker>,
    unique: Option<bool>,
    order: Vec<OrderSpec>,
    limit: Option<u64>,
}

impl BridgeBuilder {
    pub fn new(database: Arc<Database>) -> Self {
        BridgeBuilder {
            database,
            aliases: AliasMap::empty(),
            joins: BTreeSet::new(),
            condition: Expression::True,
            subject: None,
            predicate: None,
            object: None,
            unique: None,
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn alias(
        mut self,
        alias: RelationName,
        original: RelationName,
    ) -> Result<Self, MappingError> {
        self.aliases = self.aliases.with_declared_alias(alias, original)?;
        Ok(self)
    }

    pub fn join(mut self, pairs: Vec<(Attribute, Attribute)>) -> Result<Self, MappingError> {
        self.joins.insert(Join::new(pairs)?);
        Ok(self)
    }

    pub fn condition(mut self, expression: Expression) -> Self {
        self.condition = self.condition.and(expression);
        self
    }

    pub fn subject(mut self, maker: NodeMaker) -> Self {
        self.subject = Some(maker);
        self
    }

    pub fn predicate(mut self, maker: NodeMaker) -> Self {
        self.predicate = Some(maker);
        self
    }

    pub fn object(mut self, maker: NodeMaker) -> Self {
        self.object = Some(maker);
        self
    }

    /// Override the duplicate-rows flag; by default rows are assumed
    /// duplicate-free exactly when every maker is unique.
    pub fn contains_duplicates(mut self, contains_duplicates: bool) -> Self {
        self.unique = Some(!contains_duplicates);
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order.push(spec);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<TripleRelation, MappingError> {
        let subject = self.subject.ok_or(MappingError::MissingNodeMaker {
            position: "subject",
        })?;
        let predicate = self.predicate.ok_or(MappingError::MissingNodeMaker {
            position: "predicate",
        })?;
        let object = self.object.ok_or(MappingError::MissingNodeMaker {
            position: "object",
        })?;

        let unique = self
            .unique
            .unwrap_or_else(|| {
                subject.is_unique() && predicate.is_unique() && object.is_unique()
            });

        let mut projections = BTreeSet::new();
        projections.extend(subject.projections());
        projections.extend(predicate.projections());
        projections.extend(object.projections());

        let base = Relation::new(
            self.database,
            self.aliases,
            self.joins,
            self.condition,
            projections,
            unique,
            self.order,
            self.limit,
        );
        Ok(TripleRelation::new(base, subject, predicate, object))
    }
}
