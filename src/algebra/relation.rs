//! The central algebraic value: a filtered, aliased, joined view over one
//! or more tables.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::database::Database;

use super::alias_map::AliasMap;
use super::attribute::{Attribute, RelationName};
use super::expression::Expression;
use super::join::Join;
use super::projection::ProjectionSpec;
use super::renamer::Renamer;

/// Sort key for an ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderSpec {
    pub attribute: Attribute,
    pub descending: bool,
}

impl OrderSpec {
    pub fn ascending(attribute: Attribute) -> Self {
        OrderSpec {
            attribute,
            descending: false,
        }
    }

    pub fn descending(attribute: Attribute) -> Self {
        OrderSpec {
            attribute,
            descending: true,
        }
    }

    pub fn renamed(&self, renamer: &Renamer) -> OrderSpec {
        OrderSpec {
            attribute: renamer.attribute(&self.attribute),
            descending: self.descending,
        }
    }
}

/// An immutable relational-algebra value.
///
/// Two distinguished values exist: the empty relation (condition FALSE,
/// never yields rows) and the trivial relation (no tables, condition TRUE,
/// the identity for merging). All operators are pure and return new values.
#[derive(Debug, Clone)]
pub struct Relation {
    database: Option<Arc<Database>>,
    aliases: AliasMap,
    joins: BTreeSet<Join>,
    condition: Expression,
    projections: BTreeSet<ProjectionSpec>,
    unique: bool,
    order: Vec<OrderSpec>,
    limit: Option<u64>,
}

impl Relation {
    /// The relation that never yields rows.
    pub fn empty() -> Relation {
        Relation {
            database: None,
            aliases: AliasMap::empty(),
            joins: BTreeSet::new(),
            condition: Expression::False,
            projections: BTreeSet::new(),
            unique: true,
            order: Vec::new(),
            limit: None,
        }
    }

    /// The all-rows identity: no tables, no constraints.
    pub fn truth() -> Relation {
        Relation {
            database: None,
            aliases: AliasMap::empty(),
            joins: BTreeSet::new(),
            condition: Expression::True,
            projections: BTreeSet::new(),
            unique: true,
            order: Vec::new(),
            limit: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        database: Arc<Database>,
        aliases: AliasMap,
        joins: BTreeSet<Join>,
        condition: Expression,
        projections: BTreeSet<ProjectionSpec>,
        unique: bool,
        order: Vec<OrderSpec>,
        limit: Option<u64>,
    ) -> Relation {
        if condition.is_false() {
            return Relation::empty();
        }
        Relation {
            database: Some(database),
            aliases,
            joins,
            condition,
            projections,
            unique,
            order,
            limit,
        }
    }

    pub fn database(&self) -> Option<&Arc<Database>> {
        self.database.as_ref()
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn joins(&self) -> &BTreeSet<Join> {
        &self.joins
    }

    pub fn condition(&self) -> &Expression {
        &self.condition
    }

    pub fn projections(&self) -> &BTreeSet<ProjectionSpec> {
        &self.projections
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn order(&self) -> &[OrderSpec] {
        &self.order
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_false()
    }

    /// True when this is the no-table identity relation.
    pub fn is_trivial(&self) -> bool {
        self.condition.is_true() && self.tables().is_empty()
    }

    /// Every table referenced by joins, projections, condition (including
    /// references token-scanned out of raw SQL text), or order specs.
    pub fn tables(&self) -> BTreeSet<RelationName> {
        let mut tables = BTreeSet::new();
        for join in &self.joins {
            tables.insert(join.side1().clone());
            tables.insert(join.side2().clone());
        }
        for spec in &self.projections {
            for attr in spec.required_attributes() {
                tables.insert(attr.relation().clone());
            }
        }
        for attr in self.condition.attributes() {
            tables.insert(attr.relation().clone());
        }
        for o in &self.order {
            tables.insert(o.attribute.relation().clone());
        }
        tables
    }

    /// All attributes the generated SQL must be able to reference.
    pub fn required_attributes(&self) -> BTreeSet<Attribute> {
        let mut attrs = BTreeSet::new();
        for spec in &self.projections {
            attrs.extend(spec.required_attributes());
        }
        attrs.extend(self.condition.attributes());
        for join in &self.joins {
            attrs.extend(join.attributes().cloned());
        }
        for o in &self.order {
            attrs.insert(o.attribute.clone());
        }
        attrs
    }

    /// Conjoin a condition. FALSE collapses to the empty relation, TRUE is
    /// the identity.
    pub fn select(&self, expression: Expression) -> Relation {
        if expression.is_false() {
            return Relation::empty();
        }
        if expression.is_true() {
            return self.clone();
        }
        let mut out = self.clone();
        out.condition = self.condition.clone().and(expression);
        if out.condition.is_false() {
            return Relation::empty();
        }
        out
    }

    /// Apply a renamer to aliases, joins, condition, projections, and
    /// order specs. Renaming an attribute that does not occur is a no-op.
    pub fn rename_columns(&self, renamer: &Renamer) -> Relation {
        let aliases = match renamer {
            Renamer::Identity | Renamer::Columns(_) => self.aliases.clone(),
            Renamer::Prefix { .. } => {
                // Every referenced table becomes a fresh prefixed alias of
                // its physical original; prefixed names are unique per
                // table, so unchecked inserts cannot collide.
                let mut rebuilt = AliasMap::empty();
                for table in self.tables() {
                    let original = self.aliases.original_of(&table);
                    rebuilt.insert_unchecked(renamer.relation_name(&table), original);
                }
                rebuilt
            }
            Renamer::Aliases(declared) => {
                let mut merged = self.aliases.clone();
                for (alias, original) in declared.iter() {
                    merged.insert_unchecked(alias.clone(), original.clone());
                }
                merged
            }
        };
        let joins = self
            .joins
            .iter()
            .filter_map(|j| j.renamed(renamer))
            .collect();
        Relation {
            database: self.database.clone(),
            aliases,
            joins,
            condition: self.condition.renamed(renamer),
            projections: self.projections.iter().map(|p| p.renamed(renamer)).collect(),
            unique: self.unique,
            order: self.order.iter().map(|o| o.renamed(renamer)).collect(),
            limit: self.limit,
        }
    }

    /// Restrict the SELECT list.
    pub fn project(&self, specs: BTreeSet<ProjectionSpec>) -> Relation {
        let mut out = self.clone();
        out.projections = specs;
        out
    }

    pub fn with_limit(&self, limit: Option<u64>) -> Relation {
        let mut out = self.clone();
        // The smaller of an existing and a requested limit wins.
        out.limit = match (self.limit, limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        out
    }

    /// Copy with the condition replaced outright; used when several
    /// condition-variants of one relation merge into a single statement.
    pub fn with_condition(&self, condition: Expression) -> Relation {
        if condition.is_false() {
            return Relation::empty();
        }
        let mut out = self.clone();
        out.condition = condition;
        out
    }

    /// Copy without one join condition; used by join elimination before
    /// the surviving references are renamed onto the kept table.
    pub fn without_join(&self, join: &Join) -> Relation {
        let mut out = self.clone();
        out.joins = self.joins.iter().filter(|j| *j != join).cloned().collect();
        out
    }

    pub fn mutate(&self) -> MutableRelation {
        MutableRelation {
            relation: self.clone(),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Relation(EMPTY)");
        }
        write!(
            f,
            "Relation(tables=[{}], condition={}, unique={})",
            self.tables()
                .iter()
                .map(|t| t.qualified_name())
                .collect::<Vec<_>>()
                .join(", "),
            self.condition,
            self.unique
        )
    }
}

/// Builder-style wrapper threading multi-step rewrites without re-threading
/// return values at every step; `freeze` hands back the immutable value.
#[derive(Debug)]
pub struct MutableRelation {
    relation: Relation,
}

impl MutableRelation {
    pub fn new(relation: Relation) -> Self {
        MutableRelation { relation }
    }

    pub fn rename(&mut self, renamer: &Renamer) -> &mut Self {
        self.relation = self.relation.rename_columns(renamer);
        self
    }

    pub fn select(&mut self, expression: Expression) -> &mut Self {
        self.relation = self.relation.select(expression);
        self
    }

    pub fn project(&mut self, specs: BTreeSet<ProjectionSpec>) -> &mut Self {
        self.relation = self.relation.project(specs);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.relation = self.relation.with_limit(Some(limit));
        self
    }

    pub fn freeze(&self) -> Relation {
        self.relation.clone()
    }
}
