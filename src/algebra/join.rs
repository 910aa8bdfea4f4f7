//! Multi-column equi-join conditions.

use std::fmt;

use super::attribute::{Attribute, RelationName};
use super::errors::AlgebraError;
use super::renamer::Renamer;

/// A non-empty set of column pairs linking exactly two tables.
///
/// Invariants, enforced at construction: every pair connects the same two
/// tables, and each column has exactly one partner on the other side.
/// Sides and pairs are stored in canonical order so structurally equal
/// joins compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Join {
    side1: RelationName,
    side2: RelationName,
    /// Sorted pairs `(side1 column, side2 column)`.
    pairs: Vec<(Attribute, Attribute)>,
}

impl Join {
    pub fn new(pairs: Vec<(Attribute, Attribute)>) -> Result<Self, AlgebraError> {
        let malformed = |reason: &str| AlgebraError::MalformedJoin {
            reason: reason.to_string(),
        };
        let first = pairs.first().ok_or_else(|| malformed("no column pairs"))?;

        let (a, b) = (first.0.relation().clone(), first.1.relation().clone());
        if a == b {
            return Err(malformed(&format!(
                "both sides reference the same table `{}`",
                a.qualified_name()
            )));
        }
        // Canonical side order.
        let (side1, side2) = if a <= b { (a, b) } else { (b, a) };

        let mut normalized = Vec::with_capacity(pairs.len());
        for (x, y) in &pairs {
            let pair = if *x.relation() == side1 && *y.relation() == side2 {
                (x.clone(), y.clone())
            } else if *x.relation() == side2 && *y.relation() == side1 {
                (y.clone(), x.clone())
            } else {
                return Err(malformed(&format!(
                    "pair {} = {} does not connect `{}` and `{}`",
                    x, y, side1, side2
                )));
            };
            normalized.push(pair);
        }
        normalized.sort();
        normalized.dedup();

        for (x, _) in &normalized {
            if normalized.iter().filter(|(a, _)| a == x).count() > 1 {
                return Err(malformed(&format!(
                    "column {} joins more than one partner",
                    x
                )));
            }
        }
        for (_, y) in &normalized {
            if normalized.iter().filter(|(_, b)| b == y).count() > 1 {
                return Err(malformed(&format!(
                    "column {} joins more than one partner",
                    y
                )));
            }
        }

        Ok(Join {
            side1,
            side2,
            pairs: normalized,
        })
    }

    pub fn side1(&self) -> &RelationName {
        &self.side1
    }

    pub fn side2(&self) -> &RelationName {
        &self.side2
    }

    pub fn pairs(&self) -> &[(Attribute, Attribute)] {
        &self.pairs
    }

    pub fn mentions(&self, table: &RelationName) -> bool {
        self.side1 == *table || self.side2 == *table
    }

    /// Columns of this join belonging to `table`.
    pub fn columns_of(&self, table: &RelationName) -> Vec<&Attribute> {
        if *table == self.side1 {
            self.pairs.iter().map(|(a, _)| a).collect()
        } else if *table == self.side2 {
            self.pairs.iter().map(|(_, b)| b).collect()
        } else {
            Vec::new()
        }
    }

    /// The unique partner of `attribute` on the other side, if it
    /// participates in this join.
    pub fn other_side(&self, attribute: &Attribute) -> Option<&Attribute> {
        for (a, b) in &self.pairs {
            if a == attribute {
                return Some(b);
            }
            if b == attribute {
                return Some(a);
            }
        }
        None
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.pairs.iter().flat_map(|(a, b)| [a, b])
    }

    /// Renaming may merge the two sides into one table, in which case the
    /// join condition degenerates and no join remains.
    pub fn renamed(&self, renamer: &Renamer) -> Option<Join> {
        let pairs: Vec<(Attribute, Attribute)> = self
            .pairs
            .iter()
            .map(|(a, b)| (renamer.attribute(a), renamer.attribute(b)))
            .collect();
        Join::new(pairs).ok()
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conds: Vec<String> = self
            .pairs
            .iter()
            .map(|(a, b)| format!("{} = {}", a, b))
            .collect();
        write!(f, "{}", conds.join(" AND "))
    }
}
