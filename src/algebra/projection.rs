//! SELECT-list entries.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::attribute::Attribute;
use super::expression::Expression;
use super::renamer::Renamer;

/// One entry of a SELECT list: a bare column, or a computed expression
/// under a stable generated alias.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProjectionSpec {
    Attr(Attribute),
    Expr(ExprProjection),
}

impl ProjectionSpec {
    pub fn attribute(attribute: Attribute) -> ProjectionSpec {
        ProjectionSpec::Attr(attribute)
    }

    pub fn expression(expression: Expression) -> ProjectionSpec {
        ProjectionSpec::Expr(ExprProjection::new(expression))
    }

    /// The column label under which this entry appears in result rows.
    pub fn label(&self) -> String {
        match self {
            ProjectionSpec::Attr(a) => a.qualified_name(),
            ProjectionSpec::Expr(e) => e.alias().to_string(),
        }
    }

    pub fn required_attributes(&self) -> BTreeSet<Attribute> {
        match self {
            ProjectionSpec::Attr(a) => {
                let mut s = BTreeSet::new();
                s.insert(a.clone());
                s
            }
            ProjectionSpec::Expr(e) => e.expression().attributes(),
        }
    }

    pub fn renamed(&self, renamer: &Renamer) -> ProjectionSpec {
        match self {
            ProjectionSpec::Attr(a) => ProjectionSpec::Attr(renamer.attribute(a)),
            ProjectionSpec::Expr(e) => {
                ProjectionSpec::Expr(ExprProjection::with_alias(
                    e.expression().renamed(renamer),
                    e.alias().to_string(),
                ))
            }
        }
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A computed SELECT entry. The alias is generated from the expression
/// text, so the same expression always lands under the same label and
/// equal-aliased duplicates deduplicate in the projection set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprProjection {
    expression: Expression,
    alias: String,
}

impl ExprProjection {
    pub fn new(expression: Expression) -> Self {
        let mut hasher = DefaultHasher::new();
        expression.hash(&mut hasher);
        let alias = format!("expr_{:08x}", hasher.finish() as u32);
        ExprProjection { expression, alias }
    }

    /// Keeps an existing alias through renaming, so decoders looking a
    /// condition column up by label survive table prefixing.
    pub fn with_alias(expression: Expression, alias: String) -> Self {
        ExprProjection { expression, alias }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}
