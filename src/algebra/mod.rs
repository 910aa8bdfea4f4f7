//! Relational algebra primitives.
//!
//! Everything here is an immutable value: qualified identifiers, alias
//! maps, equi-join conditions, boolean expressions, SELECT-list specs, and
//! the [`Relation`] they compose into. Query compilation renames these
//! values per pattern instead of mutating them; see [`renamer::Renamer`].

pub mod alias_map;
pub mod attribute;
pub mod errors;
pub mod expression;
pub mod join;
pub mod projection;
pub mod relation;
pub mod renamer;

pub use alias_map::AliasMap;
pub use attribute::{Attribute, RelationName};
pub use errors::AlgebraError;
pub use expression::{Expression, SqlFragment};
pub use join::Join;
pub use projection::{ExprProjection, ProjectionSpec};
pub use relation::{MutableRelation, OrderSpec, Relation};
pub use renamer::Renamer;
