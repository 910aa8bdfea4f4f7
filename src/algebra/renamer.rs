//! Attribute renaming.
//!
//! All table-prefixing and join-collapsing rewrites go through a
//! [`Renamer`] applied as a pure function returning new values; nothing in
//! the algebra layer is mutated in place.

use std::collections::BTreeMap;

use super::alias_map::AliasMap;
use super::attribute::{Attribute, RelationName};

#[derive(Debug, Clone)]
pub enum Renamer {
    /// No-op.
    Identity,
    /// Rename every table reference to its `T<index>_` alias. Used to keep
    /// table references of distinct triple patterns independent even when
    /// they share a physical table.
    Prefix { index: usize },
    /// Rewrite table references into their declared aliased form.
    Aliases(AliasMap),
    /// Point-wise column substitution; attributes absent from the map are
    /// left untouched. Used when a collapsed join redirects one table's
    /// columns onto another.
    Columns(BTreeMap<Attribute, Attribute>),
}

impl Renamer {
    pub fn prefix(index: usize) -> Renamer {
        Renamer::Prefix { index }
    }

    pub fn columns<I>(pairs: I) -> Renamer
    where
        I: IntoIterator<Item = (Attribute, Attribute)>,
    {
        Renamer::Columns(pairs.into_iter().collect())
    }

    pub fn attribute(&self, attribute: &Attribute) -> Attribute {
        match self {
            Renamer::Identity => attribute.clone(),
            Renamer::Prefix { index } => {
                attribute.with_relation(attribute.relation().with_prefix(*index))
            }
            Renamer::Aliases(aliases) => {
                attribute.with_relation(aliases.apply_to(attribute.relation()))
            }
            Renamer::Columns(map) => map.get(attribute).cloned().unwrap_or_else(|| attribute.clone()),
        }
    }

    pub fn relation_name(&self, name: &RelationName) -> RelationName {
        match self {
            Renamer::Identity => name.clone(),
            Renamer::Prefix { index } => name.with_prefix(*index),
            Renamer::Aliases(aliases) => aliases.apply_to(name),
            // A column substitution does not move whole tables.
            Renamer::Columns(_) => name.clone(),
        }
    }
}
