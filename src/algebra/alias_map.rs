//! Table aliasing.

use std::collections::BTreeMap;
use std::fmt;

use super::attribute::RelationName;
use super::errors::AlgebraError;

/// Maps alias names to physical table names.
///
/// An alias is bound to exactly one physical table. Within one declared
/// bridge a table also has at most one alias ([`Self::with_declared_alias`]
/// enforces this); maps merged across the patterns of a conjunction hold
/// several aliases of the same table on purpose — that is how self-joins
/// across patterns work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    by_alias: BTreeMap<RelationName, RelationName>,
}

impl AliasMap {
    pub fn empty() -> Self {
        AliasMap::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, AlgebraError>
    where
        I: IntoIterator<Item = (RelationName, RelationName)>,
    {
        let mut map = AliasMap::empty();
        for (alias, original) in pairs {
            map = map.with_declared_alias(alias, original)?;
        }
        Ok(map)
    }

    /// Bind an alias; rebinding an alias to a different table is an error,
    /// several aliases of one table are fine.
    pub fn with_alias(
        mut self,
        alias: RelationName,
        original: RelationName,
    ) -> Result<Self, AlgebraError> {
        if let Some(bound) = self.by_alias.get(&alias) {
            if *bound != original {
                return Err(AlgebraError::ConflictingAlias {
                    alias: alias.qualified_name(),
                    first: bound.qualified_name(),
                    second: original.qualified_name(),
                });
            }
            return Ok(self);
        }
        self.by_alias.insert(alias, original);
        Ok(self)
    }

    /// Declaration-level bind: additionally rejects a second alias for the
    /// same table within one mapping fragment.
    pub fn with_declared_alias(
        self,
        alias: RelationName,
        original: RelationName,
    ) -> Result<Self, AlgebraError> {
        if let Some(existing) = self.alias_of(&original) {
            if *existing != alias {
                return Err(AlgebraError::DuplicateAlias {
                    table: original.qualified_name(),
                    existing: existing.qualified_name(),
                    duplicate: alias.qualified_name(),
                });
            }
        }
        self.with_alias(alias, original)
    }

    /// Internal insert for renaming paths where keys are distinct by
    /// construction (prefixed alias names are unique per table).
    pub(crate) fn insert_unchecked(&mut self, alias: RelationName, original: RelationName) {
        self.by_alias.insert(alias, original);
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    pub fn is_alias(&self, name: &RelationName) -> bool {
        self.by_alias.contains_key(name)
    }

    pub fn has_alias_for(&self, original: &RelationName) -> bool {
        self.alias_of(original).is_some()
    }

    /// The physical table behind `name`; identity when `name` is not an
    /// alias.
    pub fn original_of(&self, name: &RelationName) -> RelationName {
        self.by_alias.get(name).cloned().unwrap_or_else(|| name.clone())
    }

    pub fn alias_of(&self, original: &RelationName) -> Option<&RelationName> {
        self.by_alias
            .iter()
            .find(|(_, o)| *o == original)
            .map(|(a, _)| a)
    }

    /// Rewrite a table reference into its aliased form, if one is declared.
    pub fn apply_to(&self, name: &RelationName) -> RelationName {
        self.alias_of(name).cloned().unwrap_or_else(|| name.clone())
    }

    /// Union of two alias maps; overlapping declarations must agree.
    pub fn merge(&self, other: &AliasMap) -> Result<AliasMap, AlgebraError> {
        let mut merged = self.clone();
        for (alias, original) in &other.by_alias {
            merged = merged.with_alias(alias.clone(), original.clone())?;
        }
        Ok(merged)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RelationName, &RelationName)> {
        self.by_alias.iter()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &RelationName> {
        self.by_alias.keys()
    }
}

impl fmt::Display for AliasMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .by_alias
            .iter()
            .map(|(a, o)| format!("{} AS {}", o.qualified_name(), a.qualified_name()))
            .collect();
        write!(f, "AliasMap({})", rendered.join(", "))
    }
}
