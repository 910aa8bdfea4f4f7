//! Table and column identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::AlgebraError;

/// A schema-qualified table identifier.
///
/// Comparison is on the stored strings; databases with case-insensitive
/// identifiers normalize through [`RelationName::case_normalized`] at
/// mapping construction so map-key semantics stay trivial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationName {
    schema: Option<String>,
    name: String,
}

impl RelationName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        RelationName {
            schema: schema.map(|s| s.to_string()),
            name: name.to_string(),
        }
    }

    pub fn unqualified(name: &str) -> Self {
        RelationName::new(None, name)
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `schema.table` or bare `table`.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }

    /// Lowercased copy, for case-insensitive databases.
    pub fn case_normalized(&self) -> Self {
        RelationName {
            schema: self.schema.as_ref().map(|s| s.to_ascii_lowercase()),
            name: self.name.to_ascii_lowercase(),
        }
    }

    /// The per-pattern alias name `T<index>_<name>` used to keep table
    /// references of distinct triple patterns independent. The schema
    /// qualifier folds into the alias: aliases are plain identifiers.
    pub fn with_prefix(&self, index: usize) -> RelationName {
        let base = match &self.schema {
            Some(s) => format!("{}_{}", s, self.name),
            None => self.name.clone(),
        };
        RelationName {
            schema: None,
            name: format!("T{}_{}", index, base),
        }
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// A table-qualified column identifier (`table.column`).
///
/// Immutable; equality and hashing are on the qualified name, so attributes
/// serve as map keys throughout the compiler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Attribute {
    relation: RelationName,
    column: String,
}

impl Attribute {
    pub fn new(relation: RelationName, column: &str) -> Self {
        Attribute {
            relation,
            column: column.to_string(),
        }
    }

    /// Parse `table.column` or `schema.table.column`.
    pub fn parse(qualified: &str) -> Result<Self, AlgebraError> {
        let parts: Vec<&str> = qualified.split('.').collect();
        let malformed = || AlgebraError::MalformedAttribute {
            name: qualified.to_string(),
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed());
        }
        match parts.as_slice() {
            [table, column] => Ok(Attribute::new(RelationName::unqualified(table), column)),
            [schema, table, column] => {
                Ok(Attribute::new(RelationName::new(Some(schema), table), column))
            }
            _ => Err(malformed()),
        }
    }

    pub fn relation(&self) -> &RelationName {
        &self.relation
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.relation.qualified_name(), self.column)
    }

    /// Same column on a different table, used when a join is collapsed.
    pub fn with_relation(&self, relation: RelationName) -> Attribute {
        Attribute {
            relation,
            column: self.column.clone(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
