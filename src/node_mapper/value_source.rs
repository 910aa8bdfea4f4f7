//! Value sources: the bidirectional mapping between a database row and the
//! lexical form of a graph term.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::algebra::{Attribute, Renamer};
use crate::database::ResultRow;

use super::errors::NodeMapperError;
use super::pattern::Pattern;
use super::translator::ValueTranslator;

/// Structural description of a source, used by the constraint layer to
/// derive column-equality facts without touching the database. Sources
/// whose value mapping is not column-transparent (translations) report
/// [`SourceShape::Opaque`]; the executor then enforces shared-variable
/// consistency at decode time instead.
#[derive(Debug, Clone, Copy)]
pub enum SourceShape<'a> {
    Column(&'a Attribute),
    Pattern(&'a Pattern),
    BlankNodeId {
        label: &'a str,
        attributes: &'a [Attribute],
    },
    Opaque,
}

/// A pure function row → lexical value, and its inverse value → forced
/// column assignments.
pub trait ValueSource: fmt::Debug + Send + Sync {
    /// Database-free feasibility check for a lexical value.
    fn could_fit(&self, value: &str) -> bool;

    /// Columns this source reads.
    fn required_attributes(&self) -> Vec<Attribute>;

    /// Decompose a concrete value into column assignments; `None` means
    /// the value cannot originate here.
    fn column_values(&self, value: &str) -> Option<Vec<(Attribute, String)>>;

    /// Build the lexical value from a decoded row; `None` on NULL.
    fn make_value(&self, row: &ResultRow) -> Option<String>;

    fn renamed(&self, renamer: &Renamer) -> Arc<dyn ValueSource>;

    fn shape(&self) -> SourceShape<'_>;
}

/// A single column's value, as-is.
#[derive(Debug, Clone)]
pub struct ColumnSource {
    attribute: Attribute,
}

impl ColumnSource {
    pub fn new(attribute: Attribute) -> Self {
        ColumnSource { attribute }
    }
}

impl ValueSource for ColumnSource {
    fn could_fit(&self, _value: &str) -> bool {
        true
    }

    fn required_attributes(&self) -> Vec<Attribute> {
        vec![self.attribute.clone()]
    }

    fn column_values(&self, value: &str) -> Option<Vec<(Attribute, String)>> {
        Some(vec![(self.attribute.clone(), value.to_string())])
    }

    fn make_value(&self, row: &ResultRow) -> Option<String> {
        row.value(&self.attribute.qualified_name())?.as_lexical()
    }

    fn renamed(&self, renamer: &Renamer) -> Arc<dyn ValueSource> {
        Arc::new(ColumnSource {
            attribute: renamer.attribute(&self.attribute),
        })
    }

    fn shape(&self) -> SourceShape<'_> {
        SourceShape::Column(&self.attribute)
    }
}

/// A pattern-template value.
#[derive(Debug, Clone)]
pub struct PatternSource {
    pattern: Pattern,
}

impl PatternSource {
    pub fn new(pattern: Pattern) -> Self {
        PatternSource { pattern }
    }

    pub fn parse(template: &str) -> Result<Self, NodeMapperError> {
        Ok(PatternSource {
            pattern: Pattern::parse(template)?,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

impl ValueSource for PatternSource {
    fn could_fit(&self, value: &str) -> bool {
        self.pattern.matches(value)
    }

    fn required_attributes(&self) -> Vec<Attribute> {
        self.pattern.columns().to_vec()
    }

    fn column_values(&self, value: &str) -> Option<Vec<(Attribute, String)>> {
        self.pattern.decompose(value)
    }

    fn make_value(&self, row: &ResultRow) -> Option<String> {
        self.pattern.compose(row)
    }

    fn renamed(&self, renamer: &Renamer) -> Arc<dyn ValueSource> {
        Arc::new(PatternSource {
            pattern: self.pattern.renamed(renamer),
        })
    }

    fn shape(&self) -> SourceShape<'_> {
        SourceShape::Pattern(&self.pattern)
    }
}

/// Blank node identifiers: a mapping-fragment label plus the `|`-joined
/// key column values, `Label:v1|v2`. The format is reversible with plain
/// string operations; identifiers are only ever compared within one query.
#[derive(Debug, Clone)]
pub struct BlankNodeIdSource {
    label: String,
    attributes: Vec<Attribute>,
}

impl BlankNodeIdSource {
    pub fn new(label: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        BlankNodeIdSource {
            label: label.into(),
            attributes,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn split<'v>(&self, value: &'v str) -> Option<Vec<&'v str>> {
        let (label, ids) = value.split_once(':')?;
        if label != self.label {
            return None;
        }
        let parts: Vec<&str> = ids.split('|').collect();
        if parts.len() != self.attributes.len() {
            return None;
        }
        Some(parts)
    }
}

impl ValueSource for BlankNodeIdSource {
    fn could_fit(&self, value: &str) -> bool {
        self.split(value).is_some()
    }

    fn required_attributes(&self) -> Vec<Attribute> {
        self.attributes.clone()
    }

    fn column_values(&self, value: &str) -> Option<Vec<(Attribute, String)>> {
        let parts = self.split(value)?;
        Some(
            self.attributes
                .iter()
                .cloned()
                .zip(parts.into_iter().map(|p| p.to_string()))
                .collect(),
        )
    }

    fn make_value(&self, row: &ResultRow) -> Option<String> {
        let mut ids = Vec::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            ids.push(row.value(&attr.qualified_name())?.as_lexical()?);
        }
        Some(format!("{}:{}", self.label, ids.join("|")))
    }

    fn renamed(&self, renamer: &Renamer) -> Arc<dyn ValueSource> {
        Arc::new(BlankNodeIdSource {
            label: self.label.clone(),
            attributes: self.attributes.iter().map(|a| renamer.attribute(a)).collect(),
        })
    }

    fn shape(&self) -> SourceShape<'_> {
        SourceShape::BlankNodeId {
            label: &self.label,
            attributes: &self.attributes,
        }
    }
}

/// Restriction decorators: declared promises about the underlying data,
/// checked on the way in (they prune candidates) and trusted on the way
/// out.
#[derive(Debug)]
pub enum Restriction {
    MaxLength(usize),
    Contains(String),
    Matches(Regex),
}

impl Restriction {
    pub fn regex(pattern: &str) -> Result<Restriction, NodeMapperError> {
        Regex::new(pattern)
            .map(Restriction::Matches)
            .map_err(|e| NodeMapperError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Restriction::MaxLength(max) => value.len() <= *max,
            Restriction::Contains(needle) => value.contains(needle),
            Restriction::Matches(re) => re.is_match(value),
        }
    }
}

#[derive(Debug)]
pub struct RestrictedSource {
    inner: Arc<dyn ValueSource>,
    restriction: Arc<Restriction>,
}

impl RestrictedSource {
    pub fn new(inner: Arc<dyn ValueSource>, restriction: Restriction) -> Self {
        RestrictedSource {
            inner,
            restriction: Arc::new(restriction),
        }
    }
}

impl ValueSource for RestrictedSource {
    fn could_fit(&self, value: &str) -> bool {
        self.restriction.accepts(value) && self.inner.could_fit(value)
    }

    fn required_attributes(&self) -> Vec<Attribute> {
        self.inner.required_attributes()
    }

    fn column_values(&self, value: &str) -> Option<Vec<(Attribute, String)>> {
        if !self.restriction.accepts(value) {
            return None;
        }
        self.inner.column_values(value)
    }

    fn make_value(&self, row: &ResultRow) -> Option<String> {
        self.inner.make_value(row)
    }

    fn renamed(&self, renamer: &Renamer) -> Arc<dyn ValueSource> {
        Arc::new(RestrictedSource {
            inner: self.inner.renamed(renamer),
            restriction: Arc::clone(&self.restriction),
        })
    }

    /// Restrictions do not change the value↔column relation, so the inner
    /// shape stays valid for constraint purposes.
    fn shape(&self) -> SourceShape<'_> {
        self.inner.shape()
    }
}

/// Translation decorator: database values pass through a
/// [`ValueTranslator`] on their way to the graph and back.
#[derive(Debug)]
pub struct TranslatingSource {
    inner: Arc<dyn ValueSource>,
    translator: Arc<dyn ValueTranslator>,
}

impl TranslatingSource {
    pub fn new(inner: Arc<dyn ValueSource>, translator: Arc<dyn ValueTranslator>) -> Self {
        TranslatingSource { inner, translator }
    }
}

impl ValueSource for TranslatingSource {
    fn could_fit(&self, value: &str) -> bool {
        match self.translator.to_db(value) {
            Some(db_value) => self.inner.could_fit(&db_value),
            None => false,
        }
    }

    fn required_attributes(&self) -> Vec<Attribute> {
        self.inner.required_attributes()
    }

    fn column_values(&self, value: &str) -> Option<Vec<(Attribute, String)>> {
        let db_value = self.translator.to_db(value)?;
        self.inner.column_values(&db_value)
    }

    fn make_value(&self, row: &ResultRow) -> Option<String> {
        let db_value = self.inner.make_value(row)?;
        self.translator.to_rdf(&db_value)
    }

    fn renamed(&self, renamer: &Renamer) -> Arc<dyn ValueSource> {
        Arc::new(TranslatingSource {
            inner: self.inner.renamed(renamer),
            translator: Arc::clone(&self.translator),
        })
    }

    /// The translation breaks column transparency: equal graph values need
    /// not mean equal column values.
    fn shape(&self) -> SourceShape<'_> {
        SourceShape::Opaque
    }
}
