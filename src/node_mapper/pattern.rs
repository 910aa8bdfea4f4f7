//! Pattern templates.
//!
//! A template interleaves literal text with `@@table.column@@`
//! placeholders, e.g. `http://example.org/paper/@@Papers.id@@`. It builds
//! a lexical value from a row and, inversely, decomposes a concrete value
//! into forced column assignments. Matching is literal and greedy
//! left-to-right over delimiter-bounded segments; when two placeholders
//! are separated by empty literal text the first match wins — no
//! backtracking.

use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::combinator::rest;
use nom::sequence::delimited;
use nom::{IResult, Parser};

use crate::algebra::{Attribute, Renamer};
use crate::database::ResultRow;

use super::errors::NodeMapperError;

const DELIMITER: &str = "@@";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// `literals.len() == columns.len() + 1`; literal segments may be
    /// empty.
    literals: Vec<String>,
    columns: Vec<Attribute>,
}

fn literal_chunk(input: &str) -> IResult<&str, &str> {
    alt((take_until(DELIMITER), rest)).parse(input)
}

fn column_ref(input: &str) -> IResult<&str, &str> {
    delimited(tag(DELIMITER), take_until(DELIMITER), tag(DELIMITER)).parse(input)
}

impl Pattern {
    pub fn parse(template: &str) -> Result<Pattern, NodeMapperError> {
        let mut literals: Vec<String> = Vec::new();
        let mut columns: Vec<Attribute> = Vec::new();

        let (mut remaining, first) = literal_chunk(template).map_err(|_| {
            NodeMapperError::MalformedPattern {
                template: template.to_string(),
                reason: "unreadable literal segment".to_string(),
            }
        })?;
        literals.push(first.to_string());

        while !remaining.is_empty() {
            let (rest_input, column_text) =
                column_ref(remaining).map_err(|_| NodeMapperError::MalformedPattern {
                    template: template.to_string(),
                    reason: "unterminated column placeholder".to_string(),
                })?;
            columns.push(Attribute::parse(column_text.trim())?);
            let (rest_input, lit) =
                literal_chunk(rest_input).map_err(|_| NodeMapperError::MalformedPattern {
                    template: template.to_string(),
                    reason: "unreadable literal segment".to_string(),
                })?;
            literals.push(lit.to_string());
            remaining = rest_input;
        }

        if columns.is_empty() {
            return Err(NodeMapperError::PatternWithoutColumns {
                template: template.to_string(),
            });
        }
        Ok(Pattern { literals, columns })
    }

    pub fn columns(&self) -> &[Attribute] {
        &self.columns
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Whether `value` can be produced by this template.
    pub fn matches(&self, value: &str) -> bool {
        self.decompose(value).is_some()
    }

    /// Split `value` into forced column assignments, or `None` when the
    /// value cannot match — that failure means "this bridge cannot produce
    /// this term" and prunes the candidate before any SQL runs.
    pub fn decompose(&self, value: &str) -> Option<Vec<(Attribute, String)>> {
        let mut rest = value.strip_prefix(self.literals[0].as_str())?;
        let mut out = Vec::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            let literal = &self.literals[i + 1];
            let last = i == self.columns.len() - 1;
            let piece: &str;
            if literal.is_empty() {
                if last {
                    piece = rest;
                    rest = "";
                } else {
                    // Adjacent placeholders: first match wins, the earlier
                    // column takes the empty string.
                    piece = "";
                }
            } else {
                let pos = rest.find(literal.as_str())?;
                piece = &rest[..pos];
                rest = &rest[pos + literal.len()..];
            }
            out.push((column.clone(), piece.to_string()));
        }
        if !rest.is_empty() {
            return None;
        }
        Some(out)
    }

    /// Assemble a value from a row; NULL in any referenced column yields
    /// `None`, never a partial value.
    pub fn compose(&self, row: &ResultRow) -> Option<String> {
        let mut out = String::from(&self.literals[0]);
        for (i, column) in self.columns.iter().enumerate() {
            let value = row.value(&column.qualified_name())?.as_lexical()?;
            out.push_str(&value);
            out.push_str(&self.literals[i + 1]);
        }
        Some(out)
    }

    /// Positional cross-check against another template: equal literal
    /// skeletons make the two value spaces overlap exactly when
    /// corresponding columns are equal, so each slot contributes a
    /// column-equality fact. Differing skeletons are treated as disjoint.
    pub fn column_equalities_with(&self, other: &Pattern) -> Option<Vec<(Attribute, Attribute)>> {
        if self.literals != other.literals {
            return None;
        }
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(other.columns.iter().cloned())
                .collect(),
        )
    }

    pub fn renamed(&self, renamer: &Renamer) -> Pattern {
        Pattern {
            literals: self.literals.clone(),
            columns: self.columns.iter().map(|c| renamer.attribute(c)).collect(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literals[0])?;
        for (i, column) in self.columns.iter().enumerate() {
            write!(
                f,
                "{}{}{}{}",
                DELIMITER,
                column.qualified_name(),
                DELIMITER,
                self.literals[i + 1]
            )?;
        }
        Ok(())
    }
}
