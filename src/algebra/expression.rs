//! Boolean SQL conditions.
//!
//! An [`Expression`] is a boolean condition together with the set of
//! attributes it references. Equality is syntactic. The raw-SQL escape
//! hatch keeps its text opaque but token-scans `table.column` references
//! out of it, so tables mentioned only inside free-form condition text
//! still make it into the FROM list.

use std::collections::BTreeSet;
use std::fmt;

use super::attribute::{Attribute, RelationName};
use super::renamer::Renamer;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expression {
    /// The identity of conjunction; no constraint.
    True,
    /// Never satisfied.
    False,
    /// `a = b` over two columns, sides canonically ordered.
    AttributeEqual(Attribute, Attribute),
    /// `column = value`; the value is quoted by declared column type at SQL
    /// generation time.
    AttributeValue { attribute: Attribute, value: String },
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
    /// Opaque SQL text with its scanned column references.
    Sql(SqlFragment),
}

impl Expression {
    pub fn attribute_equal(a: Attribute, b: Attribute) -> Expression {
        if a == b {
            return Expression::True;
        }
        // Canonical order avoids carrying both `a=b` and `b=a`.
        if a <= b {
            Expression::AttributeEqual(a, b)
        } else {
            Expression::AttributeEqual(b, a)
        }
    }

    pub fn attribute_value(attribute: Attribute, value: impl Into<String>) -> Expression {
        Expression::AttributeValue {
            attribute,
            value: value.into(),
        }
    }

    pub fn sql(text: &str) -> Expression {
        Expression::Sql(SqlFragment::parse(text))
    }

    /// Flattening conjunction: TRUE disappears, FALSE dominates,
    /// duplicates collapse.
    pub fn conjunction(operands: Vec<Expression>) -> Expression {
        let mut flat: Vec<Expression> = Vec::new();
        for op in operands {
            match op {
                Expression::True => {}
                Expression::False => return Expression::False,
                Expression::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Expression::True,
            1 => flat.into_iter().next().unwrap_or(Expression::True),
            _ => Expression::And(flat),
        }
    }

    pub fn disjunction(operands: Vec<Expression>) -> Expression {
        let mut flat: Vec<Expression> = Vec::new();
        for op in operands {
            match op {
                Expression::False => {}
                Expression::True => return Expression::True,
                Expression::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Expression::False,
            1 => flat.into_iter().next().unwrap_or(Expression::False),
            _ => Expression::Or(flat),
        }
    }

    pub fn and(self, other: Expression) -> Expression {
        Expression::conjunction(vec![self, other])
    }

    pub fn or(self, other: Expression) -> Expression {
        Expression::disjunction(vec![self, other])
    }

    pub fn negation(self) -> Expression {
        match self {
            Expression::True => Expression::False,
            Expression::False => Expression::True,
            Expression::Not(inner) => *inner,
            other => Expression::Not(Box::new(other)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expression::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expression::False)
    }

    pub fn attributes(&self) -> BTreeSet<Attribute> {
        let mut out = BTreeSet::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes(&self, out: &mut BTreeSet<Attribute>) {
        match self {
            Expression::True | Expression::False => {}
            Expression::AttributeEqual(a, b) => {
                out.insert(a.clone());
                out.insert(b.clone());
            }
            Expression::AttributeValue { attribute, .. } => {
                out.insert(attribute.clone());
            }
            Expression::And(ops) | Expression::Or(ops) => {
                for op in ops {
                    op.collect_attributes(out);
                }
            }
            Expression::Not(inner) => inner.collect_attributes(out),
            Expression::Sql(fragment) => out.extend(fragment.attributes().iter().cloned()),
        }
    }

    pub fn tables(&self) -> BTreeSet<RelationName> {
        self.attributes()
            .into_iter()
            .map(|a| a.relation().clone())
            .collect()
    }

    pub fn renamed(&self, renamer: &Renamer) -> Expression {
        match self {
            Expression::True => Expression::True,
            Expression::False => Expression::False,
            Expression::AttributeEqual(a, b) => {
                Expression::attribute_equal(renamer.attribute(a), renamer.attribute(b))
            }
            Expression::AttributeValue { attribute, value } => Expression::AttributeValue {
                attribute: renamer.attribute(attribute),
                value: value.clone(),
            },
            Expression::And(ops) => {
                Expression::conjunction(ops.iter().map(|op| op.renamed(renamer)).collect())
            }
            Expression::Or(ops) => {
                Expression::disjunction(ops.iter().map(|op| op.renamed(renamer)).collect())
            }
            Expression::Not(inner) => inner.renamed(renamer).negation(),
            Expression::Sql(fragment) => Expression::Sql(fragment.renamed(renamer)),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::True => write!(f, "TRUE"),
            Expression::False => write!(f, "FALSE"),
            Expression::AttributeEqual(a, b) => write!(f, "{} = {}", a, b),
            Expression::AttributeValue { attribute, value } => {
                write!(f, "{} = {:?}", attribute, value)
            }
            Expression::And(ops) => {
                let parts: Vec<String> = ops.iter().map(|o| o.to_string()).collect();
                write!(f, "({})", parts.join(" AND "))
            }
            Expression::Or(ops) => {
                let parts: Vec<String> = ops.iter().map(|o| o.to_string()).collect();
                write!(f, "({})", parts.join(" OR "))
            }
            Expression::Not(inner) => write!(f, "NOT ({})", inner),
            Expression::Sql(fragment) => write!(f, "{}", fragment.text()),
        }
    }
}

/// Raw SQL text plus the column references scanned out of it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SqlFragment {
    text: String,
    attributes: Vec<Attribute>,
}

impl SqlFragment {
    /// Scan `text` for `table.column` / `schema.table.column` tokens
    /// outside single-quoted strings.
    pub fn parse(text: &str) -> SqlFragment {
        let attributes = scan_column_references(text)
            .into_iter()
            .map(|(_, attr)| attr)
            .collect();
        SqlFragment {
            text: text.to_string(),
            attributes,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn renamed(&self, renamer: &Renamer) -> SqlFragment {
        let matches = scan_column_references(&self.text);
        let mut rewritten = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for (range, attr) in &matches {
            rewritten.push_str(&self.text[cursor..range.0]);
            rewritten.push_str(&renamer.attribute(attr).qualified_name());
            cursor = range.1;
        }
        rewritten.push_str(&self.text[cursor..]);
        SqlFragment::parse(&rewritten)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte ranges and parsed attributes of every qualified column token in
/// `text`, in order. Quoted string literals are skipped.
fn scan_column_references(text: &str) -> Vec<((usize, usize), Attribute)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if c == '\'' {
            in_string = true;
            i += 1;
            continue;
        }
        if is_identifier_start(c) && (i == 0 || !is_identifier_char(bytes[i - 1] as char)) {
            let start = i;
            let mut parts: Vec<(usize, usize)> = Vec::new();
            let mut j = i;
            loop {
                let part_start = j;
                while j < bytes.len() && is_identifier_char(bytes[j] as char) {
                    j += 1;
                }
                parts.push((part_start, j));
                if j < bytes.len()
                    && bytes[j] as char == '.'
                    && j + 1 < bytes.len()
                    && is_identifier_start(bytes[j + 1] as char)
                    && parts.len() < 3
                {
                    j += 1;
                } else {
                    break;
                }
            }
            if parts.len() >= 2 {
                let qualified = &text[start..j];
                if let Ok(attr) = Attribute::parse(qualified) {
                    out.push(((start, j), attr));
                }
            }
            i = j.max(i + 1);
        } else {
            i += 1;
        }
    }
    out
}
