//! SQL text generation.
//!
//! Walks a [`Relation`] into one ANSI `SELECT [DISTINCT] ... FROM ...
//! [WHERE ...] [ORDER BY ...] [LIMIT n]` statement. Literal quoting is
//! driven by declared column types; DISTINCT is gated on the database's
//! capability flags and the projected columns' types. The duplicate filter
//! in the executor does not rely on DISTINCT — here it is an optimization
//! only.

use std::collections::HashMap;

use crate::algebra::{Expression, ProjectionSpec, Relation};
use crate::database::{ColumnType, Database, DateLiteralStyle};

pub mod errors;

pub use errors::SqlGenerationError;

/// A generated statement plus its ordered SELECT list; row values come
/// back positionally aligned with `projections`.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub sql: String,
    pub projections: Vec<ProjectionSpec>,
}

impl SelectStatement {
    /// Label → position lookup for decoders.
    pub fn column_index(&self) -> HashMap<String, usize> {
        self.projections
            .iter()
            .enumerate()
            .map(|(i, p)| (p.label(), i))
            .collect()
    }
}

/// Generate the SELECT statement for `relation`.
pub fn select_statement(
    relation: &Relation,
    database: &Database,
) -> Result<SelectStatement, SqlGenerationError> {
    if relation.is_empty() {
        return Err(SqlGenerationError::EmptyRelation);
    }
    let tables = relation.tables();
    if tables.is_empty() {
        return Err(SqlGenerationError::NoTables);
    }
    // BTreeSet order makes generated text deterministic; equal-labelled
    // projections were already deduplicated by the set.
    let projections: Vec<ProjectionSpec> = relation.projections().iter().cloned().collect();
    if projections.is_empty() {
        return Err(SqlGenerationError::NoProjections);
    }

    let mut sql = String::from("SELECT ");
    if use_distinct(relation, database, &projections) {
        sql.push_str("DISTINCT ");
    }

    let select_items: Vec<String> = projections
        .iter()
        .map(|p| match p {
            ProjectionSpec::Attr(a) => a.qualified_name(),
            ProjectionSpec::Expr(e) => format!(
                "({}) AS {}",
                expression_sql(e.expression(), database),
                e.alias()
            ),
        })
        .collect();
    sql.push_str(&select_items.join(", "));

    sql.push_str(" FROM ");
    let from_items: Vec<String> = tables
        .iter()
        .map(|t| {
            if relation.aliases().is_alias(t) {
                format!(
                    "{} AS {}",
                    relation.aliases().original_of(t).qualified_name(),
                    t.qualified_name()
                )
            } else {
                t.qualified_name()
            }
        })
        .collect();
    sql.push_str(&from_items.join(", "));

    let mut where_parts: Vec<String> = Vec::new();
    for join in relation.joins() {
        for (a, b) in join.pairs() {
            where_parts.push(format!("{} = {}", a.qualified_name(), b.qualified_name()));
        }
    }
    if !relation.condition().is_true() {
        where_parts.push(expression_sql(relation.condition(), database));
    }
    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }

    if !relation.order().is_empty() {
        sql.push_str(" ORDER BY ");
        let order_items: Vec<String> = relation
            .order()
            .iter()
            .map(|o| {
                if o.descending {
                    format!("{} DESC", o.attribute.qualified_name())
                } else {
                    o.attribute.qualified_name()
                }
            })
            .collect();
        sql.push_str(&order_items.join(", "));
    }

    if let Some(limit) = relation.limit() {
        if database.capabilities().supports_limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
    }

    log::debug!("generated SQL: {}", sql);
    Ok(SelectStatement { sql, projections })
}

fn use_distinct(relation: &Relation, database: &Database, projections: &[ProjectionSpec]) -> bool {
    if !relation.is_unique() {
        return false;
    }
    if database.capabilities().distinct_on_all_columns {
        return true;
    }
    projections.iter().all(|p| match p {
        ProjectionSpec::Attr(a) => database
            .column_type(&a.qualified_name())
            .supports_distinct(),
        // Boolean-valued condition columns always compare fine.
        ProjectionSpec::Expr(_) => true,
    })
}

/// Render a boolean condition, quoting values per declared column type.
pub fn expression_sql(expression: &Expression, database: &Database) -> String {
    match expression {
        Expression::True => "(1=1)".to_string(),
        Expression::False => "(1=0)".to_string(),
        Expression::AttributeEqual(a, b) => {
            format!("{} = {}", a.qualified_name(), b.qualified_name())
        }
        Expression::AttributeValue { attribute, value } => {
            let ty = database.column_type(&attribute.qualified_name());
            format!(
                "{} = {}",
                attribute.qualified_name(),
                quote_value(value, ty, database.capabilities().date_literal_style)
            )
        }
        Expression::And(ops) => {
            let parts: Vec<String> = ops.iter().map(|o| expression_sql(o, database)).collect();
            format!("({})", parts.join(" AND "))
        }
        Expression::Or(ops) => {
            let parts: Vec<String> = ops.iter().map(|o| expression_sql(o, database)).collect();
            format!("({})", parts.join(" OR "))
        }
        Expression::Not(inner) => format!("NOT ({})", expression_sql(inner, database)),
        Expression::Sql(fragment) => format!("({})", fragment.text()),
    }
}

/// Quote a literal for the WHERE clause. Text values are single-quoted with
/// quote and backslash escaping; numeric values pass through only when they
/// actually parse as numbers, otherwise they fall back to quoted text so a
/// malicious lexical form cannot splice into the statement.
pub fn quote_value(value: &str, column_type: ColumnType, date_style: DateLiteralStyle) -> String {
    match column_type {
        ColumnType::Numeric => {
            if value.parse::<f64>().is_ok() {
                value.to_string()
            } else {
                log::warn!(
                    "non-numeric value {:?} for numeric column, quoting as text",
                    value
                );
                quote_text(value)
            }
        }
        ColumnType::Boolean => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => "TRUE".to_string(),
            "false" | "0" => "FALSE".to_string(),
            _ => quote_text(value),
        },
        ColumnType::Date => match date_style {
            DateLiteralStyle::Ansi => format!("DATE {}", quote_text(value)),
            DateLiteralStyle::Odbc => format!("{{d {}}}", quote_text(value)),
        },
        ColumnType::Timestamp => match date_style {
            DateLiteralStyle::Ansi => format!("TIMESTAMP {}", quote_text(value)),
            DateLiteralStyle::Odbc => format!("{{ts {}}}", quote_text(value)),
        },
        ColumnType::Text | ColumnType::LargeText | ColumnType::Binary => quote_text(value),
    }
}

fn quote_text(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "''");
    format!("'{}'", escaped)
}
