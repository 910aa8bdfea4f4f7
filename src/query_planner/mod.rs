//! The pattern compiler.
//!
//! Turns a triple pattern (or a conjunction of them) into the minimal set
//! of SQL statements whose decoded rows are exactly the answer set:
//! candidate bridge selection by database-free feasibility checks,
//! per-pattern table prefixing, cross-pattern constraint propagation over
//! shared variables, per-bridge join elimination, and union merging of
//! relations that differ only in their WHERE condition.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::algebra::{AliasMap, ExprProjection, Expression, ProjectionSpec, Relation};
use crate::database::Database;
use crate::mapping::{GraphMapping, TripleRelation};
use crate::optimizer::JoinEliminationPass;
use crate::sql_generator::select_statement;

pub mod compiled;
pub mod errors;
pub mod node_constraint;
pub mod triple_pattern;

pub use compiled::{CompiledQuery, CompiledStatement, Decoder, DecoderKind};
pub use errors::CompileError;
pub use node_constraint::{NodeConstraint, VariableConstraints};
pub use triple_pattern::{Binding, BindingFilter, GraphPattern, PatternNode, TriplePattern};

/// One pre-statement candidate: a relation plus the decoder that will
/// interpret its rows.
struct Candidate {
    relation: Relation,
    database: Arc<Database>,
    decoder: DecoderKind,
}

#[derive(Debug)]
pub struct PatternCompiler<'a> {
    mapping: &'a GraphMapping,
    join_elimination: JoinEliminationPass,
}

impl<'a> PatternCompiler<'a> {
    pub fn new(mapping: &'a GraphMapping) -> Self {
        PatternCompiler {
            mapping,
            join_elimination: JoinEliminationPass::new(),
        }
    }

    /// Compile a single triple-match request.
    pub fn compile_find(&self, pattern: &TriplePattern) -> Result<CompiledQuery, CompileError> {
        let mut candidates: Vec<Candidate> = Vec::new();
        for bridge in self.mapping.bridges() {
            let Some(bound) = self.bind_pattern(bridge, pattern, None) else {
                continue;
            };
            let optimized = self
                .join_elimination
                .optimize(&bound.project_to_makers())
                .into_inner();
            if optimized.is_empty() {
                continue;
            }
            let Some(database) = optimized.base().database().cloned() else {
                continue;
            };
            let decoder = DecoderKind::Triple {
                subject: optimized.subject().clone(),
                predicate: optimized.predicate().clone(),
                object: optimized.object().clone(),
            };
            candidates.push(Candidate {
                relation: optimized.base().clone(),
                database,
                decoder,
            });
        }
        log::debug!("find {}: {} candidate bridge(s)", pattern, candidates.len());
        build_statements(candidates)
    }

    /// Compile a conjunction of triple patterns into one statement per
    /// consistent candidate combination.
    pub fn compile_bgp(&self, bgp: &GraphPattern) -> Result<CompiledQuery, CompileError> {
        if bgp.patterns.is_empty() {
            return Ok(CompiledQuery::empty());
        }

        // Per-pattern candidate bridges, renamed so patterns sharing a
        // table still get independent SQL table references.
        let mut per_pattern: Vec<Vec<TripleRelation>> = Vec::with_capacity(bgp.patterns.len());
        for (index, pattern) in bgp.patterns.iter().enumerate() {
            let mut list = Vec::new();
            for bridge in self.mapping.bridges() {
                if let Some(bound) = self.bind_pattern(bridge, pattern, Some(index)) {
                    list.push(self.join_elimination.optimize(&bound).into_inner());
                }
            }
            if list.is_empty() {
                // One pattern without candidates makes the whole
                // conjunction unsatisfiable; no SQL runs.
                log::debug!("pattern {} has no candidate bridges", pattern);
                return Ok(CompiledQuery::empty());
            }
            per_pattern.push(list);
        }

        // Lexicographic enumeration over the per-pattern candidate lists,
        // rightmost index advancing fastest.
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut indices = vec![0usize; per_pattern.len()];
        loop {
            let combination: Vec<&TripleRelation> = indices
                .iter()
                .enumerate()
                .map(|(pattern, &candidate)| &per_pattern[pattern][candidate])
                .collect();
            if let Some(candidate) = self.compile_combination(bgp, &combination)? {
                candidates.push(candidate);
            }
            if !advance(&mut indices, &per_pattern) {
                break;
            }
        }
        build_statements(candidates)
    }

    /// Feasibility-check one bridge against one pattern and bind its
    /// constant slots. `prefix` renames tables for conjunction members.
    fn bind_pattern(
        &self,
        bridge: &TripleRelation,
        pattern: &TriplePattern,
        prefix: Option<usize>,
    ) -> Option<TripleRelation> {
        for (position, node) in pattern.nodes() {
            if !bridge.could_fit(position, node.term()) {
                return None;
            }
        }
        let mut bound = match prefix {
            Some(index) => bridge.with_prefix(index),
            None => bridge.clone(),
        };
        for (position, node) in pattern.nodes() {
            if let Some(term) = node.term() {
                bound = bound.select_term(position, term)?;
            }
        }
        if bound.is_empty() {
            return None;
        }
        Some(bound)
    }

    /// One candidate combination → at most one candidate statement.
    /// Inconsistent combinations are skipped silently, before any SQL.
    fn compile_combination(
        &self,
        bgp: &GraphPattern,
        combination: &[&TripleRelation],
    ) -> Result<Option<Candidate>, CompileError> {
        // SQL joins only reach within one database.
        let mut database: Option<Arc<Database>> = None;
        for bridge in combination {
            let Some(db) = bridge.base().database() else {
                continue;
            };
            match &database {
                Some(existing) if !existing.same_as(db) => {
                    log::debug!("skipping candidate combination spanning databases");
                    return Ok(None);
                }
                Some(_) => {}
                None => database = Some(Arc::clone(db)),
            }
        }
        let Some(database) = database else {
            return Ok(None);
        };

        // Constraint propagation across shared variables, before SQL.
        let mut constraints = VariableConstraints::new();
        for (pattern, bridge) in bgp.patterns.iter().zip(combination.iter()) {
            for (position, node) in pattern.nodes() {
                if let Some(variable) = node.variable() {
                    constraints.add(variable, bridge.maker(position));
                }
            }
        }
        if constraints.is_impossible() {
            log::trace!("candidate combination inconsistent, skipped");
            return Ok(None);
        }
        let constraint_expr = constraints.to_expression();
        if constraint_expr.is_false() {
            return Ok(None);
        }

        // Merge the underlying relations.
        let mut aliases = AliasMap::empty();
        let mut joins = BTreeSet::new();
        let mut condition = Expression::True;
        let mut unique = true;
        for bridge in combination {
            aliases = aliases.merge(bridge.base().aliases())?;
            joins.extend(bridge.base().joins().iter().cloned());
            condition = condition.and(bridge.base().condition().clone());
            unique = unique && bridge.base().is_unique();
        }

        let binding_makers = constraints.binding_makers();
        let mut projections: BTreeSet<ProjectionSpec> = binding_makers
            .iter()
            .flat_map(|(_, makers)| makers.iter().flat_map(|m| m.projections()))
            .collect();
        if projections.is_empty() {
            // Fully ground conjunction: keep the bridges' own columns so
            // the statement stays well-formed; every row decodes to the
            // single empty binding.
            for bridge in combination {
                projections.extend(bridge.projections());
            }
        }

        let relation = Relation::new(
            Arc::clone(&database),
            aliases,
            joins,
            condition,
            projections,
            unique,
            Vec::new(),
            None,
        )
        .select(constraint_expr);
        if relation.is_empty() {
            return Ok(None);
        }

        Ok(Some(Candidate {
            relation,
            database,
            decoder: DecoderKind::Binding {
                variables: binding_makers,
            },
        }))
    }
}

/// Advance a mixed-radix counter; false once it wraps to all zeros.
fn advance(indices: &mut [usize], lists: &[Vec<TripleRelation>]) -> bool {
    let mut position = indices.len();
    while position > 0 {
        position -= 1;
        indices[position] += 1;
        if indices[position] < lists[position].len() {
            return true;
        }
        indices[position] = 0;
    }
    false
}

/// Group candidates whose relations differ only in their WHERE condition
/// into single statements: each condition becomes a boolean SELECT column
/// and the WHERE clause becomes the disjunction. Everything else compiles
/// one statement per candidate. Constant candidates (no tables) skip SQL
/// entirely.
fn build_statements(candidates: Vec<Candidate>) -> Result<CompiledQuery, CompileError> {
    let mut statements: Vec<CompiledStatement> = Vec::new();
    // Insertion order keeps statement order deterministic (bridge order).
    let mut signatures: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<Candidate>> = Vec::new();

    for candidate in candidates {
        if candidate.relation.tables().is_empty() {
            if candidate.relation.condition().is_true() {
                statements.push(CompiledStatement::constant(vec![Decoder {
                    condition_label: None,
                    kind: candidate.decoder,
                }]));
            } else {
                // A table-free relation with a live condition cannot be
                // evaluated without a database; nothing can match.
                log::warn!("dropping table-free candidate with non-trivial condition");
            }
            continue;
        }
        let signature = relation_signature(&candidate.relation, &candidate.database);
        match signatures.iter().position(|s| *s == signature) {
            Some(found) => groups[found].push(candidate),
            None => {
                signatures.push(signature);
                groups.push(vec![candidate]);
            }
        }
    }

    for group in groups {
        statements.push(compile_group(group)?);
    }
    Ok(CompiledQuery { statements })
}

fn compile_group(mut group: Vec<Candidate>) -> Result<CompiledStatement, CompileError> {
    let database = Arc::clone(&group[0].database);
    if group.len() == 1 {
        let candidate = group.remove(0);
        let statement = select_statement(&candidate.relation, &database)?;
        let column_index = Arc::new(statement.column_index());
        return Ok(CompiledStatement {
            database: Some(database),
            sql: Some(statement.sql),
            column_index,
            decoders: vec![Decoder {
                condition_label: None,
                kind: candidate.decoder,
            }],
        });
    }

    log::debug!(
        "merging {} condition-variants into one statement",
        group.len()
    );
    let conditions: Vec<Expression> = group
        .iter()
        .map(|c| c.relation.condition().clone())
        .collect();

    let mut projections = group[0].relation.projections().clone();
    let mut labels = Vec::with_capacity(group.len());
    for (index, condition) in conditions.iter().enumerate() {
        let label = format!("cond_{}", index);
        projections.insert(ProjectionSpec::Expr(ExprProjection::with_alias(
            condition.clone(),
            label.clone(),
        )));
        labels.push(label);
    }

    let merged = group[0]
        .relation
        .with_condition(Expression::disjunction(conditions))
        .project(projections);
    let statement = select_statement(&merged, &database)?;
    let column_index = Arc::new(statement.column_index());

    let decoders = labels
        .into_iter()
        .zip(group.into_iter())
        .map(|(label, candidate)| Decoder {
            condition_label: Some(label),
            kind: candidate.decoder,
        })
        .collect();

    Ok(CompiledStatement {
        database: Some(database),
        sql: Some(statement.sql),
        column_index,
        decoders,
    })
}

/// Everything that must coincide for two relations to share one SQL
/// statement — all of the relation except its condition.
fn relation_signature(relation: &Relation, database: &Database) -> String {
    let tables: Vec<String> = relation
        .tables()
        .iter()
        .map(|t| t.qualified_name())
        .collect();
    let joins: Vec<String> = relation.joins().iter().map(|j| j.to_string()).collect();
    let projections: Vec<String> = relation.projections().iter().map(|p| p.label()).collect();
    let aliases: Vec<String> = relation
        .aliases()
        .iter()
        .map(|(a, o)| format!("{}={}", a.qualified_name(), o.qualified_name()))
        .collect();
    format!(
        "{}|{:p}|{}|{}|{}|{}|{}|{:?}",
        database.name(),
        Arc::as_ptr(&database.connection()),
        tables.join(","),
        joins.join(","),
        projections.join(","),
        aliases.join(","),
        relation.is_unique(),
        relation.limit(),
    )
}
