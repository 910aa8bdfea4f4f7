//! Compiled statements and row decoders.

use std::collections::HashMap;
use std::sync::Arc;

use oxrdf::{NamedNode, Subject, Term, Triple, Variable};

use crate::database::{Database, ResultRow};
use crate::node_mapper::NodeMaker;

use super::triple_pattern::Binding;

/// The output of one compilation: zero or more statements whose decoded
/// rows are exactly the answer set. Zero statements means the request was
/// proven unsatisfiable without touching the database.
#[derive(Debug, Default)]
pub struct CompiledQuery {
    pub statements: Vec<CompiledStatement>,
}

impl CompiledQuery {
    pub fn empty() -> Self {
        CompiledQuery::default()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// One executable unit. `sql: None` marks a constant statement — a bridge
/// made entirely of fixed terms, decoded against a single empty pseudo-row
/// with no database contact.
#[derive(Debug)]
pub struct CompiledStatement {
    pub database: Option<Arc<Database>>,
    pub sql: Option<String>,
    /// SELECT-list label → row position, shared by all rows.
    pub column_index: Arc<HashMap<String, usize>>,
    pub decoders: Vec<Decoder>,
}

impl CompiledStatement {
    pub fn constant(decoders: Vec<Decoder>) -> Self {
        CompiledStatement {
            database: None,
            sql: None,
            column_index: Arc::new(HashMap::new()),
            decoders,
        }
    }
}

/// Decodes one row into zero or one result, gated — in union-merged
/// statements — by a boolean condition column.
#[derive(Debug)]
pub struct Decoder {
    pub condition_label: Option<String>,
    pub kind: DecoderKind,
}

#[derive(Debug)]
pub enum DecoderKind {
    /// One triple per row, from the three slot makers.
    Triple {
        subject: NodeMaker,
        predicate: NodeMaker,
        object: NodeMaker,
    },
    /// One binding row per row; every occurrence of a variable must decode
    /// to the same term, which also backstops constraints that could not
    /// be expressed in SQL (translated sources).
    Binding {
        variables: Vec<(Variable, Vec<NodeMaker>)>,
    },
}

impl Decoder {
    pub fn triple(subject: NodeMaker, predicate: NodeMaker, object: NodeMaker) -> Decoder {
        Decoder {
            condition_label: None,
            kind: DecoderKind::Triple {
                subject,
                predicate,
                object,
            },
        }
    }

    pub fn binding(variables: Vec<(Variable, Vec<NodeMaker>)>) -> Decoder {
        Decoder {
            condition_label: None,
            kind: DecoderKind::Binding { variables },
        }
    }

    /// Whether this decoder applies to `row` (condition column true, or no
    /// gate at all).
    pub fn enabled(&self, row: &ResultRow) -> bool {
        match &self.condition_label {
            None => true,
            Some(label) => row.value(label).map(|v| v.is_true()).unwrap_or(false),
        }
    }

    pub fn decode_triple(&self, row: &ResultRow) -> Option<Triple> {
        match &self.kind {
            DecoderKind::Triple {
                subject,
                predicate,
                object,
            } => {
                let s = subject.make_node(row)?;
                let p = predicate.make_node(row)?;
                let o = object.make_node(row)?;
                Some(Triple::new(as_subject(s)?, as_predicate(p)?, o))
            }
            DecoderKind::Binding { .. } => None,
        }
    }

    pub fn decode_binding(&self, row: &ResultRow) -> Option<Binding> {
        match &self.kind {
            DecoderKind::Binding { variables } => {
                let mut binding = Binding::new();
                for (variable, makers) in variables {
                    let mut term: Option<Term> = None;
                    for maker in makers {
                        let decoded = maker.make_node(row)?;
                        match &term {
                            Some(existing) if *existing != decoded => return None,
                            _ => term = Some(decoded),
                        }
                    }
                    binding.insert(variable.clone(), term?);
                }
                Some(binding)
            }
            DecoderKind::Triple { .. } => None,
        }
    }
}

fn as_subject(term: Term) -> Option<Subject> {
    match term {
        Term::NamedNode(n) => Some(Subject::NamedNode(n)),
        Term::BlankNode(b) => Some(Subject::BlankNode(b)),
        other => {
            log::warn!("decoded subject {} is not a resource, dropping triple", other);
            None
        }
    }
}

fn as_predicate(term: Term) -> Option<NamedNode> {
    match term {
        Term::NamedNode(n) => Some(n),
        other => {
            log::warn!("decoded predicate {} is not an IRI, dropping triple", other);
            None
        }
    }
}
