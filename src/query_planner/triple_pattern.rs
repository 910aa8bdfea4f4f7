//! Query input: triple patterns over constants, variables, and wildcards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use oxrdf::{BlankNode, Literal, NamedNode, Term, Variable};

use crate::mapping::TriplePosition;

/// One slot of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    /// A concrete term that results must match exactly.
    Fixed(Term),
    /// A named variable; recurring names bind consistently across the
    /// conjunction.
    Variable(Variable),
    /// Matches anything, binds nothing.
    Any,
}

impl PatternNode {
    pub fn term(&self) -> Option<&Term> {
        match self {
            PatternNode::Fixed(t) => Some(t),
            _ => None,
        }
    }

    pub fn variable(&self) -> Option<&Variable> {
        match self {
            PatternNode::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, PatternNode::Fixed(_))
    }
}

impl From<Term> for PatternNode {
    fn from(term: Term) -> Self {
        PatternNode::Fixed(term)
    }
}

impl From<NamedNode> for PatternNode {
    fn from(node: NamedNode) -> Self {
        PatternNode::Fixed(Term::NamedNode(node))
    }
}

impl From<BlankNode> for PatternNode {
    fn from(node: BlankNode) -> Self {
        PatternNode::Fixed(Term::BlankNode(node))
    }
}

impl From<Literal> for PatternNode {
    fn from(literal: Literal) -> Self {
        PatternNode::Fixed(Term::Literal(literal))
    }
}

impl From<Variable> for PatternNode {
    fn from(variable: Variable) -> Self {
        PatternNode::Variable(variable)
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternNode::Fixed(t) => write!(f, "{}", t),
            PatternNode::Variable(v) => write!(f, "{}", v),
            PatternNode::Any => write!(f, "?"),
        }
    }
}

/// A subject/predicate/object template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternNode,
    pub predicate: PatternNode,
    pub object: PatternNode,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<PatternNode>,
        predicate: impl Into<PatternNode>,
        object: impl Into<PatternNode>,
    ) -> Self {
        TriplePattern {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn node(&self, position: TriplePosition) -> &PatternNode {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = (TriplePosition, &PatternNode)> {
        TriplePosition::ALL.iter().map(|p| (*p, self.node(*p)))
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.nodes().filter_map(|(_, n)| n.variable())
    }

    /// Canonical text of the match request, used as the result-cache key.
    pub fn cache_key(&self) -> String {
        format!("{} {} {}", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// A row of variable bindings.
pub type Binding = BTreeMap<Variable, Term>;

/// A post-join boolean condition over bindings. Returning `None` means
/// "not fully bound here" — the row passes through for the consuming
/// engine to judge.
pub trait BindingFilter: fmt::Debug + Send + Sync {
    fn evaluate(&self, binding: &Binding) -> Option<bool>;
}

/// A conjunction of triple patterns with optional post-join filters and a
/// row limit.
#[derive(Debug, Clone, Default)]
pub struct GraphPattern {
    pub patterns: Vec<TriplePattern>,
    pub filters: Vec<Arc<dyn BindingFilter>>,
    pub limit: Option<u64>,
}

impl GraphPattern {
    pub fn new(patterns: Vec<TriplePattern>) -> Self {
        GraphPattern {
            patterns,
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn BindingFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Variables occurring in two or more of the conjunction's 3N node
    /// slots, whose occurrences must bind consistently.
    pub fn shared_variables(&self) -> Vec<Variable> {
        let mut counts: BTreeMap<&Variable, usize> = BTreeMap::new();
        for pattern in &self.patterns {
            for variable in pattern.variables() {
                *counts.entry(variable).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n >= 2)
            .map(|(v, _)| v.clone())
            .collect()
    }
}
