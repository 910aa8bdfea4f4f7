//! Cross-occurrence constraints on shared variables.
//!
//! One [`NodeConstraint`] accumulates everything known about a variable
//! from every occurrence's node maker: term kind, fixed value, bare
//! columns, pattern templates, blank node labels. Contradictions surface
//! as impossibility *before* any SQL is generated; satisfiable constraints
//! lower to canonical `col1 = col2` and `col = value` predicates. These
//! objects live for one compilation and are discarded once SQL text
//! exists.

use std::collections::{BTreeMap, BTreeSet};

use oxrdf::vocab::xsd;
use oxrdf::{Term, Variable};

use crate::algebra::{Attribute, Expression};
use crate::node_mapper::{NodeMaker, NodeType, Pattern, SourceShape};

fn node_type_of_term(term: &Term) -> NodeType {
    match term {
        Term::NamedNode(_) => NodeType::Uri,
        Term::BlankNode(_) => NodeType::BlankNode,
        Term::Literal(l) => match l.language() {
            Some(tag) => NodeType::LanguageLiteral(tag.to_ascii_lowercase()),
            None if l.datatype() == xsd::STRING => NodeType::PlainLiteral,
            None => NodeType::TypedLiteral(l.datatype().into_owned()),
        },
    }
}

#[derive(Debug, Default)]
pub struct NodeConstraint {
    impossible: bool,
    fixed: Option<Term>,
    term_kind: Option<NodeType>,
    columns: BTreeSet<Attribute>,
    patterns: Vec<Pattern>,
    blank_label: Option<(String, Vec<Attribute>)>,
    /// Canonically ordered column equalities contributed by positional
    /// pattern / blank-id cross-checks.
    equalities: BTreeSet<(Attribute, Attribute)>,
    /// Every occurrence's maker, kept for fixed-value lowering and for the
    /// executor's decode-time consistency check.
    makers: Vec<NodeMaker>,
}

impl NodeConstraint {
    pub fn new() -> Self {
        NodeConstraint::default()
    }

    pub fn is_impossible(&self) -> bool {
        self.impossible
    }

    pub fn makers(&self) -> &[NodeMaker] {
        &self.makers
    }

    /// Fold one occurrence into the constraint.
    pub fn add_maker(&mut self, maker: &NodeMaker) {
        if self.impossible {
            return;
        }
        self.makers.push(maker.clone());
        match maker.fixed_term() {
            Some(term) => {
                self.limit_to_term(term.clone());
                self.limit_kind(node_type_of_term(term));
            }
            None => {
                if let Some(kind) = maker.node_type() {
                    self.limit_kind(kind.clone());
                }
                match maker.source_shape() {
                    SourceShape::Column(attribute) => {
                        self.columns.insert(attribute.clone());
                    }
                    SourceShape::Pattern(pattern) => self.limit_to_pattern(pattern),
                    SourceShape::BlankNodeId { label, attributes } => {
                        self.limit_to_blank_id(label, attributes)
                    }
                    // Translated sources are not column-transparent; the
                    // executor re-checks decoded terms for equality.
                    SourceShape::Opaque => {}
                }
            }
        }
    }

    fn limit_to_term(&mut self, term: Term) {
        match &self.fixed {
            Some(existing) if *existing != term => self.impossible = true,
            _ => self.fixed = Some(term),
        }
    }

    fn limit_kind(&mut self, kind: NodeType) {
        match &self.term_kind {
            Some(existing) if *existing != kind => self.impossible = true,
            _ => self.term_kind = Some(kind),
        }
    }

    /// Positional cross-check: templates with equal literal skeletons
    /// contribute column equalities slot by slot; differing skeletons mark
    /// the combination impossible (inherited first-match approximation of
    /// the template grammar).
    fn limit_to_pattern(&mut self, pattern: &Pattern) {
        if let Some(previous) = self.patterns.last() {
            match previous.column_equalities_with(pattern) {
                Some(pairs) => {
                    for (a, b) in pairs {
                        if a != b {
                            self.equalities.insert(ordered(a, b));
                        }
                    }
                }
                None => {
                    self.impossible = true;
                    return;
                }
            }
        }
        self.patterns.push(pattern.clone());
    }

    fn limit_to_blank_id(&mut self, label: &str, attributes: &[Attribute]) {
        match &self.blank_label {
            Some((existing_label, existing_attrs)) => {
                if existing_label != label || existing_attrs.len() != attributes.len() {
                    self.impossible = true;
                    return;
                }
                let pairs: Vec<(Attribute, Attribute)> = existing_attrs
                    .iter()
                    .cloned()
                    .zip(attributes.iter().cloned())
                    .collect();
                for (a, b) in pairs {
                    if a != b {
                        self.equalities.insert(ordered(a, b));
                    }
                }
            }
            None => {
                self.blank_label = Some((label.to_string(), attributes.to_vec()));
            }
        }
    }

    /// Lower to SQL predicates: chained equalities over bare columns,
    /// pattern/blank-id slot equalities, and forced `col = value` facts
    /// when the variable is pinned to a concrete term.
    pub fn to_expression(&self) -> Expression {
        if self.impossible {
            return Expression::False;
        }
        let mut parts: Vec<Expression> = Vec::new();

        let columns: Vec<&Attribute> = self.columns.iter().collect();
        for pair in columns.windows(2) {
            parts.push(Expression::attribute_equal(
                pair[0].clone(),
                pair[1].clone(),
            ));
        }
        for (a, b) in &self.equalities {
            parts.push(Expression::attribute_equal(a.clone(), b.clone()));
        }

        if let Some(term) = &self.fixed {
            for maker in &self.makers {
                match maker.column_values(term) {
                    Some(forced) => {
                        for (attribute, value) in forced {
                            parts.push(Expression::attribute_value(attribute, value));
                        }
                    }
                    // An occurrence that cannot produce the pinned term
                    // kills the whole combination.
                    None => return Expression::False,
                }
            }
        }

        Expression::conjunction(parts)
    }
}

/// Per-compilation constraints for every variable of one candidate
/// combination.
#[derive(Debug, Default)]
pub struct VariableConstraints {
    constraints: BTreeMap<Variable, NodeConstraint>,
}

impl VariableConstraints {
    pub fn new() -> Self {
        VariableConstraints::default()
    }

    pub fn add(&mut self, variable: &Variable, maker: &NodeMaker) {
        self.constraints
            .entry(variable.clone())
            .or_default()
            .add_maker(maker);
    }

    pub fn is_impossible(&self) -> bool {
        self.constraints.values().any(|c| c.is_impossible())
    }

    pub fn to_expression(&self) -> Expression {
        Expression::conjunction(
            self.constraints
                .values()
                .map(|c| c.to_expression())
                .collect(),
        )
    }

    /// Every variable with all of its occurrence makers, for binding
    /// decoders.
    pub fn binding_makers(&self) -> Vec<(Variable, Vec<NodeMaker>)> {
        self.constraints
            .iter()
            .map(|(v, c)| (v.clone(), c.makers().to_vec()))
            .collect()
    }
}

fn ordered(a: Attribute, b: Attribute) -> (Attribute, Attribute) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
