//! Node makers: graph terms from rows, and feasibility checks for terms.

use std::collections::BTreeSet;
use std::sync::Arc;

use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode, Term};

use crate::algebra::{Attribute, ProjectionSpec, Renamer};
use crate::database::ResultRow;

use super::errors::NodeMapperError;
use super::value_source::{SourceShape, ValueSource};

/// The kind of term a maker produces from its value source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Uri,
    BlankNode,
    PlainLiteral,
    /// Lowercased language tag.
    LanguageLiteral(String),
    TypedLiteral(NamedNode),
}

impl NodeType {
    /// The lexical form of `term`, when the term's shape matches this
    /// type; `None` otherwise.
    pub fn lexical_of(&self, term: &Term) -> Option<String> {
        match (self, term) {
            (NodeType::Uri, Term::NamedNode(n)) => Some(n.as_str().to_string()),
            (NodeType::BlankNode, Term::BlankNode(b)) => Some(b.as_str().to_string()),
            (NodeType::PlainLiteral, Term::Literal(l)) => {
                if l.language().is_none() && l.datatype() == xsd::STRING {
                    Some(l.value().to_string())
                } else {
                    None
                }
            }
            (NodeType::LanguageLiteral(lang), Term::Literal(l)) => {
                match l.language() {
                    Some(tag) if tag.eq_ignore_ascii_case(lang) => Some(l.value().to_string()),
                    _ => None,
                }
            }
            (NodeType::TypedLiteral(datatype), Term::Literal(l)) => {
                if l.language().is_none() && l.datatype() == datatype.as_ref() {
                    Some(l.value().to_string())
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Builds one graph term per result row, and answers — without any
/// database access — whether a concrete term could originate here.
#[derive(Debug, Clone)]
pub enum NodeMaker {
    /// Always the same term; no columns involved.
    Fixed(Term),
    Typed {
        node_type: NodeType,
        source: Arc<dyn ValueSource>,
        /// Whether distinct rows are known to produce distinct terms.
        unique: bool,
    },
}

impl NodeMaker {
    pub fn fixed(term: impl Into<Term>) -> NodeMaker {
        NodeMaker::Fixed(term.into())
    }

    pub fn uri(source: Arc<dyn ValueSource>, unique: bool) -> NodeMaker {
        NodeMaker::Typed {
            node_type: NodeType::Uri,
            source,
            unique,
        }
    }

    pub fn blank(source: Arc<dyn ValueSource>, unique: bool) -> NodeMaker {
        NodeMaker::Typed {
            node_type: NodeType::BlankNode,
            source,
            unique,
        }
    }

    pub fn plain_literal(source: Arc<dyn ValueSource>, unique: bool) -> NodeMaker {
        NodeMaker::Typed {
            node_type: NodeType::PlainLiteral,
            source,
            unique,
        }
    }

    pub fn language_literal(
        source: Arc<dyn ValueSource>,
        tag: &str,
        unique: bool,
    ) -> Result<NodeMaker, NodeMapperError> {
        // Validate the tag once, eagerly; production then uses the
        // unchecked constructor.
        Literal::new_language_tagged_literal("", tag).map_err(|_| {
            NodeMapperError::InvalidLanguageTag {
                tag: tag.to_string(),
            }
        })?;
        Ok(NodeMaker::Typed {
            node_type: NodeType::LanguageLiteral(tag.to_ascii_lowercase()),
            source,
            unique,
        })
    }

    pub fn typed_literal(
        source: Arc<dyn ValueSource>,
        datatype: NamedNode,
        unique: bool,
    ) -> NodeMaker {
        NodeMaker::Typed {
            node_type: NodeType::TypedLiteral(datatype),
            source,
            unique,
        }
    }

    pub fn is_unique(&self) -> bool {
        match self {
            NodeMaker::Fixed(_) => true,
            NodeMaker::Typed { unique, .. } => *unique,
        }
    }

    pub fn fixed_term(&self) -> Option<&Term> {
        match self {
            NodeMaker::Fixed(t) => Some(t),
            NodeMaker::Typed { .. } => None,
        }
    }

    pub fn node_type(&self) -> Option<&NodeType> {
        match self {
            NodeMaker::Fixed(_) => None,
            NodeMaker::Typed { node_type, .. } => Some(node_type),
        }
    }

    pub fn source_shape(&self) -> SourceShape<'_> {
        match self {
            NodeMaker::Fixed(_) => SourceShape::Opaque,
            NodeMaker::Typed { source, .. } => source.shape(),
        }
    }

    /// Database-free feasibility: could `term` have been produced by this
    /// maker?
    pub fn could_fit(&self, term: &Term) -> bool {
        match self {
            NodeMaker::Fixed(fixed) => fixed == term,
            NodeMaker::Typed {
                node_type, source, ..
            } => match node_type.lexical_of(term) {
                Some(lexical) => source.could_fit(&lexical),
                None => false,
            },
        }
    }

    /// The column assignments forced by binding this maker to `term`;
    /// `None` when the term cannot originate here. An empty list is a
    /// successful, constraint-free fit (fixed makers).
    pub fn column_values(&self, term: &Term) -> Option<Vec<(Attribute, String)>> {
        match self {
            NodeMaker::Fixed(fixed) => {
                if fixed == term {
                    Some(Vec::new())
                } else {
                    None
                }
            }
            NodeMaker::Typed {
                node_type, source, ..
            } => {
                let lexical = node_type.lexical_of(term)?;
                source.column_values(&lexical)
            }
        }
    }

    /// Build the concrete term from a decoded row. A NULL in any required
    /// column yields `None`; so does a lexical form that is not a valid
    /// term of the configured kind.
    pub fn make_node(&self, row: &ResultRow) -> Option<Term> {
        match self {
            NodeMaker::Fixed(term) => Some(term.clone()),
            NodeMaker::Typed {
                node_type, source, ..
            } => {
                let value = source.make_value(row)?;
                match node_type {
                    NodeType::Uri => match NamedNode::new(&value) {
                        Ok(n) => Some(Term::NamedNode(n)),
                        Err(_) => {
                            log::warn!("row produced invalid IRI {:?}, dropping term", value);
                            None
                        }
                    },
                    // Identifiers carry `:` and `|`; they are compared
                    // within one query, not serialized as Turtle.
                    NodeType::BlankNode => {
                        Some(Term::BlankNode(BlankNode::new_unchecked(value)))
                    }
                    NodeType::PlainLiteral => {
                        Some(Term::Literal(Literal::new_simple_literal(value)))
                    }
                    NodeType::LanguageLiteral(tag) => Some(Term::Literal(
                        Literal::new_language_tagged_literal_unchecked(value, tag.clone()),
                    )),
                    NodeType::TypedLiteral(datatype) => Some(Term::Literal(
                        Literal::new_typed_literal(value, datatype.clone()),
                    )),
                }
            }
        }
    }

    pub fn required_attributes(&self) -> Vec<Attribute> {
        match self {
            NodeMaker::Fixed(_) => Vec::new(),
            NodeMaker::Typed { source, .. } => source.required_attributes(),
        }
    }

    pub fn projections(&self) -> BTreeSet<ProjectionSpec> {
        self.required_attributes()
            .into_iter()
            .map(ProjectionSpec::attribute)
            .collect()
    }

    pub fn renamed(&self, renamer: &Renamer) -> NodeMaker {
        match self {
            NodeMaker::Fixed(term) => NodeMaker::Fixed(term.clone()),
            NodeMaker::Typed {
                node_type,
                source,
                unique,
            } => NodeMaker::Typed {
                node_type: node_type.clone(),
                source: source.renamed(renamer),
                unique: *unique,
            },
        }
    }
}
