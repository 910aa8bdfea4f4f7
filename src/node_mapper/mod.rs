//! Node and value mapping.
//!
//! The bidirectional layer between database rows and graph terms: value
//! sources compose columns, pattern templates, and translations into
//! lexical forms; node makers wrap them into URIs, literals, and blank
//! nodes, and answer feasibility checks (`could_fit`) without touching the
//! database.

pub mod errors;
pub mod node_maker;
pub mod pattern;
pub mod translator;
pub mod value_source;

pub use errors::NodeMapperError;
pub use node_maker::{NodeMaker, NodeType};
pub use pattern::Pattern;
pub use translator::{
    register_translator, resolve_translator, IdentityTranslator, TranslationTable,
    UrlEncodeTranslator, ValueTranslator,
};
pub use value_source::{
    BlankNodeIdSource, ColumnSource, PatternSource, RestrictedSource, Restriction, SourceShape,
    TranslatingSource, ValueSource,
};
