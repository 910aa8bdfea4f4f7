use thiserror::Error;

use crate::algebra::AlgebraError;

/// Mapping-time errors in the node/value layer; raised when the offending
/// fragment is compiled and fatal to that fragment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeMapperError {
    #[error("malformed pattern template `{template}`: {reason}")]
    MalformedPattern { template: String, reason: String },
    #[error("pattern template `{template}` contains no column placeholders")]
    PatternWithoutColumns { template: String },
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
    #[error("invalid regular expression `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("translation table maps `{value}` twice")]
    DuplicateTranslation { value: String },
    #[error("no value translator registered under `{name}`")]
    UnknownTranslator { name: String },
    #[error("invalid language tag `{tag}`")]
    InvalidLanguageTag { tag: String },
}
