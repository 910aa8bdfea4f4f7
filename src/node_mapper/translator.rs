//! Value translation between database values and graph lexical forms.
//!
//! Translators are a closed set resolved by name from a process-wide
//! registry once, when a mapping is constructed; callers plug custom
//! translations in through the [`ValueTranslator`] trait instead of any
//! runtime class loading.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use super::errors::NodeMapperError;

/// Bidirectional value translation. `None` means "this value has no
/// counterpart", which prunes a candidate (toward the database) or drops a
/// row (toward the graph).
pub trait ValueTranslator: fmt::Debug + Send + Sync {
    fn to_rdf(&self, db_value: &str) -> Option<String>;
    fn to_db(&self, rdf_value: &str) -> Option<String>;
}

/// The do-nothing translation.
#[derive(Debug, Clone, Copy)]
pub struct IdentityTranslator;

impl ValueTranslator for IdentityTranslator {
    fn to_rdf(&self, db_value: &str) -> Option<String> {
        Some(db_value.to_string())
    }

    fn to_db(&self, rdf_value: &str) -> Option<String> {
        Some(rdf_value.to_string())
    }
}

/// Percent-encoding for database values embedded into URIs.
#[derive(Debug, Clone, Copy)]
pub struct UrlEncodeTranslator;

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

impl ValueTranslator for UrlEncodeTranslator {
    fn to_rdf(&self, db_value: &str) -> Option<String> {
        let mut out = String::with_capacity(db_value.len());
        for b in db_value.bytes() {
            if is_unreserved(b) {
                out.push(b as char);
            } else {
                out.push_str(&format!("%{:02X}", b));
            }
        }
        Some(out)
    }

    fn to_db(&self, rdf_value: &str) -> Option<String> {
        let bytes = rdf_value.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' {
                let hex = rdf_value.get(i + 1..i + 3)?;
                let byte = u8::from_str_radix(hex, 16).ok()?;
                out.push(byte);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        String::from_utf8(out).ok()
    }
}

/// Table-driven translation: an explicit bijection between database values
/// and graph values. Duplicate entries on either side are a mapping error,
/// raised eagerly at construction.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    to_rdf: HashMap<String, String>,
    to_db: HashMap<String, String>,
}

impl TranslationTable {
    pub fn new<I>(pairs: I) -> Result<Self, NodeMapperError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = TranslationTable::default();
        for (db_value, rdf_value) in pairs {
            if table.to_rdf.contains_key(&db_value) {
                return Err(NodeMapperError::DuplicateTranslation { value: db_value });
            }
            if table.to_db.contains_key(&rdf_value) {
                return Err(NodeMapperError::DuplicateTranslation { value: rdf_value });
            }
            table.to_rdf.insert(db_value.clone(), rdf_value.clone());
            table.to_db.insert(rdf_value, db_value);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.to_rdf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_rdf.is_empty()
    }
}

impl ValueTranslator for TranslationTable {
    fn to_rdf(&self, db_value: &str) -> Option<String> {
        self.to_rdf.get(db_value).cloned()
    }

    fn to_db(&self, rdf_value: &str) -> Option<String> {
        self.to_db.get(rdf_value).cloned()
    }
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, Arc<dyn ValueTranslator>>> = {
        let mut builtins: HashMap<String, Arc<dyn ValueTranslator>> = HashMap::new();
        builtins.insert("identity".to_string(), Arc::new(IdentityTranslator));
        builtins.insert("url_encode".to_string(), Arc::new(UrlEncodeTranslator));
        RwLock::new(builtins)
    };
}

/// Register a caller-supplied translator under a name. Later registrations
/// shadow earlier ones.
pub fn register_translator(name: &str, translator: Arc<dyn ValueTranslator>) {
    if let Ok(mut registry) = REGISTRY.write() {
        registry.insert(name.to_string(), translator);
    }
}

/// Resolve a translator by name; mapping construction calls this once per
/// declared translation and fails the fragment on unknown names.
pub fn resolve_translator(name: &str) -> Result<Arc<dyn ValueTranslator>, NodeMapperError> {
    REGISTRY
        .read()
        .ok()
        .and_then(|registry| registry.get(name).cloned())
        .ok_or_else(|| NodeMapperError::UnknownTranslator {
            name: name.to_string(),
        })
}
