//! Error types for schema loading, collation and filtering

use crate::types::FieldType;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a schema file.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to read schema {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// A schema-structural problem with one atom.
///
/// These are recoverable: the atom is skipped and collation continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("atom {atom} ({code}): {kind}")]
pub struct CollationError {
    pub atom: String,
    pub code: i32,
    pub kind: CollationErrorKind,
}

impl CollationError {
    pub fn new(atom: impl Into<String>, code: i32, kind: CollationErrorKind) -> Self {
        Self {
            atom: atom.into(),
            code,
            kind,
        }
    }
}

/// What was wrong with an atom.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollationErrorKind {
    #[error("duplicate atom code {code}, already used by {existing}")]
    DuplicateCode { code: i32, existing: String },

    #[error("message type {0} is not defined in the schema")]
    UnknownMessage(String),

    #[error("field {field}: unsupported type ({detail})")]
    UnsupportedType { field: String, detail: String },

    #[error("field {field}: expected field number {expected}, found {found}")]
    NonConsecutiveFieldNumber {
        field: String,
        expected: i32,
        found: i32,
    },

    #[error("field {field}: attribution chain must be the first field, found at position {position}")]
    AttributionChainNotFirst { field: String, position: usize },

    #[error("field {field}: key value pairs must be the last field, found at position {position}")]
    KeyValuePairsNotLast { field: String, position: usize },

    #[error("more than one {0} field")]
    DuplicateSpecialField(FieldType),

    #[error("field {field}: is_uid is only allowed on int32 fields, not {ty}")]
    UidFieldNotInt { field: String, ty: FieldType },

    #[error("more than one is_uid field")]
    MultipleUidFields,

    #[error("field {field}: state fields must be scalars, not {ty}")]
    StateFieldNotScalar { field: String, ty: FieldType },

    #[error("more than one exclusive state field")]
    MultipleExclusiveFields,

    #[error("primary fields declared without an exclusive state field")]
    PrimaryFieldWithoutExclusive,

    #[error("state annotations without any primary or exclusive field")]
    StateWithoutPrimaryOrExclusive,

    #[error("field {0}: primary_field_first_uid is only allowed on the attribution chain")]
    FirstUidNotOnAttributionChain(String),

    #[error("attribution node must start with an int32 uid and end with a string tag")]
    InvalidAttributionNode,
}

/// Failure of the module filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No atom is tagged with the requested module, usually a typo.
    #[error("no atoms belong to module '{0}'")]
    EmptyModule(String),
}
