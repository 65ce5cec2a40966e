//! atomgen-core - Atom schema collation and signature deduplication
//!
//! This crate turns an atom schema into the model code generators print from:
//! - [`AtomSchema`] is the language-neutral input model
//! - [`AnnotationRegistry`] interprets custom field and atom options
//! - [`Collator`] validates atoms and groups them by [`Signature`]
//! - [`filter_atoms`] restricts the result to one output module

pub mod annotation;
pub mod atoms;
pub mod collation;
mod error;
pub mod filter;
pub mod schema;
pub mod type_map;
mod types;

pub use annotation::{
    Annotation, AnnotationId, AnnotationRegistry, AnnotationSet, AnnotationValue,
    FieldNumberToAnnotations, StateReset,
};
pub use atoms::{AtomDecl, AtomField, AtomKind, Atoms, SignatureInfo, SignatureInfoMap};
pub use collation::{Collation, Collator};
pub use error::{CollationError, CollationErrorKind, FilterError, SchemaError};
pub use filter::{filter_atoms, ModuleFilter, DEFAULT_MODULE_NAME};
pub use schema::AtomSchema;
pub use types::{FieldType, Signature};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        filter_atoms, AnnotationId, AnnotationRegistry, AtomDecl, AtomKind, AtomSchema, Atoms,
        Collation, Collator, FieldType, ModuleFilter, Signature,
    };
}

#[cfg(test)]
mod lib_tests;
