//! Atom Collator
//!
//! Walks the container entries of an [`AtomSchema`], builds one [`AtomDecl`]
//! per atom, validates it and groups the survivors into signature buckets.
//!
//! Errors are per atom: a rejected atom is logged and skipped, and the
//! collator keeps going so a single run reports every problem in the schema.
//! Callers must treat a non-zero [`Collation::error_count`] as fatal for code
//! generation.

use crate::annotation::{
    has_flag, Annotation, AnnotationId, AnnotationRegistry, AnnotationSet, AnnotationValue,
    ATOM_ID_FIELD_NUMBER,
};
use crate::atoms::{AtomDecl, AtomField, AtomKind, Atoms, FIRST_UID_IN_CHAIN};
use crate::error::{CollationError, CollationErrorKind};
use crate::schema::{AtomEntry, AtomSchema, SchemaMessage, WellKnownTypes, ONEOF_PULLED_ATOM_NAME};
use crate::type_map::map_field_type;
use crate::types::FieldType;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Result of collating one schema.
#[derive(Debug, Clone)]
pub struct Collation {
    pub atoms: Atoms,
    /// Nested schema of attribution-chain fields, shared by every atom.
    pub attribution_decl: AtomDecl,
    pub errors: Vec<CollationError>,
}

impl Collation {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Collates schemas using a shared annotation registry.
#[derive(Debug, Clone, Copy)]
pub struct Collator<'a> {
    registry: &'a AnnotationRegistry,
}

impl<'a> Collator<'a> {
    pub fn new(registry: &'a AnnotationRegistry) -> Self {
        Self { registry }
    }

    /// Collate every atom of a schema.
    pub fn collate(&self, schema: &AtomSchema) -> Collation {
        let mut errors = Vec::new();
        let mut decls = Vec::new();
        // every code seen, valid or not, so duplicates of a rejected atom are still caught
        let mut seen: BTreeMap<i32, &str> = BTreeMap::new();

        for entry in &schema.entries {
            if let Some(existing) = seen.get(&entry.code) {
                let kind = CollationErrorKind::DuplicateCode {
                    code: entry.code,
                    existing: (*existing).to_string(),
                };
                errors.push(reject(entry, kind));
                continue;
            }
            seen.insert(entry.code, &entry.name);

            match self.collate_entry(entry, schema) {
                Ok(decl) => {
                    debug!(
                        atom = %decl.name,
                        code = decl.code,
                        signature = %decl.signature(),
                        "collated atom"
                    );
                    decls.push(decl);
                }
                Err(kind) => errors.push(reject(entry, kind)),
            }
        }

        let attribution_decl = match self.collate_attribution(schema) {
            Ok(decl) => decl,
            Err(e) => {
                error!(error = %e, "invalid attribution node, using the built-in shape");
                errors.push(e);
                builtin_attribution_decl()
            }
        };

        let atoms = Atoms::from_decls(decls);
        info!(
            atoms = atoms.len(),
            pushed_signatures = atoms.signatures.len(),
            pulled_signatures = atoms.pulled_signatures.len(),
            errors = errors.len(),
            "collation finished"
        );

        Collation {
            atoms,
            attribution_decl,
            errors,
        }
    }

    /// Collate the attribution node message, or return the built-in shape
    /// when the schema does not define one.
    pub fn collate_attribution(&self, schema: &AtomSchema) -> Result<AtomDecl, CollationError> {
        let Some(message) = schema.message(&schema.well_known.attribution_node) else {
            return Ok(builtin_attribution_decl());
        };

        let mut decl = AtomDecl::new(0, message.name.clone());
        decl.message = message.name.clone();
        let fail = |kind| CollationError::new(message.name.clone(), 0, kind);

        self.collate_fields(message, &schema.well_known, &mut decl)
            .map_err(fail)?;

        let first = decl.fields.first().map(|f| f.ty);
        let last = decl.fields.last().map(|f| f.ty);
        if decl.fields.len() < 2
            || first != Some(FieldType::Int32)
            || last != Some(FieldType::String)
        {
            return Err(fail(CollationErrorKind::InvalidAttributionNode));
        }
        Ok(decl)
    }

    fn collate_entry(
        &self,
        entry: &AtomEntry,
        schema: &AtomSchema,
    ) -> Result<AtomDecl, CollationErrorKind> {
        let message = schema
            .message(&entry.message)
            .ok_or_else(|| CollationErrorKind::UnknownMessage(entry.message.clone()))?;

        let mut decl = AtomDecl::new(entry.code, entry.name.clone());
        decl.message = message.name.clone();
        decl.doc = message.doc.clone();
        decl.kind = if entry.oneof == ONEOF_PULLED_ATOM_NAME {
            AtomKind::Pulled
        } else {
            AtomKind::Pushed
        };

        let atom_options = self.registry.extract_atom_options(&entry.options);
        decl.truncate_timestamp =
            has_flag(&atom_options.annotations, AnnotationId::TruncateTimestamp);
        decl.whitelisted = atom_options.allow_from_any_uid;
        decl.modules = atom_options.modules;
        if !atom_options.annotations.is_empty() {
            decl.annotations
                .insert(ATOM_ID_FIELD_NUMBER, atom_options.annotations);
        }

        let tag_field = self.collate_fields(message, &schema.well_known, &mut decl)?;

        decl.non_chained = decl.kind == AtomKind::Pushed
            && decl.uid_field == Some(1)
            && tag_field == Some(2)
            && decl.field(1).map(|f| f.ty) == Some(FieldType::Int32)
            && decl.field(2).map(|f| f.ty) == Some(FieldType::String);

        Ok(decl)
    }

    /// Map, validate and annotate the fields of a message into `decl`.
    ///
    /// Returns the field number marked as an attribution tag, if any.
    fn collate_fields(
        &self,
        message: &SchemaMessage,
        well_known: &WellKnownTypes,
        decl: &mut AtomDecl,
    ) -> Result<Option<i32>, CollationErrorKind> {
        let mut fields: Vec<_> = message.fields.iter().collect();
        fields.sort_by_key(|f| f.number);
        let field_count = fields.len();

        let mut seen_chain = false;
        let mut seen_pairs = false;
        let mut tag_field = None;

        for (index, field) in fields.into_iter().enumerate() {
            let expected = i32::try_from(index + 1).unwrap_or(i32::MAX);
            if field.number != expected {
                return Err(CollationErrorKind::NonConsecutiveFieldNumber {
                    field: field.name.clone(),
                    expected,
                    found: field.number,
                });
            }
            let number = field.number;

            let options = self.registry.extract_field_options(&field.options);
            let ty = map_field_type(field, well_known, options.log_as_bytes())?;

            match ty {
                FieldType::AttributionChain => {
                    if seen_chain {
                        return Err(CollationErrorKind::DuplicateSpecialField(ty));
                    }
                    seen_chain = true;
                    if index != 0 {
                        return Err(CollationErrorKind::AttributionChainNotFirst {
                            field: field.name.clone(),
                            position: index + 1,
                        });
                    }
                }
                FieldType::KeyValuePairs => {
                    if seen_pairs {
                        return Err(CollationErrorKind::DuplicateSpecialField(ty));
                    }
                    seen_pairs = true;
                    if index + 1 != field_count {
                        return Err(CollationErrorKind::KeyValuePairsNotLast {
                            field: field.name.clone(),
                            position: index + 1,
                        });
                    }
                }
                FieldType::ByteArray => decl.binary_fields.push(number),
                _ => {}
            }

            if options.attribution_tag {
                if ty == FieldType::String {
                    tag_field = Some(number);
                } else {
                    debug!(
                        field = %field.name,
                        %ty,
                        "attribution_tag on a non-string field, ignoring"
                    );
                }
            }

            apply_field_annotations(decl, &field.name, number, ty, &options.annotations)?;

            let mut atom_field = AtomField::new(field.name.clone(), ty);
            if ty.is_enum() {
                atom_field.enum_values = field
                    .enum_values
                    .iter()
                    .map(|v| (v.number, v.name.clone()))
                    .collect();
            }
            decl.fields.push(atom_field);

            if !options.annotations.is_empty() {
                decl.annotations.insert(number, options.annotations);
            }
        }

        validate_state(decl)?;
        Ok(tag_field)
    }
}

/// Derive uid and state data from one field's annotations.
fn apply_field_annotations(
    decl: &mut AtomDecl,
    name: &str,
    number: i32,
    ty: FieldType,
    annotations: &AnnotationSet,
) -> Result<(), CollationErrorKind> {
    for annotation in annotations {
        match (annotation.id, annotation.value) {
            (AnnotationId::IsUid, _) => {
                if !matches!(ty, FieldType::Int32 | FieldType::Int32Array) {
                    return Err(CollationErrorKind::UidFieldNotInt {
                        field: name.to_string(),
                        ty,
                    });
                }
                if decl.uid_field.is_some() {
                    return Err(CollationErrorKind::MultipleUidFields);
                }
                decl.uid_field = Some(number);
            }
            (AnnotationId::PrimaryField, _) => {
                require_scalar(name, ty)?;
                decl.primary_fields.push(number);
            }
            (AnnotationId::ExclusiveState, _) => {
                require_scalar(name, ty)?;
                if decl.exclusive_field.is_some() {
                    return Err(CollationErrorKind::MultipleExclusiveFields);
                }
                decl.exclusive_field = Some(number);
            }
            (AnnotationId::PrimaryFieldFirstUid, _) => {
                if ty != FieldType::AttributionChain {
                    return Err(CollationErrorKind::FirstUidNotOnAttributionChain(
                        name.to_string(),
                    ));
                }
                decl.primary_fields.push(FIRST_UID_IN_CHAIN);
            }
            (AnnotationId::DefaultState, AnnotationValue::Int(value)) => {
                decl.default_state = Some(value);
            }
            (AnnotationId::TriggerStateReset, AnnotationValue::Int(value)) => {
                decl.trigger_state_reset = Some(value);
            }
            (AnnotationId::StateNested, _) => decl.nested = true,
            _ => {}
        }
    }
    Ok(())
}

fn require_scalar(name: &str, ty: FieldType) -> Result<(), CollationErrorKind> {
    let scalar = !ty.is_array()
        && !matches!(
            ty,
            FieldType::AttributionChain | FieldType::KeyValuePairs | FieldType::ByteArray
        );
    if scalar {
        Ok(())
    } else {
        Err(CollationErrorKind::StateFieldNotScalar {
            field: name.to_string(),
            ty,
        })
    }
}

fn validate_state(decl: &AtomDecl) -> Result<(), CollationErrorKind> {
    if !decl.primary_fields.is_empty() && decl.exclusive_field.is_none() {
        return Err(CollationErrorKind::PrimaryFieldWithoutExclusive);
    }

    let has_state_hints =
        decl.default_state.is_some() || decl.trigger_state_reset.is_some() || decl.nested;
    if has_state_hints && !decl.is_state_atom() {
        return Err(CollationErrorKind::StateWithoutPrimaryOrExclusive);
    }

    if decl.default_state.is_some() != decl.trigger_state_reset.is_some() {
        warn!(
            atom = %decl.name,
            default_state = ?decl.default_state,
            trigger_state_reset = ?decl.trigger_state_reset,
            "default state and reset value should be set together, no reset logic will be generated"
        );
    }
    Ok(())
}

fn reject(entry: &AtomEntry, kind: CollationErrorKind) -> CollationError {
    let error = CollationError::new(entry.name.clone(), entry.code, kind);
    error!(error = %error, "rejecting atom");
    error
}

/// The standard attribution node: an int32 uid and a string tag.
pub fn builtin_attribution_decl() -> AtomDecl {
    let mut decl = AtomDecl::new(0, "AttributionNode");
    decl.message = "AttributionNode".to_string();
    decl.fields = vec![
        AtomField::new("uid", FieldType::Int32),
        AtomField::new("tag", FieldType::String),
    ];
    decl.uid_field = Some(1);
    decl.annotations.insert(
        1,
        [Annotation::bool(AnnotationId::IsUid, true)]
            .into_iter()
            .collect(),
    );
    decl
}
