//! Source emitters
//!
//! Each emitter turns the collated (and module-filtered) [`Atoms`] into the
//! text of one output file:
//!
//! ```text
//! Atoms + attribution decl + AnnotationRegistry
//!     ↓
//!  ├─→ [native] → statslog.h, statslog.cpp
//!  ├─→ [java]   → StatsLogInternal.java
//!  ├─→ [jni]    → stats_log_jni.cpp (registration only)
//!  └─→ [rust]   → statslog.rs
//! ```
//!
//! Emitters only render into `String`s; writing files is the caller's job, so
//! a failure in one output never leaves another half-written. Types a target
//! cannot express are reported through [`TargetLanguage::supports_type`] and
//! skipped with a warning.

pub mod java;
pub mod jni;
pub mod naming;
pub mod native;
pub mod rust;

use atomgen_core::annotation::{StateReset, ATOM_ID_FIELD_NUMBER};
use atomgen_core::{
    AnnotationId, AnnotationRegistry, AnnotationValue, AtomDecl, Atoms, FieldType, ModuleFilter,
    Signature, SignatureInfo, SignatureInfoMap,
};
use naming::make_constant_name;
use tracing::warn;

/// First line of every generated file.
pub const AUTOGENERATED_BANNER: &str = "// This file is autogenerated\n";

/// Capabilities of an output language.
pub trait TargetLanguage {
    fn name(&self) -> &'static str;

    fn supports_type(&self, ty: FieldType) -> bool;

    fn supports_signature(&self, signature: &Signature) -> bool {
        signature.types().iter().all(|ty| self.supports_type(*ty))
    }

    fn supports_atom(&self, decl: &AtomDecl) -> bool {
        decl.fields.iter().all(|field| self.supports_type(field.ty))
    }
}

/// Everything an emitter reads. Borrowed, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct CodegenContext<'a> {
    pub atoms: &'a Atoms,
    /// Nested schema of attribution-chain arguments.
    pub attribution: &'a AtomDecl,
    pub registry: &'a AnnotationRegistry,
    pub module: &'a ModuleFilter,
}

impl CodegenContext<'_> {
    /// Constant name of an atom code, e.g. `BLE_SCAN_STATE_CHANGED`.
    pub fn atom_constant(&self, code: i32) -> String {
        match self.atoms.get(code) {
            Some(decl) => make_constant_name(&decl.name),
            None => code.to_string(),
        }
    }

    /// Name of the attribution chain's uid and tag arguments.
    pub fn chain_names(&self) -> (&str, &str) {
        let uid = self.attribution.fields.first().map_or("uid", |f| f.name.as_str());
        let tag = self.attribution.fields.last().map_or("tag", |f| f.name.as_str());
        (uid, tag)
    }
}

/// Signatures of `lang` worth emitting; the rest are logged and dropped.
pub fn supported_signatures<'m, L: TargetLanguage + ?Sized>(
    lang: &L,
    map: &'m SignatureInfoMap,
) -> Vec<(&'m Signature, &'m SignatureInfo)> {
    map.iter()
        .filter(|(signature, info)| {
            let supported = lang.supports_signature(signature);
            if !supported {
                warn!(
                    language = lang.name(),
                    signature = %signature,
                    atoms = ?info.atoms,
                    "skipping signature with unsupported type"
                );
            }
            supported
        })
        .collect()
}

/// How an emitter spells the annotation calls on its event builder.
pub trait AnnotationWriter {
    fn bool_annotation(&self, constant: &str, value: bool) -> String;

    fn int_annotation(&self, constant: &str, value: i32) -> String;
}

/// Print the per-atom annotation blocks for one field of a shared function.
///
/// Each annotated atom gets an `if (CONST == code)` block. Default-state and
/// reset annotations are held back and printed together as a conditional on
/// `arg`; one without the other prints nothing.
pub fn write_annotation_blocks(
    code: &mut String,
    ctx: &CodegenContext<'_>,
    writer: &impl AnnotationWriter,
    info: &SignatureInfo,
    field_number: i32,
) {
    let Some(by_code) = info.field_annotations.get(&field_number) else {
        return;
    };
    let reset_constant = ctx.registry.constant_name(AnnotationId::TriggerStateReset);

    for (atom_code, annotations) in by_code {
        code.push_str(&format!(
            "    if ({} == code) {{\n",
            ctx.atom_constant(*atom_code)
        ));
        for annotation in annotations {
            if matches!(
                annotation.id,
                AnnotationId::DefaultState | AnnotationId::TriggerStateReset
            ) {
                continue;
            }
            let constant = ctx.registry.constant_name(annotation.id);
            let call = match annotation.value {
                AnnotationValue::Bool(value) => writer.bool_annotation(constant, value),
                AnnotationValue::Int(value) => writer.int_annotation(constant, value),
            };
            code.push_str(&format!("        {call};\n"));
        }
        if field_number != ATOM_ID_FIELD_NUMBER
            && let Some(reset) = StateReset::from_annotations(annotations)
        {
            code.push_str(&format!(
                "        if (arg{} == {}) {{\n",
                field_number, reset.reset_value
            ));
            code.push_str(&format!(
                "            {};\n",
                writer.int_annotation(reset_constant, reset.default_value)
            ));
            code.push_str("        }\n");
        }
        code.push_str("    }\n");
    }
}

/// Split a doc string into comment lines, dropping blank edges.
pub fn doc_lines(doc: &str) -> Vec<&str> {
    let lines: Vec<&str> = doc.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test_support;
