//! Rust module generation.
//!
//! Unlike the native and Java outputs, the Rust module has one function per
//! atom rather than per signature, so annotations are written inline without
//! code checks. Argument names get a leading underscore so schema field names
//! can never collide with Rust keywords.

use super::naming::to_pascal_case;
use super::{CodegenContext, TargetLanguage, AUTOGENERATED_BANNER};
use atomgen_core::annotation::{StateReset, ATOM_ID_FIELD_NUMBER};
use atomgen_core::{AnnotationId, AnnotationValue, AtomDecl, AtomKind, FieldType};
use tracing::warn;

const PRELUDE: &str = r#"pub use statslog_bindgen::*;
use statspull_bindgen::*;
use std::convert::TryInto;
use std::ffi::CString;
"#;

const ERROR_AND_DROPPER: &str = r#"#[derive(thiserror::Error, Debug)]
pub enum StatsError {
    #[error("Return error {0:?}")]
    Return(i32),
    #[error(transparent)]
    NullChar(#[from] std::ffi::NulError),
    #[error(transparent)]
    Conversion(#[from] std::num::TryFromIntError),
}

struct AStatsEventDropper(*mut statspull_bindgen::AStatsEvent);

impl Drop for AStatsEventDropper {
    fn drop(&mut self) {
        unsafe { AStatsEvent_release(self.0) }
    }
}
"#;

/// Rust module emitter.
pub struct RustEmitter<'a> {
    ctx: CodegenContext<'a>,
}

impl TargetLanguage for RustEmitter<'_> {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn supports_type(&self, ty: FieldType) -> bool {
        ty == FieldType::AttributionChain || rust_type_name(ty).is_some()
    }
}

fn rust_type_name(ty: FieldType) -> Option<&'static str> {
    let name = match ty {
        FieldType::Bool => "bool",
        FieldType::Int32 | FieldType::Enum => "i32",
        FieldType::Int64 => "i64",
        FieldType::Float => "f32",
        FieldType::String => "&str",
        FieldType::ByteArray => "&[u8]",
        _ => return None,
    };
    Some(name)
}

impl<'a> RustEmitter<'a> {
    pub fn new(ctx: CodegenContext<'a>) -> Self {
        Self { ctx }
    }

    /// Render the module.
    pub fn render(&self) -> String {
        let mut code = String::new();
        code.push_str(AUTOGENERATED_BANNER);
        code.push('\n');
        code.push_str(PRELUDE);
        code.push('\n');

        self.write_atom_enum(&mut code);
        self.write_annotation_enum(&mut code);
        code.push_str(ERROR_AND_DROPPER);
        code.push('\n');

        let supported: Vec<&AtomDecl> = self
            .ctx
            .atoms
            .iter()
            .filter(|decl| {
                let ok = self.supports_atom(decl);
                if !ok {
                    warn!(
                        language = self.name(),
                        atom = %decl.name,
                        signature = %decl.signature(),
                        "skipping atom with unsupported type"
                    );
                }
                ok
            })
            .collect();

        for decl in &supported {
            self.write_atom_function(&mut code, &decl.chained_view());
        }
        for decl in supported.iter().filter(|d| d.non_chained) {
            self.write_non_chained_function(&mut code, decl);
        }

        code
    }

    fn write_atom_enum(&self, code: &mut String) {
        code.push_str("/// Atom codes.\n");
        code.push_str("#[repr(i32)]\n");
        code.push_str("#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]\n");
        code.push_str("pub enum Atoms {\n");
        for decl in self.ctx.atoms.iter() {
            code.push_str(&format!(
                "    {} = {},\n",
                to_pascal_case(&decl.name),
                decl.code
            ));
        }
        code.push_str("}\n\n");
    }

    fn write_annotation_enum(&self, code: &mut String) {
        code.push_str("/// Annotation ids.\n");
        code.push_str("#[repr(u8)]\n");
        code.push_str("#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]\n");
        code.push_str("pub enum AnnotationId {\n");
        for (id, _) in self.ctx.registry.annotation_constants() {
            code.push_str(&format!("    {} = {},\n", self.annotation_variant(id), id.value()));
        }
        code.push_str("}\n\n");
    }

    /// `ANNOTATION_ID_IS_UID` becomes `IsUid`.
    fn annotation_variant(&self, id: AnnotationId) -> String {
        let constant = self.ctx.registry.constant_name(id);
        let base = constant.strip_prefix("ANNOTATION_ID_").unwrap_or(constant);
        to_pascal_case(&base.to_ascii_lowercase())
    }

    fn chain_params(&self) -> Vec<String> {
        self.ctx
            .attribution
            .fields
            .iter()
            .map(|field| {
                let ty = rust_type_name(field.ty).unwrap_or("i32");
                format!("__chain_{}: &[{}]", field.name, ty)
            })
            .collect()
    }

    fn write_signature(
        &self,
        code: &mut String,
        prefix: &str,
        decl: &AtomDecl,
        params: Vec<String>,
    ) {
        code.push_str(&format!("pub fn {}{}(\n", prefix, decl.name));
        if decl.kind == AtomKind::Pulled {
            code.push_str("    __pulled_data: &mut AStatsEventList,\n");
        }
        for param in params {
            code.push_str(&format!("    {param},\n"));
        }
        code.push_str(") -> Result<(), StatsError> {\n");
    }

    fn write_atom_function(&self, code: &mut String, decl: &AtomDecl) {
        let params = decl
            .fields
            .iter()
            .flat_map(|field| match field.ty {
                FieldType::AttributionChain => self.chain_params(),
                ty => vec![format!(
                    "_{}: {}",
                    field.name,
                    rust_type_name(ty).unwrap_or("()")
                )],
            })
            .collect();
        let prefix = match decl.kind {
            AtomKind::Pushed => "stats_write_",
            AtomKind::Pulled => "add_astats_event_",
        };
        self.write_signature(code, prefix, decl, params);

        let atom = format!("Atoms::{} as u32", to_pascal_case(&decl.name));
        code.push_str("    unsafe {\n");
        match decl.kind {
            AtomKind::Pushed => {
                code.push_str("        let event = AStatsEvent_obtain();\n");
                code.push_str("        let _dropper = AStatsEventDropper(event);\n");
            }
            AtomKind::Pulled => {
                code.push_str(
                    "        let event = AStatsEventList_addStatsEvent(__pulled_data);\n",
                );
            }
        }
        code.push_str(&format!("        AStatsEvent_setAtomId(event, {atom});\n"));
        self.write_annotations(code, decl, ATOM_ID_FIELD_NUMBER);

        let (uid, tag) = self.ctx.chain_names();
        for (field, number) in decl.fields.iter().zip(1..) {
            let name = &field.name;
            match field.ty {
                FieldType::AttributionChain => {
                    code.push_str(&format!(
                        "        let uids = __chain_{uid}.iter().map(|n| (*n).try_into()).collect::<Result<Vec<_>, _>>()?;\n"
                    ));
                    code.push_str(&format!(
                        "        let str_arr = __chain_{tag}.iter().map(|s| CString::new(*s)).collect::<Result<Vec<_>, _>>()?;\n"
                    ));
                    code.push_str(
                        "        let ptr_arr = str_arr.iter().map(|s| s.as_ptr()).collect::<Vec<_>>();\n",
                    );
                    code.push_str(&format!(
                        "        AStatsEvent_writeAttributionChain(event, uids.as_ptr(), ptr_arr.as_ptr(), __chain_{uid}.len().try_into()?);\n"
                    ));
                }
                FieldType::ByteArray => code.push_str(&format!(
                    "        AStatsEvent_writeByteArray(event, _{name}.as_ptr(), _{name}.len());\n"
                )),
                FieldType::Bool => {
                    code.push_str(&format!("        AStatsEvent_writeBool(event, _{name});\n"))
                }
                FieldType::Int32 | FieldType::Enum => {
                    code.push_str(&format!("        AStatsEvent_writeInt32(event, _{name});\n"))
                }
                FieldType::Int64 => {
                    code.push_str(&format!("        AStatsEvent_writeInt64(event, _{name});\n"))
                }
                FieldType::Float => {
                    code.push_str(&format!("        AStatsEvent_writeFloat(event, _{name});\n"))
                }
                FieldType::String => {
                    code.push_str(&format!("        let _{name}_cstr = CString::new(_{name})?;\n"));
                    code.push_str(&format!(
                        "        AStatsEvent_writeString(event, _{name}_cstr.as_ptr());\n"
                    ));
                }
                // filtered out by supports_type
                _ => continue,
            }
            self.write_annotations(code, decl, number);
        }

        match decl.kind {
            AtomKind::Pushed => {
                code.push_str("        let ret = AStatsEvent_write(event);\n");
                code.push_str(
                    "        if ret >= 0 { Ok(()) } else { Err(StatsError::Return(ret)) }\n",
                );
            }
            AtomKind::Pulled => {
                code.push_str("        AStatsEvent_build(event);\n");
                code.push_str("        Ok(())\n");
            }
        }
        code.push_str("    }\n");
        code.push_str("}\n\n");
    }

    fn write_annotations(&self, code: &mut String, decl: &AtomDecl, number: i32) {
        let Some(annotations) = decl.annotations_at(number) else {
            return;
        };
        for annotation in annotations {
            if matches!(
                annotation.id,
                AnnotationId::DefaultState | AnnotationId::TriggerStateReset
            ) {
                continue;
            }
            let variant = self.annotation_variant(annotation.id);
            let line = match annotation.value {
                AnnotationValue::Bool(value) => format!(
                    "AStatsEvent_addBoolAnnotation(event, AnnotationId::{variant} as u8, {value})"
                ),
                AnnotationValue::Int(value) => format!(
                    "AStatsEvent_addInt32Annotation(event, AnnotationId::{variant} as u8, {value})"
                ),
            };
            code.push_str(&format!("        {line};\n"));
        }
        if number == ATOM_ID_FIELD_NUMBER {
            return;
        }
        if let Some(reset) = StateReset::from_annotations(annotations)
            && let Some(field) = decl.field(number)
        {
            let variant = self.annotation_variant(AnnotationId::TriggerStateReset);
            code.push_str(&format!(
                "        if _{} == {} {{\n",
                field.name, reset.reset_value
            ));
            code.push_str(&format!(
                "            AStatsEvent_addInt32Annotation(event, AnnotationId::{} as u8, {});\n",
                variant, reset.default_value
            ));
            code.push_str("        }\n");
        }
    }

    /// Flat wrapper taking the uid and tag as plain values.
    fn write_non_chained_function(&self, code: &mut String, decl: &AtomDecl) {
        let mut params = Vec::new();
        let mut args = Vec::new();
        for (index, field) in decl.fields.iter().enumerate() {
            let ty = rust_type_name(field.ty).unwrap_or("()");
            if index < 2 {
                params.push(format!("__non_chained_{}: {}", field.name, ty));
                args.push(format!("&[__non_chained_{}]", field.name));
            } else {
                params.push(format!("_{}: {}", field.name, ty));
                args.push(format!("_{}", field.name));
            }
        }
        self.write_signature(code, "stats_write_non_chained_", decl, params);
        code.push_str(&format!(
            "    stats_write_{}({})\n",
            decl.name,
            args.join(", ")
        ));
        code.push_str("}\n\n");
    }
}
