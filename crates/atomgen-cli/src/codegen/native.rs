//! Native (C++) header and source generation.
//!
//! One `stats_write` overload is emitted per pushed signature, one
//! `addAStatsEvent` per pulled signature and one `stats_write_non_chained`
//! wrapper per non-chained signature. Atoms pick an overload by passing their
//! code, so per-atom behavior (annotations) lives in `if (CODE == code)`
//! blocks inside the shared body.

use super::naming::{enum_value_constant, make_constant_name};
use super::{
    doc_lines, supported_signatures, write_annotation_blocks, AnnotationWriter, CodegenContext,
    TargetLanguage, AUTOGENERATED_BANNER,
};
use atomgen_core::annotation::ATOM_ID_FIELD_NUMBER;
use atomgen_core::{AtomDecl, AtomKind, FieldType, Signature, SignatureInfo};

const WRITE_METHOD: &str = "int stats_write(";
const NON_CHAINED_METHOD: &str = "int stats_write_non_chained(";
const PULLED_METHOD: &str = "void addAStatsEvent(AStatsEventList* pulled_data, ";

/// Native header/source emitter.
pub struct NativeEmitter<'a> {
    ctx: CodegenContext<'a>,
    namespace: &'a str,
    import_header: &'a str,
}

impl TargetLanguage for NativeEmitter<'_> {
    fn name(&self) -> &'static str {
        "native"
    }

    fn supports_type(&self, ty: FieldType) -> bool {
        ty == FieldType::AttributionChain || cpp_type_name(ty).is_some()
    }
}

impl AnnotationWriter for NativeEmitter<'_> {
    fn bool_annotation(&self, constant: &str, value: bool) -> String {
        format!("AStatsEvent_addBoolAnnotation(event, {constant}, {value})")
    }

    fn int_annotation(&self, constant: &str, value: i32) -> String {
        format!("AStatsEvent_addInt32Annotation(event, {constant}, {value})")
    }
}

/// C++ parameter type of a non-chain argument.
fn cpp_type_name(ty: FieldType) -> Option<&'static str> {
    let name = match ty {
        FieldType::Bool => "bool",
        FieldType::Int32 | FieldType::Enum => "int32_t",
        FieldType::Int64 => "int64_t",
        FieldType::Float => "float",
        FieldType::String => "char const*",
        FieldType::ByteArray => "const BytesField&",
        FieldType::BoolArray => "const bool*",
        FieldType::Int32Array | FieldType::EnumArray => "const std::vector<int32_t>&",
        FieldType::Int64Array => "const std::vector<int64_t>&",
        FieldType::FloatArray => "const std::vector<float>&",
        FieldType::StringArray => "const std::vector<char const*>&",
        FieldType::Double | FieldType::KeyValuePairs | FieldType::AttributionChain => {
            return None;
        }
    };
    Some(name)
}

fn write_namespace(code: &mut String, namespace: &str) {
    for part in namespace.split(',') {
        code.push_str(&format!("namespace {} {{\n", part.trim()));
    }
}

fn write_closing_namespace(code: &mut String, namespace: &str) {
    for part in namespace.split(',').rev() {
        code.push_str(&format!("}} // namespace {}\n", part.trim()));
    }
}

impl<'a> NativeEmitter<'a> {
    pub fn new(ctx: CodegenContext<'a>, namespace: &'a str, import_header: &'a str) -> Self {
        Self {
            ctx,
            namespace,
            import_header,
        }
    }

    /// Render the header file.
    pub fn render_header(&self) -> String {
        let atoms = self.ctx.atoms;
        let mut code = String::new();

        code.push_str(AUTOGENERATED_BANNER);
        code.push_str("\n#pragma once\n\n");
        code.push_str("#include <stdint.h>\n");
        code.push_str("#include <vector>\n");
        code.push_str("#include <map>\n");
        code.push_str("#include <set>\n");
        if !atoms.pulled_signatures.is_empty() {
            code.push_str("#include <stats_pull_atom_callback.h>\n");
        }
        code.push('\n');

        write_namespace(&mut code, self.namespace);
        code.push_str("\n/*\n * API For logging statistics events.\n */\n\n");

        self.write_atom_constants(&mut code);
        self.write_enum_constants(&mut code);
        self.write_annotation_constants(&mut code);

        code.push_str("struct BytesField {\n");
        code.push_str(
            "  BytesField(char const* array, size_t len) : arg(array), arg_length(len) {}\n",
        );
        code.push_str("  char const* arg;\n");
        code.push_str("  size_t arg_length;\n");
        code.push_str("};\n\n");

        if self.ctx.module.is_default() {
            code.push_str("struct StateAtomFieldOptions {\n");
            code.push_str("  std::vector<int> primaryFields;\n");
            code.push_str("  int exclusiveField;\n");
            code.push_str("};\n\n");
            code.push_str("struct AtomsInfo {\n");
            code.push_str("  const static std::set<int> kTruncatingTimestampAtomBlackList;\n");
            code.push_str("  const static std::map<int, int> kAtomsWithUidField;\n");
            code.push_str("  const static std::set<int> kAtomsWithAttributionChain;\n");
            code.push_str(
                "  const static std::map<int, StateAtomFieldOptions> kStateAtomsFieldOptions;\n",
            );
            code.push_str("  const static std::map<int, std::vector<int>> kBytesFieldAtoms;\n");
            code.push_str("  const static std::set<int> kWhitelistedAtoms;\n");
            code.push_str("};\n\n");
            code.push_str(&format!(
                "const static int kMaxPushedAtomId = {};\n\n",
                atoms.max_pushed_atom_id
            ));
        }

        code.push_str("//\n// Write methods\n//\n");
        for (signature, _) in supported_signatures(self, &atoms.signatures) {
            code.push_str(&self.method_signature(WRITE_METHOD, signature));
            code.push_str(";\n");
        }
        code.push('\n');

        code.push_str("//\n// Write flattened methods\n//\n");
        for (signature, _) in supported_signatures(self, &atoms.non_chained_signatures) {
            code.push_str(&self.method_signature(NON_CHAINED_METHOD, signature));
            code.push_str(";\n");
        }
        code.push('\n');

        code.push_str("//\n// Add AStatsEvent methods\n//\n");
        for (signature, _) in supported_signatures(self, &atoms.pulled_signatures) {
            code.push_str(&self.method_signature(PULLED_METHOD, signature));
            code.push_str(";\n");
        }
        code.push('\n');

        write_closing_namespace(&mut code, self.namespace);
        code
    }

    /// Render the source file.
    pub fn render_source(&self) -> String {
        let atoms = self.ctx.atoms;
        let mut code = String::new();

        code.push_str(AUTOGENERATED_BANNER);
        code.push('\n');
        code.push_str(&format!("#include <{}>\n", self.import_header));
        code.push_str("#include <stats_event.h>\n");
        if !atoms.pulled_signatures.is_empty() {
            code.push_str("#include <stats_pull_atom_callback.h>\n");
        }
        code.push('\n');
        write_namespace(&mut code, self.namespace);
        code.push('\n');

        if self.ctx.module.is_default() {
            self.write_atoms_info(&mut code);
        }

        for (signature, info) in supported_signatures(self, &atoms.signatures) {
            code.push_str(&format!("// Signature: {}\n", signature.mangled_name()));
            code.push_str(&self.method_signature(WRITE_METHOD, signature));
            code.push_str(" {\n");
            code.push_str("    AStatsEvent* event = AStatsEvent_obtain();\n");
            self.write_method_body(&mut code, signature, info);
            code.push_str("    const int ret = AStatsEvent_write(event);\n");
            code.push_str("    AStatsEvent_release(event);\n");
            code.push_str("    return ret;\n");
            code.push_str("}\n\n");
        }

        for (signature, _) in supported_signatures(self, &atoms.non_chained_signatures) {
            self.write_non_chained_method(&mut code, signature);
        }

        for (signature, info) in supported_signatures(self, &atoms.pulled_signatures) {
            code.push_str(&format!("// Signature: {}\n", signature.mangled_name()));
            code.push_str(&self.method_signature(PULLED_METHOD, signature));
            code.push_str(" {\n");
            code.push_str("    AStatsEvent* event = AStatsEventList_addStatsEvent(pulled_data);\n");
            self.write_method_body(&mut code, signature, info);
            code.push_str("    AStatsEvent_build(event);\n");
            code.push_str("}\n\n");
        }

        write_closing_namespace(&mut code, self.namespace);
        code
    }

    fn write_atom_constants(&self, code: &mut String) {
        code.push_str("/**\n * Constants for atom codes.\n */\n");
        code.push_str("enum {\n");
        for decl in self.ctx.atoms.iter() {
            code.push_str("\n    /**\n");
            for line in doc_lines(&decl.doc) {
                code.push_str(&format!("     * {}\n", line.trim()));
            }
            code.push_str(&format!("     * Usage: {}\n", self.usage(decl)));
            code.push_str("     */\n");
            code.push_str(&format!(
                "    {} = {},\n",
                make_constant_name(&decl.name),
                decl.code
            ));
        }
        code.push_str("\n};\n\n");
    }

    /// Example call for an atom, using its field names.
    fn usage(&self, decl: &AtomDecl) -> String {
        let constant = make_constant_name(&decl.name);
        let mut params = String::new();
        let view = decl.chained_view();
        for field in &view.fields {
            if field.ty == FieldType::AttributionChain {
                params.push_str(&self.chain_params());
            } else if let Some(ty) = cpp_type_name(field.ty) {
                params.push_str(&format!(", {} {}", ty, field.name));
            } else {
                params.push_str(&format!(", <unsupported {}> {}", field.ty, field.name));
            }
        }
        match decl.kind {
            AtomKind::Pushed => format!("stats_write({constant}{params});"),
            AtomKind::Pulled => format!("addAStatsEvent(pulled_data, {constant}{params});"),
        }
    }

    fn write_enum_constants(&self, code: &mut String) {
        code.push_str("// Constants for enum values\n");
        for decl in self.ctx.atoms.iter() {
            for field in decl.fields.iter().filter(|f| f.ty.is_enum()) {
                for (value, symbol) in &field.enum_values {
                    code.push_str(&format!(
                        "const int32_t {} = {};\n",
                        enum_value_constant(&decl.name, &field.name, symbol),
                        value
                    ));
                }
            }
        }
        code.push('\n');
    }

    fn write_annotation_constants(&self, code: &mut String) {
        code.push_str("// Annotation constants.\n");
        for (id, name) in self.ctx.registry.annotation_constants() {
            code.push_str(&format!("const uint8_t {} = {};\n", name, id.value()));
        }
        code.push('\n');
    }

    fn write_atoms_info(&self, code: &mut String) {
        let atoms = self.ctx.atoms;

        write_code_set(
            code,
            "kTruncatingTimestampAtomBlackList",
            atoms.iter().filter(|d| d.truncate_timestamp),
        );
        write_code_set(
            code,
            "kAtomsWithAttributionChain",
            atoms
                .iter()
                .filter(|d| d.has_attribution_chain() || d.non_chained),
        );
        write_code_set(
            code,
            "kWhitelistedAtoms",
            atoms.iter().filter(|d| d.whitelisted),
        );

        code.push_str("static std::map<int, int> getAtomUidField() {\n");
        code.push_str("    std::map<int, int> uidField;\n");
        for decl in atoms.iter() {
            let Some(uid_field) = decl.uid_field else {
                continue;
            };
            code.push_str(&format!(
                "\n    // Adding uid field for atom ({}){}\n",
                decl.code, decl.name
            ));
            code.push_str(&format!(
                "    uidField[static_cast<int>({})] = {};\n",
                make_constant_name(&decl.name),
                uid_field
            ));
        }
        code.push_str("    return uidField;\n");
        code.push_str("}\n\n");
        code.push_str(
            "const std::map<int, int> AtomsInfo::kAtomsWithUidField = getAtomUidField();\n\n",
        );

        code.push_str("static std::map<int, StateAtomFieldOptions> getStateAtomFieldOptions() {\n");
        code.push_str("    std::map<int, StateAtomFieldOptions> options;\n");
        code.push_str("    StateAtomFieldOptions opt;\n");
        for decl in atoms.iter().filter(|d| d.is_state_atom()) {
            code.push_str(&format!(
                "\n    // Adding primary and exclusive fields for atom ({}){}\n",
                decl.code, decl.name
            ));
            code.push_str("    opt.primaryFields.clear();\n");
            for field in &decl.primary_fields {
                code.push_str(&format!("    opt.primaryFields.push_back({field});\n"));
            }
            code.push_str(&format!(
                "    opt.exclusiveField = {};\n",
                decl.exclusive_field.unwrap_or(0)
            ));
            code.push_str(&format!(
                "    options[static_cast<int>({})] = opt;\n",
                make_constant_name(&decl.name)
            ));
        }
        code.push_str("    return options;\n");
        code.push_str("}\n\n");
        code.push_str(
            "const std::map<int, StateAtomFieldOptions> AtomsInfo::kStateAtomsFieldOptions = \
             getStateAtomFieldOptions();\n\n",
        );

        code.push_str("static std::map<int, std::vector<int>> getBinaryFieldAtoms() {\n");
        code.push_str("    std::map<int, std::vector<int>> options;\n");
        for decl in atoms.iter().filter(|d| !d.binary_fields.is_empty()) {
            code.push_str(&format!(
                "\n    // Adding binary fields for atom ({}){}\n",
                decl.code, decl.name
            ));
            for field in &decl.binary_fields {
                code.push_str(&format!(
                    "    options[static_cast<int>({})].push_back({});\n",
                    make_constant_name(&decl.name),
                    field
                ));
            }
        }
        code.push_str("    return options;\n");
        code.push_str("}\n\n");
        code.push_str(
            "const std::map<int, std::vector<int>> AtomsInfo::kBytesFieldAtoms = \
             getBinaryFieldAtoms();\n\n",
        );
    }

    /// `const int32_t* uid, size_t uid_length, const std::vector<char const*>& tag`
    fn chain_params(&self) -> String {
        let mut params = String::new();
        for field in &self.ctx.attribution.fields {
            if field.ty == FieldType::String {
                params.push_str(&format!(", const std::vector<char const*>& {}", field.name));
            } else {
                let ty = cpp_type_name(field.ty).unwrap_or("int32_t");
                params.push_str(&format!(
                    ", const {}* {}, size_t {}_length",
                    ty, field.name, field.name
                ));
            }
        }
        params
    }

    fn method_signature(&self, prefix: &str, signature: &Signature) -> String {
        let mut code = format!("{prefix}int32_t code");
        for (ty, arg) in signature.types().iter().zip(1..) {
            if *ty == FieldType::AttributionChain {
                code.push_str(&self.chain_params());
                continue;
            }
            let name = cpp_type_name(*ty).unwrap_or("void*");
            code.push_str(&format!(", {name} arg{arg}"));
            if *ty == FieldType::BoolArray {
                code.push_str(&format!(", size_t arg{arg}_length"));
            }
        }
        code.push(')');
        code
    }

    fn write_method_body(&self, code: &mut String, signature: &Signature, info: &SignatureInfo) {
        let (uid, tag) = self.ctx.chain_names();

        code.push_str("    AStatsEvent_setAtomId(event, code);\n");
        write_annotation_blocks(code, &self.ctx, self, info, ATOM_ID_FIELD_NUMBER);
        for (ty, arg) in signature.types().iter().zip(1..) {
            let line = match ty {
                FieldType::AttributionChain => format!(
                    "AStatsEvent_writeAttributionChain(event, reinterpret_cast<const uint32_t*>({uid}), \
                     {tag}.data(), static_cast<uint8_t>({uid}_length))"
                ),
                FieldType::ByteArray => format!(
                    "AStatsEvent_writeByteArray(event, reinterpret_cast<const uint8_t*>(arg{arg}.arg), \
                     arg{arg}.arg_length)"
                ),
                FieldType::Bool => format!("AStatsEvent_writeBool(event, arg{arg})"),
                FieldType::Int32 | FieldType::Enum => {
                    format!("AStatsEvent_writeInt32(event, arg{arg})")
                }
                FieldType::Int64 => format!("AStatsEvent_writeInt64(event, arg{arg})"),
                FieldType::Float => format!("AStatsEvent_writeFloat(event, arg{arg})"),
                FieldType::String => format!("AStatsEvent_writeString(event, arg{arg})"),
                FieldType::BoolArray => {
                    format!("AStatsEvent_writeBoolArray(event, arg{arg}, arg{arg}_length)")
                }
                FieldType::Int32Array | FieldType::EnumArray => {
                    format!("AStatsEvent_writeInt32Array(event, arg{arg}.data(), arg{arg}.size())")
                }
                FieldType::Int64Array => {
                    format!("AStatsEvent_writeInt64Array(event, arg{arg}.data(), arg{arg}.size())")
                }
                FieldType::FloatArray => {
                    format!("AStatsEvent_writeFloatArray(event, arg{arg}.data(), arg{arg}.size())")
                }
                FieldType::StringArray => {
                    format!("AStatsEvent_writeStringArray(event, arg{arg}.data(), arg{arg}.size())")
                }
                // filtered out by supports_type
                FieldType::Double | FieldType::KeyValuePairs => continue,
            };
            code.push_str(&format!("    {line};\n"));
            write_annotation_blocks(code, &self.ctx, self, info, arg);
        }
    }

    /// Wrap a flat `(uid, tag, ...)` signature as a one-node chain and
    /// forward to the chained overload.
    fn write_non_chained_method(&self, code: &mut String, signature: &Signature) {
        let (uid, tag) = self.ctx.chain_names();

        code.push_str(&self.method_signature(NON_CHAINED_METHOD, signature));
        code.push_str(" {\n");
        code.push_str(&format!("    const int32_t* {uid} = &arg1;\n"));
        code.push_str(&format!("    const size_t {uid}_length = 1;\n"));
        code.push_str(&format!("    const std::vector<char const*> {tag}(1, arg2);\n"));
        code.push_str(&format!("    return stats_write(code, {uid}, {uid}_length, {tag}"));
        for (ty, arg) in signature.types().iter().zip(1..).skip(2) {
            code.push_str(&format!(", arg{arg}"));
            if *ty == FieldType::BoolArray {
                code.push_str(&format!(", arg{arg}_length"));
            }
        }
        code.push_str(");\n");
        code.push_str("}\n\n");
    }
}

fn write_code_set<'d>(code: &mut String, name: &str, decls: impl Iterator<Item = &'d AtomDecl>) {
    code.push_str(&format!("const std::set<int> AtomsInfo::{name} = {{\n"));
    for decl in decls {
        code.push_str(&format!("    {},\n", make_constant_name(&decl.name)));
    }
    code.push_str("};\n\n");
}

#[cfg(test)]
#[path = "native/native_tests.rs"]
mod native_tests;
