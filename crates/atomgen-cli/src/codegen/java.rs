//! Java class generation.
//!
//! The class mirrors the native API: constants for atom codes, enum values
//! and annotation ids, one `write` overload per pushed signature built
//! through `StatsEvent.Builder`, one `buildStatsEvent` per pulled signature
//! and `write_non_chained` wrappers.

use super::naming::{enum_value_constant, make_constant_name};
use super::{
    doc_lines, supported_signatures, write_annotation_blocks, AnnotationWriter, CodegenContext,
    TargetLanguage, AUTOGENERATED_BANNER,
};
use atomgen_core::annotation::ATOM_ID_FIELD_NUMBER;
use atomgen_core::{FieldType, Signature, SignatureInfo};

/// Java class emitter.
pub struct JavaEmitter<'a> {
    ctx: CodegenContext<'a>,
    package: &'a str,
    class: &'a str,
}

impl TargetLanguage for JavaEmitter<'_> {
    fn name(&self) -> &'static str {
        "java"
    }

    fn supports_type(&self, ty: FieldType) -> bool {
        ty != FieldType::Double
    }
}

impl AnnotationWriter for JavaEmitter<'_> {
    fn bool_annotation(&self, constant: &str, value: bool) -> String {
        format!("builder.addBooleanAnnotation({constant}, {value})")
    }

    fn int_annotation(&self, constant: &str, value: i32) -> String {
        format!("builder.addIntAnnotation({constant}, {value})")
    }
}

/// Java parameter type of a non-chain, non-map argument.
fn java_type_name(ty: FieldType) -> Option<&'static str> {
    let name = match ty {
        FieldType::Bool => "boolean",
        FieldType::Int32 | FieldType::Enum => "int",
        FieldType::Int64 => "long",
        FieldType::Float => "float",
        FieldType::String => "java.lang.String",
        FieldType::ByteArray => "byte[]",
        FieldType::BoolArray => "boolean[]",
        FieldType::Int32Array | FieldType::EnumArray => "int[]",
        FieldType::Int64Array => "long[]",
        FieldType::FloatArray => "float[]",
        FieldType::StringArray => "java.lang.String[]",
        FieldType::Double | FieldType::AttributionChain | FieldType::KeyValuePairs => return None,
    };
    Some(name)
}

/// The four typed maps a key-value-pair argument expands into.
const KEY_VALUE_PARAMS: [(&str, &str); 4] = [
    ("SparseIntArray", "int"),
    ("SparseLongArray", "long"),
    ("SparseArray<Float>", "float"),
    ("SparseArray<String>", "string"),
];

impl<'a> JavaEmitter<'a> {
    pub fn new(ctx: CodegenContext<'a>, package: &'a str, class: &'a str) -> Self {
        Self {
            ctx,
            package,
            class,
        }
    }

    /// Render the class file.
    pub fn render(&self) -> String {
        let atoms = self.ctx.atoms;
        let pushed = supported_signatures(self, &atoms.signatures);
        let pulled = supported_signatures(self, &atoms.pulled_signatures);
        let non_chained = supported_signatures(self, &atoms.non_chained_signatures);
        let uses_pairs = pushed
            .iter()
            .chain(&pulled)
            .any(|(signature, _)| signature.contains(FieldType::KeyValuePairs));

        let mut code = String::new();
        code.push_str(AUTOGENERATED_BANNER);
        code.push('\n');
        code.push_str(&format!("package {};\n\n", self.package));
        code.push_str("import android.util.StatsEvent;\n");
        code.push_str("import android.util.StatsLog;\n");
        if uses_pairs {
            code.push_str("import android.util.SparseArray;\n");
            code.push_str("import android.util.SparseIntArray;\n");
            code.push_str("import android.util.SparseLongArray;\n");
        }
        code.push('\n');

        code.push_str("/**\n * Utility class for logging statistics events.\n */\n");
        code.push_str(&format!("public final class {} {{\n", self.class));

        self.write_constants(&mut code);

        code.push_str("\n    // Write methods\n");
        for (signature, info) in &pushed {
            self.write_method(&mut code, signature, info, false);
        }

        if !pulled.is_empty() {
            code.push_str("\n    // Build methods for pulled atoms\n");
            for (signature, info) in &pulled {
                self.write_method(&mut code, signature, info, true);
            }
        }

        if !non_chained.is_empty() {
            code.push_str("\n    // Write flattened methods\n");
            for (signature, _) in &non_chained {
                self.write_non_chained_method(&mut code, signature);
            }
        }

        code.push_str("}\n");
        code
    }

    fn write_constants(&self, code: &mut String) {
        code.push_str("    // Constants for atom codes.\n");
        for decl in self.ctx.atoms.iter() {
            code.push('\n');
            let doc = doc_lines(&decl.doc);
            if !doc.is_empty() {
                code.push_str("    /**\n");
                for line in doc {
                    code.push_str(&format!("     * {}\n", line.trim()));
                }
                code.push_str("     */\n");
            }
            code.push_str(&format!(
                "    public static final int {} = {};\n",
                make_constant_name(&decl.name),
                decl.code
            ));
        }

        code.push_str("\n    // Constants for enum values.\n");
        for decl in self.ctx.atoms.iter() {
            for field in decl.fields.iter().filter(|f| f.ty.is_enum()) {
                for (value, symbol) in &field.enum_values {
                    code.push_str(&format!(
                        "    public static final int {} = {};\n",
                        enum_value_constant(&decl.name, &field.name, symbol),
                        value
                    ));
                }
            }
        }

        code.push_str("\n    // Annotation constants.\n");
        for (id, name) in self.ctx.registry.annotation_constants() {
            code.push_str(&format!(
                "    public static final byte {} = {};\n",
                name,
                id.value()
            ));
        }
    }

    fn params(&self, signature: &Signature) -> String {
        let (uid, tag) = self.ctx.chain_names();
        let mut params = vec!["int code".to_string()];
        for (ty, arg) in signature.types().iter().zip(1..) {
            match ty {
                FieldType::AttributionChain => {
                    params.push(format!("int[] {uid}"));
                    params.push(format!("java.lang.String[] {tag}"));
                }
                FieldType::KeyValuePairs => {
                    for (map_type, suffix) in KEY_VALUE_PARAMS {
                        params.push(format!("{map_type} arg{arg}_{suffix}"));
                    }
                }
                other => {
                    let name = java_type_name(*other).unwrap_or("Object");
                    params.push(format!("{name} arg{arg}"));
                }
            }
        }
        params.join(", ")
    }

    fn write_method(
        &self,
        code: &mut String,
        signature: &Signature,
        info: &SignatureInfo,
        pulled: bool,
    ) {
        let (uid, tag) = self.ctx.chain_names();
        let mut body = String::new();

        body.push_str("    final StatsEvent.Builder builder = StatsEvent.newBuilder();\n");
        body.push_str("    builder.setAtomId(code);\n");
        write_annotation_blocks(&mut body, &self.ctx, self, info, ATOM_ID_FIELD_NUMBER);
        for (ty, arg) in signature.types().iter().zip(1..) {
            let line = match ty {
                FieldType::AttributionChain => format!(
                    "builder.writeAttributionChain(null == {uid} ? new int[0] : {uid}, \
                     null == {tag} ? new java.lang.String[0] : {tag})"
                ),
                FieldType::KeyValuePairs => format!(
                    "builder.writeKeyValuePairs(arg{arg}_int, arg{arg}_long, arg{arg}_float, arg{arg}_string)"
                ),
                FieldType::Bool => format!("builder.writeBoolean(arg{arg})"),
                FieldType::Int32 | FieldType::Enum => format!("builder.writeInt(arg{arg})"),
                FieldType::Int64 => format!("builder.writeLong(arg{arg})"),
                FieldType::Float => format!("builder.writeFloat(arg{arg})"),
                FieldType::String => format!("builder.writeString(arg{arg})"),
                FieldType::ByteArray => format!(
                    "builder.writeByteArray(null == arg{arg} ? new byte[0] : arg{arg})"
                ),
                FieldType::BoolArray => format!("builder.writeBooleanArray(arg{arg})"),
                FieldType::Int32Array | FieldType::EnumArray => {
                    format!("builder.writeIntArray(arg{arg})")
                }
                FieldType::Int64Array => format!("builder.writeLongArray(arg{arg})"),
                FieldType::FloatArray => format!("builder.writeFloatArray(arg{arg})"),
                FieldType::StringArray => format!("builder.writeStringArray(arg{arg})"),
                // filtered out by supports_type
                FieldType::Double => continue,
            };
            body.push_str(&format!("    {line};\n"));
            write_annotation_blocks(&mut body, &self.ctx, self, info, arg);
        }

        code.push_str(&format!("\n    // Signature: {}\n", signature.mangled_name()));
        if pulled {
            code.push_str(&format!(
                "    public static StatsEvent buildStatsEvent({}) {{\n",
                self.params(signature)
            ));
            push_indented(code, &body);
            code.push_str("        return builder.build();\n");
        } else {
            code.push_str(&format!(
                "    public static void write({}) {{\n",
                self.params(signature)
            ));
            push_indented(code, &body);
            code.push_str("        builder.usePooledBuffer();\n");
            code.push_str("        StatsLog.write(builder.build());\n");
        }
        code.push_str("    }\n");
    }

    fn write_non_chained_method(&self, code: &mut String, signature: &Signature) {
        code.push_str(&format!(
            "\n    public static void write_non_chained({}) {{\n",
            self.params(signature)
        ));
        let mut args = vec![
            "code".to_string(),
            "new int[] {arg1}".to_string(),
            "new java.lang.String[] {arg2}".to_string(),
        ];
        for (ty, arg) in signature.types().iter().zip(1..).skip(2) {
            if *ty == FieldType::KeyValuePairs {
                for (_, suffix) in KEY_VALUE_PARAMS {
                    args.push(format!("arg{arg}_{suffix}"));
                }
            } else {
                args.push(format!("arg{arg}"));
            }
        }
        code.push_str(&format!("        write({});\n", args.join(", ")));
        code.push_str("    }\n");
    }
}

/// Indent a method body one more level, to sit inside the class.
fn push_indented(code: &mut String, body: &str) {
    for line in body.lines() {
        code.push_str("    ");
        code.push_str(line);
        code.push('\n');
    }
}
