//! atomgen-proto - Protobuf descriptor frontend
//!
//! Translates a compiled `FileDescriptorSet` (`protoc --include_imports
//! --descriptor_set_out=atoms.pb`) into an [`AtomSchema`]. Every alternative of
//! the container message becomes an atom entry, and option extensions set on
//! fields are carried over by extension number for the annotation registry to
//! interpret. A message-valued extension contributes one option per set
//! sub-field, keyed by extension and sub-field number.

use atomgen_core::schema::{
    AtomEntry, AtomSchema, EnumValue, OptionKey, ProtoKind, RawOption, RawOptionValue,
    SchemaField, SchemaMessage, ONEOF_PUSHED_ATOM_NAME,
};
use prost_reflect::{
    Cardinality, DescriptorPool, DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, Value,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from loading or translating descriptors.
#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("failed to read descriptor set {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid descriptor set: {0}")]
    Decode(#[from] prost_reflect::DescriptorError),

    #[error("container message {0} not found in descriptor set")]
    ContainerNotFound(String),

    #[error("field {field} of {container} is not a message and cannot be an atom")]
    NonMessageAtom { container: String, field: String },
}

/// Read and decode a serialized `FileDescriptorSet`.
///
/// The set must include its imports, so the custom option extensions and
/// `google/protobuf/descriptor.proto` are resolvable.
pub fn load_descriptor_pool(path: impl AsRef<Path>) -> Result<DescriptorPool, ProtoError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ProtoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pool = DescriptorPool::decode(bytes.as_slice())?;
    debug!(
        path = %path.display(),
        files = pool.files().count(),
        "loaded descriptor set"
    );
    Ok(pool)
}

/// Build the schema for the container message `container` (full name).
pub fn schema_from_pool(pool: &DescriptorPool, container: &str) -> Result<AtomSchema, ProtoError> {
    let container_name = container.trim_start_matches('.');
    let descriptor = pool
        .get_message_by_name(container_name)
        .ok_or_else(|| ProtoError::ContainerNotFound(container_name.to_string()))?;

    let mut schema = AtomSchema::new(descriptor.full_name());
    let mut atom_messages = Vec::new();

    for field in descriptor.fields() {
        let Kind::Message(message) = field.kind() else {
            return Err(ProtoError::NonMessageAtom {
                container: descriptor.full_name().to_string(),
                field: field.name().to_string(),
            });
        };

        let mut entry = AtomEntry::new(field.name(), field_number(&field), message.full_name());
        // proto3 `optional` fields sit in a synthetic oneof of their own
        entry.oneof = field
            .containing_oneof()
            .filter(|oneof| {
                !oneof
                    .fields()
                    .all(|f| f.field_descriptor_proto().proto3_optional())
            })
            .map(|oneof| oneof.name().to_string())
            .unwrap_or_else(|| ONEOF_PUSHED_ATOM_NAME.to_string());
        entry.options = extension_options(&field.options());
        schema.entries.push(entry);
        atom_messages.push(message);
    }

    // atom messages plus the message types their fields refer to
    let mut translated = BTreeSet::new();
    let mut referenced = Vec::new();
    for message in atom_messages {
        for field in message.fields() {
            if let Kind::Message(nested) = field.kind() {
                referenced.push(nested);
            }
        }
        add_message(&mut schema, &mut translated, &message);
    }
    for message in referenced {
        add_message(&mut schema, &mut translated, &message);
    }

    debug!(
        container = %descriptor.full_name(),
        atoms = schema.entries.len(),
        messages = schema.messages.len(),
        "translated descriptors"
    );
    Ok(schema)
}

fn add_message(
    schema: &mut AtomSchema,
    translated: &mut BTreeSet<String>,
    message: &MessageDescriptor,
) {
    if !translated.insert(message.full_name().to_string()) {
        return;
    }
    let fields = message.fields().map(|f| translate_field(&f)).collect();
    let mut translated_message = SchemaMessage::new(message.full_name(), fields);
    translated_message.doc = leading_comments(message).unwrap_or_default();
    schema.add_message(translated_message);
}

/// Leading comments of a message, present when the set was built with
/// `--include_source_info`.
fn leading_comments(message: &MessageDescriptor) -> Option<String> {
    message
        .parent_file_descriptor_proto()
        .source_code_info
        .as_ref()?
        .location
        .iter()
        .find(|location| location.path == message.path())?
        .leading_comments
        .clone()
}

fn translate_field(field: &FieldDescriptor) -> SchemaField {
    let kind = match field.kind() {
        Kind::Double => ProtoKind::Double,
        Kind::Float => ProtoKind::Float,
        Kind::Int32 => ProtoKind::Int32,
        Kind::Int64 => ProtoKind::Int64,
        Kind::Uint32 => ProtoKind::Uint32,
        Kind::Uint64 => ProtoKind::Uint64,
        Kind::Sint32 => ProtoKind::Sint32,
        Kind::Sint64 => ProtoKind::Sint64,
        Kind::Fixed32 => ProtoKind::Fixed32,
        Kind::Fixed64 => ProtoKind::Fixed64,
        Kind::Sfixed32 => ProtoKind::Sfixed32,
        Kind::Sfixed64 => ProtoKind::Sfixed64,
        Kind::Bool => ProtoKind::Bool,
        Kind::String => ProtoKind::String,
        Kind::Bytes => ProtoKind::Bytes,
        Kind::Message(_) if field.is_group() => ProtoKind::Group,
        Kind::Message(_) => ProtoKind::Message,
        Kind::Enum(_) => ProtoKind::Enum,
    };

    let mut out = SchemaField::new(field.name(), field_number(field), kind);
    out.repeated = field.cardinality() == Cardinality::Repeated;
    match field.kind() {
        Kind::Message(message) => out.message_type = Some(message.full_name().to_string()),
        Kind::Enum(enumeration) => {
            out.enum_values = enumeration
                .values()
                .map(|value| EnumValue {
                    number: value.number(),
                    name: value.name().to_string(),
                })
                .collect();
        }
        _ => {}
    }
    out.options = extension_options(&field.options());
    out
}

fn field_number(field: &FieldDescriptor) -> i32 {
    // protobuf field numbers are at most 2^29 - 1
    i32::try_from(field.number()).unwrap_or(i32::MAX)
}

/// Collect the extension values set on an options message.
fn extension_options(options: &DynamicMessage) -> Vec<RawOption> {
    let mut out = Vec::new();
    for (extension, value) in options.extensions() {
        let Value::Message(message) = value else {
            push_option(&mut out, OptionKey::Number(extension.number()), value);
            continue;
        };
        for (field, value) in message.fields() {
            let key = OptionKey::Nested {
                extension: extension.number(),
                field: field.number(),
            };
            push_option(&mut out, key, value);
        }
    }
    out
}

fn push_option(out: &mut Vec<RawOption>, key: OptionKey, value: &Value) {
    let values = raw_values(value);
    if values.is_empty() {
        debug!(option = %key, "skipping option with unsupported value type");
    }
    out.extend(values.into_iter().map(|v| RawOption::new(key.clone(), v)));
}

/// Flatten a reflected value into option values; lists yield one per element.
fn raw_values(value: &Value) -> Vec<RawOptionValue> {
    match value {
        Value::Bool(b) => vec![RawOptionValue::Bool(*b)],
        Value::I32(v) | Value::EnumNumber(v) => vec![RawOptionValue::Int(i64::from(*v))],
        Value::I64(v) => vec![RawOptionValue::Int(*v)],
        Value::U32(v) => vec![RawOptionValue::Int(i64::from(*v))],
        Value::U64(v) => i64::try_from(*v)
            .map(RawOptionValue::Int)
            .into_iter()
            .collect(),
        Value::String(s) => vec![RawOptionValue::Str(s.clone())],
        Value::List(items) => items.iter().flat_map(raw_values).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod lib_tests;
