//! Type Mapper: protobuf field kinds to [`FieldType`]
//!
//! The mapping is permissive. Types that only some languages can print, like
//! `double` and key-value pairs, are accepted here and rejected by the
//! emitters that cannot handle them.

use crate::error::CollationErrorKind;
use crate::schema::{ProtoKind, SchemaField, WellKnownTypes};
use crate::types::FieldType;

/// Map one schema field to its codegen type.
///
/// `log_as_bytes` is the field's `log_mode` marker; it turns an otherwise
/// unsupported nested message into a byte array.
pub fn map_field_type(
    field: &SchemaField,
    well_known: &WellKnownTypes,
    log_as_bytes: bool,
) -> Result<FieldType, CollationErrorKind> {
    let unsupported = |detail: String| CollationErrorKind::UnsupportedType {
        field: field.name.clone(),
        detail,
    };

    if field.kind == ProtoKind::Message {
        let type_name = field.message_type.as_deref().unwrap_or_default();
        if well_known.is_attribution_node(type_name) {
            // repetition is part of the chain, never an array of chains
            return Ok(FieldType::AttributionChain);
        }
        if well_known.is_key_value_pair(type_name) {
            return Ok(FieldType::KeyValuePairs);
        }
        if log_as_bytes && !field.repeated {
            return Ok(FieldType::ByteArray);
        }
        return Err(unsupported(format!("nested message {type_name}")));
    }

    let scalar = scalar_type(field.kind).ok_or_else(|| unsupported(format!("{:?}", field.kind)))?;
    if !field.repeated {
        return Ok(scalar);
    }
    scalar
        .array_of()
        .ok_or_else(|| unsupported(format!("repeated {scalar}")))
}

fn scalar_type(kind: ProtoKind) -> Option<FieldType> {
    let ty = match kind {
        ProtoKind::Bool => FieldType::Bool,
        ProtoKind::Int32
        | ProtoKind::Sint32
        | ProtoKind::Sfixed32
        | ProtoKind::Uint32
        | ProtoKind::Fixed32 => FieldType::Int32,
        ProtoKind::Int64
        | ProtoKind::Sint64
        | ProtoKind::Sfixed64
        | ProtoKind::Uint64
        | ProtoKind::Fixed64 => FieldType::Int64,
        ProtoKind::Float => FieldType::Float,
        ProtoKind::Double => FieldType::Double,
        ProtoKind::String => FieldType::String,
        ProtoKind::Enum => FieldType::Enum,
        ProtoKind::Bytes => FieldType::ByteArray,
        ProtoKind::Group | ProtoKind::Message => return None,
    };
    Some(ty)
}
