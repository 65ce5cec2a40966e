//! Canonical field type system shared by every output language

use std::fmt;

/// Codegen classification of an atom field.
///
/// Variant order is significant: signatures are ordered structurally, so the
/// order here decides the order write functions are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Enum,
    ByteArray,
    /// Repeated attribution node (parallel uid and tag lists)
    AttributionChain,
    /// Heterogeneous int32/int64/float/string map
    KeyValuePairs,
    BoolArray,
    Int32Array,
    Int64Array,
    FloatArray,
    StringArray,
    EnumArray,
}

impl FieldType {
    /// All field types, in declaration order.
    pub const ALL: [FieldType; 16] = [
        FieldType::Bool,
        FieldType::Int32,
        FieldType::Int64,
        FieldType::Float,
        FieldType::Double,
        FieldType::String,
        FieldType::Enum,
        FieldType::ByteArray,
        FieldType::AttributionChain,
        FieldType::KeyValuePairs,
        FieldType::BoolArray,
        FieldType::Int32Array,
        FieldType::Int64Array,
        FieldType::FloatArray,
        FieldType::StringArray,
        FieldType::EnumArray,
    ];

    /// The array variant of a scalar type, if one exists.
    pub fn array_of(self) -> Option<FieldType> {
        match self {
            FieldType::Bool => Some(FieldType::BoolArray),
            FieldType::Int32 => Some(FieldType::Int32Array),
            FieldType::Int64 => Some(FieldType::Int64Array),
            FieldType::Float => Some(FieldType::FloatArray),
            FieldType::String => Some(FieldType::StringArray),
            FieldType::Enum => Some(FieldType::EnumArray),
            _ => None,
        }
    }

    /// Whether this is one of the repeated scalar variants.
    pub fn is_array(self) -> bool {
        matches!(
            self,
            FieldType::BoolArray
                | FieldType::Int32Array
                | FieldType::Int64Array
                | FieldType::FloatArray
                | FieldType::StringArray
                | FieldType::EnumArray
        )
    }

    /// Whether values of this type carry an enum value map.
    pub fn is_enum(self) -> bool {
        matches!(self, FieldType::Enum | FieldType::EnumArray)
    }

    /// The type as it appears in a signature.
    ///
    /// Enums are written as plain int32 on the wire, so `enum` and `int32`
    /// fields share write functions.
    pub fn signature_type(self) -> FieldType {
        match self {
            FieldType::Enum => FieldType::Int32,
            FieldType::EnumArray => FieldType::Int32Array,
            other => other,
        }
    }

    /// Short lowercase name used in mangled signature names and diagnostics.
    pub fn short_name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Enum => "enum",
            FieldType::ByteArray => "bytes",
            FieldType::AttributionChain => "attribution_chain",
            FieldType::KeyValuePairs => "key_value_pairs",
            FieldType::BoolArray => "bool_array",
            FieldType::Int32Array => "int32_array",
            FieldType::Int64Array => "int64_array",
            FieldType::FloatArray => "float_array",
            FieldType::StringArray => "string_array",
            FieldType::EnumArray => "enum_array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Ordered field-type sequence used to deduplicate write functions.
///
/// Equality is structural: two atoms with the same type sequence share a
/// signature regardless of their names or codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature(Vec<FieldType>);

impl Signature {
    /// Build a signature from field types, normalizing enums to int32.
    pub fn from_types(types: impl IntoIterator<Item = FieldType>) -> Self {
        Self(types.into_iter().map(FieldType::signature_type).collect())
    }

    pub fn types(&self) -> &[FieldType] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, ty: FieldType) -> bool {
        self.0.contains(&ty)
    }

    /// Deterministic name derived from the type sequence, e.g. `int32__string`.
    ///
    /// The empty signature is named `void`.
    pub fn mangled_name(&self) -> String {
        if self.0.is_empty() {
            return "void".to_string();
        }
        self.0
            .iter()
            .map(|ty| ty.short_name())
            .collect::<Vec<_>>()
            .join("__")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, "]")
    }
}
