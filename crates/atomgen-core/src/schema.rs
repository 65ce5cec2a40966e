//! Language-neutral schema model
//!
//! Every schema-description format is translated into an [`AtomSchema`] by one
//! pure pass before collation, so the collator never touches a descriptor
//! library directly. This crate ships the TOML/JSON frontend; the protobuf
//! descriptor frontend lives in `atomgen-proto`.
//!
//! # Schema file format
//!
//! ```toml
//! container = "Atom"
//!
//! [[atoms]]
//! name = "ble_scan_state_changed"
//! code = 2
//! message = "BleScanStateChanged"
//! options = { module = ["bluetooth"] }
//!
//! [messages.BleScanStateChanged]
//! doc = "Logged when a BLE scan starts or stops."
//!
//! [[messages.BleScanStateChanged.fields]]
//! name = "attribution_node"
//! number = 1
//! kind = "message"
//! message_type = "AttributionNode"
//! repeated = true
//!
//! [[messages.BleScanStateChanged.fields]]
//! name = "state"
//! number = 2
//! kind = "enum"
//! enum_values = [{ number = 0, name = "OFF" }, { number = 1, name = "ON" }]
//! options = { state_field_exclusive = true }
//! ```
//!
//! Option keys are registry names (`is_uid`) or extension numbers (`"50001"`).

use crate::error::SchemaError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Oneof group name that marks pulled atoms.
pub const ONEOF_PULLED_ATOM_NAME: &str = "pulled";

/// Oneof group name that marks pushed atoms.
pub const ONEOF_PUSHED_ATOM_NAME: &str = "pushed";

/// A complete atom schema: the container's oneof entries plus every message
/// they reference.
#[derive(Debug, Clone, Deserialize)]
pub struct AtomSchema {
    /// Name of the container message holding the atom oneof.
    #[serde(default = "default_container")]
    pub container: String,

    /// One entry per oneof alternative, in declaration order.
    #[serde(default, rename = "atoms")]
    pub entries: Vec<AtomEntry>,

    /// Message definitions keyed by (possibly fully qualified) name.
    #[serde(default)]
    pub messages: BTreeMap<String, SchemaMessage>,

    #[serde(default)]
    pub well_known: WellKnownTypes,
}

fn default_container() -> String {
    "Atom".to_string()
}

/// One alternative of the container oneof.
#[derive(Debug, Clone, Deserialize)]
pub struct AtomEntry {
    /// Field name of the alternative, e.g. `ble_scan_state_changed`.
    pub name: String,

    /// Field number, used as the atom code on the wire.
    pub code: i32,

    /// Name of the message type describing the atom's fields.
    pub message: String,

    /// Oneof group the alternative belongs to.
    #[serde(default = "default_oneof")]
    pub oneof: String,

    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<RawOption>,
}

fn default_oneof() -> String {
    ONEOF_PUSHED_ATOM_NAME.to_string()
}

/// A message definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaMessage {
    /// Filled from the map key when omitted.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub doc: String,

    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// A field of a message definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub number: i32,
    pub kind: ProtoKind,

    #[serde(default)]
    pub repeated: bool,

    /// Referenced message type for `message` fields.
    #[serde(default)]
    pub message_type: Option<String>,

    /// Declared values for `enum` fields, in declaration order.
    #[serde(default)]
    pub enum_values: Vec<EnumValue>,

    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<RawOption>,
}

/// A named enum value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumValue {
    pub number: i32,
    pub name: String,
}

/// Protobuf field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtoKind {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    Uint32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

/// Names of the message types the collator treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WellKnownTypes {
    pub attribution_node: String,
    pub key_value_pair: String,
}

impl Default for WellKnownTypes {
    fn default() -> Self {
        Self {
            attribution_node: "AttributionNode".to_string(),
            key_value_pair: "KeyValuePair".to_string(),
        }
    }
}

impl WellKnownTypes {
    pub fn is_attribution_node(&self, type_name: &str) -> bool {
        type_name_matches(type_name, &self.attribution_node)
    }

    pub fn is_key_value_pair(&self, type_name: &str) -> bool {
        type_name_matches(type_name, &self.key_value_pair)
    }
}

/// Match a type reference against a short or fully qualified name.
fn type_name_matches(type_name: &str, expected: &str) -> bool {
    let type_name = type_name.trim_start_matches('.');
    let expected = expected.trim_start_matches('.');
    type_name == expected
        || type_name
            .strip_suffix(expected)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// How an option is addressed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    /// Extension field number, as found on descriptors.
    Number(u32),
    /// Sub-field of a message-valued extension.
    Nested { extension: u32, field: u32 },
    /// Registry name, as written in schema files.
    Name(String),
}

impl OptionKey {
    /// `"50013"` is a number, `"50000.3"` a nested key; anything else a name.
    fn parse(key: &str) -> Self {
        if let Some((outer, inner)) = key.split_once('.')
            && let (Ok(extension), Ok(field)) = (outer.parse(), inner.parse())
        {
            return OptionKey::Nested { extension, field };
        }
        match key.parse::<u32>() {
            Ok(number) => OptionKey::Number(number),
            Err(_) => OptionKey::Name(key.to_string()),
        }
    }
}

impl std::fmt::Display for OptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionKey::Number(n) => write!(f, "#{n}"),
            OptionKey::Nested { extension, field } => write!(f, "#{extension}.{field}"),
            OptionKey::Name(name) => f.write_str(name),
        }
    }
}

/// Uninterpreted option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// An option attached to a field or atom entry, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOption {
    pub key: OptionKey,
    pub value: RawOptionValue,
}

impl RawOption {
    pub fn new(key: OptionKey, value: RawOptionValue) -> Self {
        Self { key, value }
    }

    pub fn named(name: &str, value: RawOptionValue) -> Self {
        Self::new(OptionKey::Name(name.to_string()), value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionScalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<OptionScalar> for RawOptionValue {
    fn from(value: OptionScalar) -> Self {
        match value {
            OptionScalar::Bool(b) => RawOptionValue::Bool(b),
            OptionScalar::Int(i) => RawOptionValue::Int(i),
            OptionScalar::Str(s) => RawOptionValue::Str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionInput {
    One(OptionScalar),
    Many(Vec<OptionScalar>),
    Table(BTreeMap<String, OptionScalar>),
}

/// Deserialize an option table into a flat option list.
///
/// List values expand into one option per element, which is how repeatable
/// options such as `module` are expressed. A nested table is a message-valued
/// option: each entry becomes its own option keyed `outer.inner`.
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<RawOption>, D::Error>
where
    D: Deserializer<'de>,
{
    let table = BTreeMap::<String, OptionInput>::deserialize(deserializer)?;
    let mut options = Vec::new();
    for (key, input) in table {
        match input {
            OptionInput::One(value) => {
                options.push(RawOption::new(OptionKey::parse(&key), value.into()));
            }
            OptionInput::Many(values) => {
                let key = OptionKey::parse(&key);
                options.extend(
                    values
                        .into_iter()
                        .map(|value| RawOption::new(key.clone(), value.into())),
                );
            }
            OptionInput::Table(fields) => {
                for (inner, value) in fields {
                    let key = OptionKey::parse(&format!("{key}.{inner}"));
                    options.push(RawOption::new(key, value.into()));
                }
            }
        }
    }
    Ok(options)
}

impl AtomSchema {
    /// Create an empty schema with the given container name.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            entries: Vec::new(),
            messages: BTreeMap::new(),
            well_known: WellKnownTypes::default(),
        }
    }

    /// Load a schema file, choosing the format by extension.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let schema: Self = toml::from_str(content)?;
        Ok(schema.with_message_names())
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(content)?;
        Ok(schema.with_message_names())
    }

    fn with_message_names(mut self) -> Self {
        for (key, message) in &mut self.messages {
            if message.name.is_empty() {
                message.name = key.clone();
            }
        }
        self
    }

    /// Add a message definition, keyed by its name.
    pub fn add_message(&mut self, message: SchemaMessage) {
        self.messages.insert(message.name.clone(), message);
    }

    /// Look up a message by exact or short name.
    pub fn message(&self, name: &str) -> Option<&SchemaMessage> {
        let trimmed = name.trim_start_matches('.');
        self.messages.get(trimmed).or_else(|| {
            self.messages
                .iter()
                .find(|(key, _)| type_name_matches(key, trimmed) || type_name_matches(trimmed, key))
                .map(|(_, message)| message)
        })
    }
}

impl SchemaField {
    /// Create a singular field with no options.
    pub fn new(name: impl Into<String>, number: i32, kind: ProtoKind) -> Self {
        Self {
            name: name.into(),
            number,
            kind,
            repeated: false,
            message_type: None,
            enum_values: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    pub fn with_enum_values(mut self, values: &[(i32, &str)]) -> Self {
        self.enum_values = values
            .iter()
            .map(|(number, name)| EnumValue {
                number: *number,
                name: (*name).to_string(),
            })
            .collect();
        self
    }

    pub fn with_option(mut self, option: RawOption) -> Self {
        self.options.push(option);
        self
    }
}

impl SchemaMessage {
    pub fn new(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            fields,
        }
    }
}

impl AtomEntry {
    pub fn new(name: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code,
            message: message.into(),
            oneof: default_oneof(),
            options: Vec::new(),
        }
    }

    pub fn pulled(mut self) -> Self {
        self.oneof = ONEOF_PULLED_ATOM_NAME.to_string();
        self
    }

    pub fn with_option(mut self, option: RawOption) -> Self {
        self.options.push(option);
        self
    }
}
