//! Atom and field annotations
//!
//! Custom options on the schema are interpreted through an
//! [`AnnotationRegistry`]: an immutable table built once at startup that maps
//! option extension numbers and names to what they mean, and annotation ids to
//! the constant names emitters print. The registry is passed by reference to
//! the collator and every emitter.

use crate::schema::{OptionKey, RawOption, RawOptionValue};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Field number reserved for atom-level annotations.
pub const ATOM_ID_FIELD_NUMBER: i32 = 0;

/// Log mode value meaning "serialize the nested message as bytes".
pub const LOG_MODE_BYTES: i64 = 2;

/// Extension number of the message-valued `state_field_option`.
pub const STATE_FIELD_OPTION: u32 = 50000;

/// Runtime annotation identifiers, with their wire values.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotationId {
    IsUid = 1,
    TruncateTimestamp = 2,
    PrimaryField = 3,
    ExclusiveState = 4,
    PrimaryFieldFirstUid = 5,
    DefaultState = 6,
    TriggerStateReset = 7,
    StateNested = 8,
    RestrictionCategory = 9,
    FieldRestrictionPeripheralDeviceInfo = 10,
    FieldRestrictionAppUsage = 11,
    FieldRestrictionAppActivity = 12,
    FieldRestrictionHealthConnect = 13,
    FieldRestrictionAccessibility = 14,
    FieldRestrictionSystemSearch = 15,
    FieldRestrictionUserEngagement = 16,
    FieldRestrictionAmbientSensing = 17,
    FieldRestrictionDemographicClassification = 18,
}

impl AnnotationId {
    pub const ALL: [AnnotationId; 18] = [
        AnnotationId::IsUid,
        AnnotationId::TruncateTimestamp,
        AnnotationId::PrimaryField,
        AnnotationId::ExclusiveState,
        AnnotationId::PrimaryFieldFirstUid,
        AnnotationId::DefaultState,
        AnnotationId::TriggerStateReset,
        AnnotationId::StateNested,
        AnnotationId::RestrictionCategory,
        AnnotationId::FieldRestrictionPeripheralDeviceInfo,
        AnnotationId::FieldRestrictionAppUsage,
        AnnotationId::FieldRestrictionAppActivity,
        AnnotationId::FieldRestrictionHealthConnect,
        AnnotationId::FieldRestrictionAccessibility,
        AnnotationId::FieldRestrictionSystemSearch,
        AnnotationId::FieldRestrictionUserEngagement,
        AnnotationId::FieldRestrictionAmbientSensing,
        AnnotationId::FieldRestrictionDemographicClassification,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Whether this annotation belongs to the state-tracking family.
    pub fn is_state(self) -> bool {
        matches!(
            self,
            AnnotationId::PrimaryField
                | AnnotationId::ExclusiveState
                | AnnotationId::PrimaryFieldFirstUid
                | AnnotationId::DefaultState
                | AnnotationId::TriggerStateReset
                | AnnotationId::StateNested
        )
    }

    fn base_name(self) -> &'static str {
        match self {
            AnnotationId::IsUid => "IS_UID",
            AnnotationId::TruncateTimestamp => "TRUNCATE_TIMESTAMP",
            AnnotationId::PrimaryField => "PRIMARY_FIELD",
            AnnotationId::ExclusiveState => "EXCLUSIVE_STATE",
            AnnotationId::PrimaryFieldFirstUid => "PRIMARY_FIELD_FIRST_UID",
            AnnotationId::DefaultState => "DEFAULT_STATE",
            AnnotationId::TriggerStateReset => "TRIGGER_STATE_RESET",
            AnnotationId::StateNested => "STATE_NESTED",
            AnnotationId::RestrictionCategory => "RESTRICTION_CATEGORY",
            AnnotationId::FieldRestrictionPeripheralDeviceInfo => {
                "FIELD_RESTRICTION_PERIPHERAL_DEVICE_INFO"
            }
            AnnotationId::FieldRestrictionAppUsage => "FIELD_RESTRICTION_APP_USAGE",
            AnnotationId::FieldRestrictionAppActivity => "FIELD_RESTRICTION_APP_ACTIVITY",
            AnnotationId::FieldRestrictionHealthConnect => "FIELD_RESTRICTION_HEALTH_CONNECT",
            AnnotationId::FieldRestrictionAccessibility => "FIELD_RESTRICTION_ACCESSIBILITY",
            AnnotationId::FieldRestrictionSystemSearch => "FIELD_RESTRICTION_SYSTEM_SEARCH",
            AnnotationId::FieldRestrictionUserEngagement => "FIELD_RESTRICTION_USER_ENGAGEMENT",
            AnnotationId::FieldRestrictionAmbientSensing => "FIELD_RESTRICTION_AMBIENT_SENSING",
            AnnotationId::FieldRestrictionDemographicClassification => {
                "FIELD_RESTRICTION_DEMOGRAPHIC_CLASSIFICATION"
            }
        }
    }
}

/// Typed annotation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotationValue {
    Int(i32),
    Bool(bool),
}

/// One annotation attached to a field (or the atom id slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Annotation {
    pub id: AnnotationId,
    pub value: AnnotationValue,
}

impl Annotation {
    pub fn int(id: AnnotationId, value: i32) -> Self {
        Self {
            id,
            value: AnnotationValue::Int(value),
        }
    }

    pub fn bool(id: AnnotationId, value: bool) -> Self {
        Self {
            id,
            value: AnnotationValue::Bool(value),
        }
    }
}

/// Annotations on one field, ordered by id.
pub type AnnotationSet = BTreeSet<Annotation>;

/// Annotations of one atom keyed by field number (0 is the atom id).
pub type FieldNumberToAnnotations = BTreeMap<i32, AnnotationSet>;

/// Find the int value of an annotation in a set.
pub fn int_value(annotations: &AnnotationSet, id: AnnotationId) -> Option<i32> {
    annotations.iter().find_map(|a| match a.value {
        AnnotationValue::Int(v) if a.id == id => Some(v),
        _ => None,
    })
}

/// Whether a set carries a `true` boolean annotation.
pub fn has_flag(annotations: &AnnotationSet, id: AnnotationId) -> bool {
    annotations
        .iter()
        .any(|a| a.id == id && a.value == AnnotationValue::Bool(true))
}

/// The reset-to-default pair for a state field.
///
/// Only returned when both halves are present; one without the other has no
/// effect on generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateReset {
    pub reset_value: i32,
    pub default_value: i32,
}

impl StateReset {
    pub fn from_annotations(annotations: &AnnotationSet) -> Option<Self> {
        let reset_value = int_value(annotations, AnnotationId::TriggerStateReset)?;
        let default_value = int_value(annotations, AnnotationId::DefaultState)?;
        Some(Self {
            reset_value,
            default_value,
        })
    }
}

/// Where an option may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    /// On the container oneof field declaring the atom.
    Atom,
    /// On a field of the atom message.
    Field,
}

/// Expected option value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Str,
}

/// What an option means to the collator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTarget {
    Annotation(AnnotationId),
    /// Repeatable module tag.
    Module,
    /// Marks the tag string of a legacy non-chained atom.
    AttributionTag,
    /// Log mode of a nested message field.
    LogMode,
    /// Atom may be logged from any uid.
    AllowFromAnyUid,
}

/// One recognized option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub number: u32,
    /// Sub-field number when the extension is message-valued.
    pub field: Option<u32>,
    pub name: String,
    pub scope: OptionScope,
    pub kind: ValueKind,
    pub target: OptionTarget,
}

/// Interpreted atom-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomOptions {
    pub annotations: AnnotationSet,
    pub modules: BTreeSet<String>,
    pub allow_from_any_uid: bool,
}

/// Interpreted field-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub annotations: AnnotationSet,
    pub attribution_tag: bool,
    pub log_mode: Option<i64>,
}

impl FieldOptions {
    pub fn log_as_bytes(&self) -> bool {
        self.log_mode == Some(LOG_MODE_BYTES)
    }
}

enum Interpreted {
    Annotation(Annotation),
    Module(String),
    AttributionTag,
    LogMode(i64),
    AllowFromAnyUid,
    Nothing,
}

/// Immutable option and annotation-constant table.
#[derive(Debug, Clone)]
pub struct AnnotationRegistry {
    entries: Vec<RegistryEntry>,
    constants: BTreeMap<AnnotationId, String>,
}

impl Default for AnnotationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnnotationRegistry {
    /// Build a registry from explicit entries, with the standard constant names.
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        let constants = AnnotationId::ALL
            .iter()
            .map(|id| (*id, format!("ANNOTATION_ID_{}", id.base_name())))
            .collect();
        Self { entries, constants }
    }

    /// The standard option numbering.
    pub fn standard() -> Self {
        use AnnotationId as Id;
        use OptionScope::{Atom, Field};
        use ValueKind::{Bool, Int, Str};

        let ann = OptionTarget::Annotation;

        let mut entries = vec![
            entry(50001, "is_uid", Field, Bool, ann(Id::IsUid)),
            entry(50002, "log_mode", Field, Int, OptionTarget::LogMode),
            entry(50010, "state_field_primary", Field, Bool, ann(Id::PrimaryField)),
            entry(50011, "state_field_exclusive", Field, Bool, ann(Id::ExclusiveState)),
            entry(
                50012,
                "state_field_primary_first_uid",
                Field,
                Bool,
                ann(Id::PrimaryFieldFirstUid),
            ),
            entry(50013, "state_field_default", Field, Int, ann(Id::DefaultState)),
            entry(50014, "state_field_reset", Field, Int, ann(Id::TriggerStateReset)),
            entry(50015, "state_field_nested", Field, Bool, ann(Id::StateNested)),
            entry(50016, "attribution_tag", Field, Bool, OptionTarget::AttributionTag),
            entry(500004, "module", Atom, Str, OptionTarget::Module),
            entry(500005, "truncate_timestamp", Atom, Bool, ann(Id::TruncateTimestamp)),
            entry(500006, "restriction_category", Atom, Int, ann(Id::RestrictionCategory)),
            entry(500007, "allow_from_any_uid", Atom, Bool, OptionTarget::AllowFromAnyUid),
        ];

        // The `StateAtomFieldOption` message carries the same state hints as
        // the flat extensions above.
        let state_field_option = [
            (1, "primary_field", Bool, ann(Id::PrimaryField)),
            (2, "exclusive_state", Bool, ann(Id::ExclusiveState)),
            (3, "primary_field_first_uid", Bool, ann(Id::PrimaryFieldFirstUid)),
            (4, "default_state_value", Int, ann(Id::DefaultState)),
            (5, "trigger_state_reset_value", Int, ann(Id::TriggerStateReset)),
            (6, "nested", Bool, ann(Id::StateNested)),
        ];
        for (field, name, kind, target) in state_field_option {
            let name = format!("state_field_option.{name}");
            entries.push(RegistryEntry {
                field: Some(field),
                ..entry(STATE_FIELD_OPTION, &name, Field, kind, target)
            });
        }

        let restrictions = [
            (Id::FieldRestrictionPeripheralDeviceInfo, "field_restriction_peripheral_device_info"),
            (Id::FieldRestrictionAppUsage, "field_restriction_app_usage"),
            (Id::FieldRestrictionAppActivity, "field_restriction_app_activity"),
            (Id::FieldRestrictionHealthConnect, "field_restriction_health_connect"),
            (Id::FieldRestrictionAccessibility, "field_restriction_accessibility"),
            (Id::FieldRestrictionSystemSearch, "field_restriction_system_search"),
            (Id::FieldRestrictionUserEngagement, "field_restriction_user_engagement"),
            (Id::FieldRestrictionAmbientSensing, "field_restriction_ambient_sensing"),
            (
                Id::FieldRestrictionDemographicClassification,
                "field_restriction_demographic_classification",
            ),
        ];
        for (number, (id, name)) in (50030..).zip(restrictions) {
            entries.push(entry(number, name, Field, Bool, ann(id)));
        }

        Self::new(entries)
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Look up an option by extension number, nested field or name.
    pub fn resolve(&self, key: &OptionKey) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| match key {
            OptionKey::Number(n) => e.number == *n && e.field.is_none(),
            OptionKey::Nested { extension, field } => {
                e.number == *extension && e.field == Some(*field)
            }
            OptionKey::Name(name) => e.name == *name,
        })
    }

    /// Constant name printed for an annotation id, e.g. `ANNOTATION_ID_IS_UID`.
    pub fn constant_name(&self, id: AnnotationId) -> &str {
        self.constants.get(&id).map(String::as_str).unwrap_or_default()
    }

    /// Every annotation id with its constant name, ordered by id.
    pub fn annotation_constants(&self) -> impl Iterator<Item = (AnnotationId, &str)> {
        self.constants.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Interpret the options on a container oneof field.
    pub fn extract_atom_options(&self, options: &[RawOption]) -> AtomOptions {
        let mut out = AtomOptions::default();
        for option in options {
            match self.interpret(option, OptionScope::Atom) {
                Interpreted::Annotation(a) => {
                    out.annotations.insert(a);
                }
                Interpreted::Module(m) => {
                    out.modules.insert(m);
                }
                Interpreted::AllowFromAnyUid => out.allow_from_any_uid = true,
                Interpreted::AttributionTag | Interpreted::LogMode(_) | Interpreted::Nothing => {}
            }
        }
        out
    }

    /// Interpret the options on an atom message field.
    pub fn extract_field_options(&self, options: &[RawOption]) -> FieldOptions {
        let mut out = FieldOptions::default();
        for option in options {
            match self.interpret(option, OptionScope::Field) {
                Interpreted::Annotation(a) => {
                    out.annotations.insert(a);
                }
                Interpreted::AttributionTag => out.attribution_tag = true,
                Interpreted::LogMode(mode) => out.log_mode = Some(mode),
                Interpreted::Module(_) | Interpreted::AllowFromAnyUid | Interpreted::Nothing => {}
            }
        }
        out
    }

    fn interpret(&self, option: &RawOption, scope: OptionScope) -> Interpreted {
        let Some(entry) = self.resolve(&option.key) else {
            debug!(option = %option.key, "ignoring unrecognized option");
            return Interpreted::Nothing;
        };
        if entry.scope != scope {
            warn!(option = %entry.name, ?scope, "option not valid here, ignoring");
            return Interpreted::Nothing;
        }

        match (entry.kind, &option.value) {
            (ValueKind::Bool, RawOptionValue::Bool(value)) => match entry.target {
                // false markers carry no information
                _ if !value => Interpreted::Nothing,
                OptionTarget::Annotation(id) => Interpreted::Annotation(Annotation::bool(id, true)),
                OptionTarget::AttributionTag => Interpreted::AttributionTag,
                OptionTarget::AllowFromAnyUid => Interpreted::AllowFromAnyUid,
                OptionTarget::Module | OptionTarget::LogMode => Interpreted::Nothing,
            },
            (ValueKind::Int, RawOptionValue::Int(value)) => match entry.target {
                OptionTarget::LogMode => Interpreted::LogMode(*value),
                OptionTarget::Annotation(id) => match i32::try_from(*value) {
                    Ok(v) => Interpreted::Annotation(Annotation::int(id, v)),
                    Err(_) => {
                        warn!(
                            option = %entry.name,
                            value,
                            "annotation value out of int32 range, ignoring"
                        );
                        Interpreted::Nothing
                    }
                },
                _ => Interpreted::Nothing,
            },
            (ValueKind::Str, RawOptionValue::Str(value)) => match entry.target {
                OptionTarget::Module => Interpreted::Module(value.clone()),
                _ => Interpreted::Nothing,
            },
            (expected, value) => {
                warn!(
                    option = %entry.name,
                    ?expected,
                    ?value,
                    "option value has wrong type, ignoring"
                );
                Interpreted::Nothing
            }
        }
    }
}

fn entry(
    number: u32,
    name: &str,
    scope: OptionScope,
    kind: ValueKind,
    target: OptionTarget,
) -> RegistryEntry {
    RegistryEntry {
        number,
        field: None,
        name: name.to_string(),
        scope,
        kind,
        target,
    }
}
