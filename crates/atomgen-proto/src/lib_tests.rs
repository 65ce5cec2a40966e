#![allow(non_snake_case)]

use super::*;
use atomgen_core::{AnnotationRegistry, AtomKind, Collator};
use prost::Message;
use prost_reflect::ExtensionDescriptor;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, OneofDescriptorProto, SourceCodeInfo,
};
use test_case::test_case;

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(format!(".test.{type_name}")),
        ..field(name, number, Type::Message)
    }
}

fn in_oneof(field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(index),
        ..field
    }
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

fn extension(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        extendee: Some(".google.protobuf.FieldOptions".to_string()),
        ..field
    }
}

fn oneof(name: &str) -> OneofDescriptorProto {
    OneofDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn atoms_file() -> FileDescriptorProto {
    let state_enum = EnumDescriptorProto {
        name: Some("State".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("OFF".to_string()),
                number: Some(0),
                ..Default::default()
            },
            EnumValueDescriptorProto {
                name: Some("ON".to_string()),
                number: Some(1),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let mut state_field = field("state", 2, Type::Enum);
    state_field.type_name = Some(".test.State".to_string());

    let container = DescriptorProto {
        oneof_decl: vec![oneof("pushed"), oneof("pulled")],
        ..message(
            "Atom",
            vec![
                in_oneof(message_field("ble_scan_state_changed", 2, "BleScanStateChanged"), 0),
                in_oneof(message_field("cpu_time_per_uid", 10001, "CpuTimePerUid"), 1),
            ],
        )
    };

    let proto3_optional = FieldDescriptorProto {
        proto3_optional: Some(true),
        ..message_field("screen_state_changed", 29, "Plain")
    };
    let optional_container = DescriptorProto {
        oneof_decl: vec![oneof("_screen_state_changed")],
        ..message("OptionalAtom", vec![in_oneof(proto3_optional, 0)])
    };

    FileDescriptorProto {
        name: Some("test/atoms.proto".to_string()),
        package: Some("test".to_string()),
        message_type: vec![
            container,
            message(
                "BleScanStateChanged",
                vec![
                    repeated(message_field("attribution_node", 1, "AttributionNode")),
                    state_field,
                ],
            ),
            message(
                "CpuTimePerUid",
                vec![
                    field("uid", 1, Type::Int32),
                    field("user_time_micros", 2, Type::Uint64),
                    repeated(field("samples", 3, Type::Float)),
                ],
            ),
            message(
                "AttributionNode",
                vec![field("uid", 1, Type::Int32), field("tag", 2, Type::String)],
            ),
            message("Plain", vec![field("x", 1, Type::Int32)]),
            optional_container,
        ],
        enum_type: vec![state_enum],
        ..Default::default()
    }
}

fn descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![atoms_file()],
    }
}

fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(descriptor_set()).unwrap()
}

/// `test/options.proto`: custom field options in the statsd numbering.
fn options_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test/options.proto".to_string()),
        package: Some("test".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        message_type: vec![message(
            "StateAtomFieldOption",
            vec![
                field("primary_field", 1, Type::Bool),
                field("exclusive_state", 2, Type::Bool),
                field("primary_field_first_uid", 3, Type::Bool),
                field("default_state_value", 4, Type::Int32),
                field("trigger_state_reset_value", 5, Type::Int32),
                field("nested", 6, Type::Bool),
            ],
        )],
        extension: vec![
            extension(message_field("state_field_option", 50000, "StateAtomFieldOption")),
            extension(field("is_uid", 50001, Type::Bool)),
            extension(repeated(field("module", 500004, Type::String))),
        ],
        ..Default::default()
    }
}

/// The element of the repeated message field `list` called `name`.
fn named_mut<'a>(
    message: &'a mut DynamicMessage,
    list: &str,
    name: &str,
) -> &'a mut DynamicMessage {
    message
        .get_field_by_name_mut(list)
        .and_then(Value::as_list_mut)
        .unwrap()
        .iter_mut()
        .filter_map(Value::as_message_mut)
        .find(|m| {
            m.get_field_by_name("name")
                .is_some_and(|n| n.as_str() == Some(name))
        })
        .unwrap()
}

fn set_field_options(
    file: &mut DynamicMessage,
    message: &str,
    field: &str,
    extensions: Vec<(ExtensionDescriptor, Value)>,
) {
    let field = named_mut(named_mut(file, "message_type", message), "field", field);
    let options = field
        .get_field_by_name_mut("options")
        .and_then(Value::as_message_mut)
        .unwrap();
    for (extension, value) in extensions {
        options.set_extension(&extension, value);
    }
}

/// Encoded set whose atoms carry option extensions, the way `protoc
/// --include_imports --include_source_info` writes it.
fn annotated_descriptor_set() -> Vec<u8> {
    let descriptor_proto = DescriptorPool::global()
        .get_file_by_name("google/protobuf/descriptor.proto")
        .unwrap()
        .file_descriptor_proto()
        .clone();
    let mut atoms = atoms_file();
    atoms.dependency.push("test/options.proto".to_string());
    atoms.source_code_info = Some(SourceCodeInfo {
        location: vec![Location {
            path: vec![4, 1],
            leading_comments: Some(" Logged when a BLE scan starts or stops.\n".to_string()),
            ..Default::default()
        }],
    });
    let set = FileDescriptorSet {
        file: vec![descriptor_proto, options_file(), atoms],
    };

    // prost-types drops extension fields, so set them through reflection
    let plain = DescriptorPool::from_file_descriptor_set(set.clone()).unwrap();
    let set_descriptor = plain
        .get_message_by_name("google.protobuf.FileDescriptorSet")
        .unwrap();
    let mut encoded =
        DynamicMessage::decode(set_descriptor, set.encode_to_vec().as_slice()).unwrap();
    let ext = |name: &str| plain.get_extension_by_name(name).unwrap();
    let state_option = |fields: &[(&str, Value)]| {
        let descriptor = plain.get_message_by_name("test.StateAtomFieldOption").unwrap();
        let mut option = DynamicMessage::new(descriptor);
        for (name, value) in fields {
            option.set_field_by_name(name, value.clone());
        }
        Value::Message(option)
    };

    let file = named_mut(&mut encoded, "file", "test/atoms.proto");
    set_field_options(
        file,
        "Atom",
        "ble_scan_state_changed",
        vec![(
            ext("test.module"),
            Value::List(vec![Value::String("bluetooth".to_string())]),
        )],
    );
    set_field_options(
        file,
        "BleScanStateChanged",
        "attribution_node",
        vec![(
            ext("test.state_field_option"),
            state_option(&[("primary_field_first_uid", Value::Bool(true))]),
        )],
    );
    set_field_options(
        file,
        "BleScanStateChanged",
        "state",
        vec![(
            ext("test.state_field_option"),
            state_option(&[
                ("exclusive_state", Value::Bool(true)),
                ("default_state_value", Value::I32(0)),
                ("trigger_state_reset_value", Value::I32(0)),
            ]),
        )],
    );
    set_field_options(
        file,
        "CpuTimePerUid",
        "uid",
        vec![(ext("test.is_uid"), Value::Bool(true))],
    );

    encoded.encode_to_vec()
}

fn annotated_pool() -> DescriptorPool {
    DescriptorPool::decode(annotated_descriptor_set().as_slice()).unwrap()
}

#[test]
fn schema_from_pool___container___yields_entry_per_field() {
    let schema = schema_from_pool(&pool(), "test.Atom").unwrap();

    assert_eq!(schema.container, "test.Atom");
    let names: Vec<_> = schema.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ble_scan_state_changed", "cpu_time_per_uid"]);
    assert_eq!(schema.entries[0].code, 2);
    assert_eq!(schema.entries[1].code, 10001);
    assert_eq!(schema.entries[0].message, "test.BleScanStateChanged");
}

#[test_case(0, "pushed")]
#[test_case(1, "pulled")]
fn schema_from_pool___oneof_name___is_carried(index: usize, expected: &str) {
    let schema = schema_from_pool(&pool(), ".test.Atom").unwrap();

    assert_eq!(schema.entries[index].oneof, expected);
}

#[test]
fn schema_from_pool___proto3_optional_field___counts_as_pushed() {
    let schema = schema_from_pool(&pool(), "test.OptionalAtom").unwrap();

    assert_eq!(schema.entries[0].name, "screen_state_changed");
    assert_eq!(schema.entries[0].oneof, ONEOF_PUSHED_ATOM_NAME);
}

#[test]
fn schema_from_pool___fields___translated_with_kinds() {
    let schema = schema_from_pool(&pool(), "test.Atom").unwrap();

    let cpu = schema.message("test.CpuTimePerUid").unwrap();
    assert_eq!(cpu.fields[0].kind, ProtoKind::Int32);
    assert_eq!(cpu.fields[1].kind, ProtoKind::Uint64);
    assert_eq!(cpu.fields[2].kind, ProtoKind::Float);
    assert!(cpu.fields[2].repeated);
}

#[test]
fn schema_from_pool___enum_field___keeps_values() {
    let schema = schema_from_pool(&pool(), "test.Atom").unwrap();

    let ble = schema.message("test.BleScanStateChanged").unwrap();
    let state = &ble.fields[1];
    assert_eq!(state.kind, ProtoKind::Enum);
    assert_eq!(
        state.enum_values,
        vec![
            EnumValue {
                number: 0,
                name: "OFF".to_string()
            },
            EnumValue {
                number: 1,
                name: "ON".to_string()
            },
        ]
    );
}

#[test]
fn schema_from_pool___referenced_messages___are_translated() {
    let schema = schema_from_pool(&pool(), "test.Atom").unwrap();

    assert!(schema.message("test.AttributionNode").is_some());
    assert!(schema.message("test.Plain").is_none());
    let chain = &schema.message("test.BleScanStateChanged").unwrap().fields[0];
    assert_eq!(chain.message_type.as_deref(), Some("test.AttributionNode"));
    assert!(chain.repeated);
}

#[test]
fn schema_from_pool___unknown_container___is_error() {
    let result = schema_from_pool(&pool(), "test.Missing");

    assert!(matches!(result, Err(ProtoError::ContainerNotFound(name)) if name == "test.Missing"));
}

#[test]
fn schema_from_pool___scalar_container_field___is_error() {
    let result = schema_from_pool(&pool(), "test.Plain");

    assert!(matches!(result, Err(ProtoError::NonMessageAtom { .. })));
}

#[test]
fn load_descriptor_pool___encoded_set___decodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atoms.pb");
    std::fs::write(&path, descriptor_set().encode_to_vec()).unwrap();

    let pool = load_descriptor_pool(&path).unwrap();

    assert!(pool.get_message_by_name("test.Atom").is_some());
}

#[test]
fn load_descriptor_pool___missing_file___is_io_error() {
    let result = load_descriptor_pool("/nonexistent/atoms.pb");

    assert!(matches!(result, Err(ProtoError::Io { .. })));
}

#[test]
fn load_descriptor_pool___garbage___is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atoms.pb");
    std::fs::write(&path, b"\xff\xff\xff").unwrap();

    let result = load_descriptor_pool(&path);

    assert!(matches!(result, Err(ProtoError::Decode(_))));
}

#[test_case(Value::Bool(true), vec![RawOptionValue::Bool(true)])]
#[test_case(Value::I32(-3), vec![RawOptionValue::Int(-3)])]
#[test_case(Value::EnumNumber(2), vec![RawOptionValue::Int(2)])]
#[test_case(Value::U64(u64::MAX), vec![])]
#[test_case(Value::String("wifi".into()), vec![RawOptionValue::Str("wifi".into())])]
#[test_case(
    Value::List(vec![Value::String("a".into()), Value::String("b".into())]),
    vec![RawOptionValue::Str("a".into()), RawOptionValue::Str("b".into())]
)]
#[test_case(Value::F64(1.5), vec![])]
fn raw_values___reflected_value___flattens(value: Value, expected: Vec<RawOptionValue>) {
    assert_eq!(raw_values(&value), expected);
}

#[test]
fn extension_options___no_extensions___is_empty() {
    let pool = pool();
    let descriptor = pool.get_message_by_name("test.Atom").unwrap();
    let field = descriptor.fields().next().unwrap();

    assert!(extension_options(&field.options()).is_empty());
}

#[test]
fn extension_options___message_valued_extension___one_option_per_set_field() {
    let pool = annotated_pool();
    let ble = pool.get_message_by_name("test.BleScanStateChanged").unwrap();
    let chain = ble.get_field_by_name("attribution_node").unwrap();

    let options = extension_options(&chain.options());

    assert_eq!(
        options,
        vec![RawOption::new(
            OptionKey::Nested {
                extension: 50000,
                field: 3
            },
            RawOptionValue::Bool(true)
        )]
    );
}

#[test]
fn extension_options___scalar_and_repeated_extensions___keyed_by_number() {
    let pool = annotated_pool();
    let uid = pool
        .get_message_by_name("test.CpuTimePerUid")
        .unwrap()
        .get_field_by_name("uid")
        .unwrap();
    let atom = pool
        .get_message_by_name("test.Atom")
        .unwrap()
        .get_field_by_name("ble_scan_state_changed")
        .unwrap();

    assert_eq!(
        extension_options(&uid.options()),
        vec![RawOption::new(OptionKey::Number(50001), RawOptionValue::Bool(true))]
    );
    assert_eq!(
        extension_options(&atom.options()),
        vec![RawOption::new(
            OptionKey::Number(500004),
            RawOptionValue::Str("bluetooth".to_string())
        )]
    );
}

#[test]
fn schema_from_pool___annotated_descriptors___collate_into_state_atom() {
    let schema = schema_from_pool(&annotated_pool(), "test.Atom").unwrap();
    let registry = AnnotationRegistry::standard();

    let collation = Collator::new(&registry).collate(&schema);

    assert!(collation.is_clean(), "{:?}", collation.errors);
    let ble = collation.atoms.get(2).unwrap();
    assert_eq!(ble.modules, ["bluetooth".to_string()].into_iter().collect());
    assert_eq!(ble.primary_fields, vec![0]);
    assert_eq!(ble.exclusive_field, Some(2));
    assert_eq!(ble.default_state, Some(0));
    assert_eq!(ble.trigger_state_reset, Some(0));
    let cpu = collation.atoms.get(10001).unwrap();
    assert_eq!(cpu.kind, AtomKind::Pulled);
    assert_eq!(cpu.uid_field, Some(1));
}

#[test]
fn schema_from_pool___source_info___leading_comment_becomes_doc() {
    let schema = schema_from_pool(&annotated_pool(), "test.Atom").unwrap();

    let ble = schema.message("test.BleScanStateChanged").unwrap();
    assert_eq!(ble.doc, " Logged when a BLE scan starts or stops.\n");
    assert_eq!(schema.message("test.CpuTimePerUid").unwrap().doc, "");
}

#[test]
fn schema_from_pool___no_source_info___doc_is_empty() {
    let schema = schema_from_pool(&pool(), "test.Atom").unwrap();

    assert_eq!(schema.message("test.BleScanStateChanged").unwrap().doc, "");
}
