#![allow(non_snake_case)]

use super::*;
use crate::codegen::test_support::Fixture;
use atomgen_core::ModuleFilter;

fn header(fixture: &Fixture) -> String {
    NativeEmitter::new(fixture.ctx(), "android,util", "statslog.h").render_header()
}

fn source(fixture: &Fixture) -> String {
    NativeEmitter::new(fixture.ctx(), "android,util", "statslog.h").render_source()
}

// Header tests

#[test]
fn render_header___namespaces___opened_and_closed_in_order() {
    let header = header(&Fixture::new());

    assert!(header.starts_with("// This file is autogenerated\n\n#pragma once\n"));
    assert!(header.contains("namespace android {\nnamespace util {\n"));
    assert!(header.ends_with("} // namespace util\n} // namespace android\n"));
}

#[test]
fn render_header___atom_codes___one_constant_per_atom() {
    let header = header(&Fixture::new());

    assert!(header.contains("    BLE_SCAN_STATE_CHANGED = 2,\n"));
    assert!(header.contains("    WAKELOCK_STATE_CHANGED = 10,\n"));
    assert!(header.contains("    CPU_TIME_PER_UID = 10001,\n"));
    assert!(header.contains("     * Logs when a BLE scan starts or stops.\n"));
}

#[test]
fn render_header___usage_comment___uses_field_names() {
    let header = header(&Fixture::new());

    assert!(header.contains(
        "     * Usage: stats_write(BLE_SCAN_STATE_CHANGED, const int32_t* uid, size_t uid_length, \
         const std::vector<char const*>& tag, int32_t state);\n"
    ));
    assert!(header.contains(
        "     * Usage: addAStatsEvent(pulled_data, CPU_TIME_PER_UID, int32_t uid, int64_t user_time_micros);\n"
    ));
}

#[test]
fn render_header___enum_values___prefixed_with_atom_and_field() {
    let header = header(&Fixture::new());

    assert!(header.contains("const int32_t BLE_SCAN_STATE_CHANGED__STATE__OFF = 0;\n"));
    assert!(header.contains("const int32_t BLE_SCAN_STATE_CHANGED__STATE__RESET = 2;\n"));
}

#[test]
fn render_header___annotation_constants___listed_by_id() {
    let header = header(&Fixture::new());

    assert!(header.contains("const uint8_t ANNOTATION_ID_IS_UID = 1;\n"));
    assert!(header.contains("const uint8_t ANNOTATION_ID_TRIGGER_STATE_RESET = 7;\n"));
    let first = header.find("ANNOTATION_ID_IS_UID").unwrap();
    let second = header.find("ANNOTATION_ID_TRUNCATE_TIMESTAMP").unwrap();
    assert!(first < second);
}

#[test]
fn render_header___declarations___one_per_supported_signature() {
    let header = header(&Fixture::new());

    assert!(header.contains(
        "int stats_write(int32_t code, const int32_t* uid, size_t uid_length, \
         const std::vector<char const*>& tag, int32_t arg2);\n"
    ));
    assert!(header.contains(
        "int stats_write(int32_t code, char const* arg1, const BytesField& arg2);\n"
    ));
    assert!(header.contains("int stats_write(int32_t code, const std::vector<int64_t>& arg1);\n"));
    assert_eq!(header.matches("int stats_write(").count(), 3);
}

#[test]
fn render_header___non_chained_and_pulled___declared() {
    let header = header(&Fixture::new());

    assert!(header.contains(
        "int stats_write_non_chained(int32_t code, int32_t arg1, char const* arg2, int32_t arg3);\n"
    ));
    assert!(header.contains(
        "void addAStatsEvent(AStatsEventList* pulled_data, int32_t code, int32_t arg1, int64_t arg2);\n"
    ));
    assert!(header.contains("#include <stats_pull_atom_callback.h>\n"));
}

#[test]
fn render_header___double_and_key_value___skipped() {
    let header = header(&Fixture::new());

    assert!(!header.contains("double arg"));
    assert!(!header.contains("KeyValue"));
}

#[test]
fn render_header___default_module___has_atoms_info() {
    let header = header(&Fixture::new());

    assert!(header.contains("struct StateAtomFieldOptions {\n"));
    assert!(header.contains("  const static std::set<int> kTruncatingTimestampAtomBlackList;\n"));
    assert!(header.contains("const static int kMaxPushedAtomId = 30;\n"));
}

#[test]
fn render_header___named_module___omits_atoms_info() {
    let fixture = Fixture::for_module(ModuleFilter::parse("bluetooth"));

    let header = header(&fixture);

    assert!(!header.contains("AtomsInfo"));
    assert!(!header.contains("kMaxPushedAtomId"));
    assert!(header.contains("BLE_SCAN_STATE_CHANGED = 2"));
    assert!(!header.contains("TRAIN_INFO_REPORTED"));
}

// Source tests

#[test]
fn render_source___includes_import_header() {
    let source = source(&Fixture::new());

    assert!(source.contains("#include <statslog.h>\n#include <stats_event.h>\n"));
}

#[test]
fn render_source___shared_signature___annotations_per_code() {
    let source = source(&Fixture::new());

    let expected = "\
    AStatsEvent_setAtomId(event, code);
    if (WAKELOCK_STATE_CHANGED == code) {
        AStatsEvent_addBoolAnnotation(event, ANNOTATION_ID_TRUNCATE_TIMESTAMP, true);
    }
    AStatsEvent_writeAttributionChain(event, reinterpret_cast<const uint32_t*>(uid), tag.data(), static_cast<uint8_t>(uid_length));
    if (BLE_SCAN_STATE_CHANGED == code) {
        AStatsEvent_addBoolAnnotation(event, ANNOTATION_ID_PRIMARY_FIELD_FIRST_UID, true);
    }
    AStatsEvent_writeInt32(event, arg2);
    if (BLE_SCAN_STATE_CHANGED == code) {
        AStatsEvent_addBoolAnnotation(event, ANNOTATION_ID_EXCLUSIVE_STATE, true);
        if (arg2 == 2) {
            AStatsEvent_addInt32Annotation(event, ANNOTATION_ID_TRIGGER_STATE_RESET, 0);
        }
    }
    const int ret = AStatsEvent_write(event);
";
    assert!(source.contains(expected), "{source}");
}

#[test]
fn render_source___bytes_and_arrays___written_with_lengths() {
    let source = source(&Fixture::new());

    assert!(source.contains(
        "    AStatsEvent_writeByteArray(event, reinterpret_cast<const uint8_t*>(arg2.arg), arg2.arg_length);\n"
    ));
    assert!(source.contains("    AStatsEvent_writeInt64Array(event, arg1.data(), arg1.size());\n"));
}

#[test]
fn render_source___non_chained___delegates_to_chained_overload() {
    let source = source(&Fixture::new());

    let expected = "\
int stats_write_non_chained(int32_t code, int32_t arg1, char const* arg2, int32_t arg3) {
    const int32_t* uid = &arg1;
    const size_t uid_length = 1;
    const std::vector<char const*> tag(1, arg2);
    return stats_write(code, uid, uid_length, tag, arg3);
}
";
    assert!(source.contains(expected), "{source}");
}

#[test]
fn render_source___pulled___builds_into_list() {
    let source = source(&Fixture::new());

    assert!(source.contains(
        "void addAStatsEvent(AStatsEventList* pulled_data, int32_t code, int32_t arg1, int64_t arg2) {\n\
         \x20   AStatsEvent* event = AStatsEventList_addStatsEvent(pulled_data);\n"
    ));
    assert!(source.contains(
        "    if (CPU_TIME_PER_UID == code) {\n        \
         AStatsEvent_addBoolAnnotation(event, ANNOTATION_ID_IS_UID, true);\n    }\n"
    ));
    assert!(source.contains("    AStatsEvent_build(event);\n}\n"));
}

#[test]
fn render_source___default_module___writes_atoms_info_tables() {
    let source = source(&Fixture::new());

    assert!(source.contains(
        "const std::set<int> AtomsInfo::kTruncatingTimestampAtomBlackList = {\n    WAKELOCK_STATE_CHANGED,\n};\n"
    ));
    assert!(source.contains(
        "const std::set<int> AtomsInfo::kAtomsWithAttributionChain = {\n    BLE_SCAN_STATE_CHANGED,\n    WAKELOCK_STATE_CHANGED,\n};\n"
    ));
    assert!(source.contains("    uidField[static_cast<int>(CPU_TIME_PER_UID)] = 1;\n"));
    assert!(source.contains("    opt.primaryFields.push_back(0);\n    opt.exclusiveField = 2;\n"));
    assert!(source.contains("    options[static_cast<int>(TRAIN_INFO_REPORTED)].push_back(2);\n"));
}

#[test]
fn render_source___functions___ordered_by_signature() {
    let source = source(&Fixture::new());

    let bytes = source.find("// Signature: string__bytes").unwrap();
    let chain = source.find("// Signature: attribution_chain__int32").unwrap();
    let array = source.find("// Signature: int64_array").unwrap();
    assert!(bytes < chain && chain < array);
}

#[test]
fn render_source___reset_without_default___no_conditional() {
    let schema = r#"
[[atoms]]
name = "screen_state_changed"
code = 29
message = "ScreenStateChanged"

[messages.ScreenStateChanged]
fields = [
    { name = "state", number = 1, kind = "int32", options = { state_field_exclusive = true, state_field_reset = 3 } },
]
"#;
    let fixture = Fixture::from_schema(schema, ModuleFilter::All);

    let source = source(&fixture);

    assert!(source.contains("ANNOTATION_ID_EXCLUSIVE_STATE, true);\n"));
    assert!(!source.contains("if (arg1 =="));
    assert!(!source.contains("TRIGGER_STATE_RESET"));
}

#[test]
fn supports_type___double_and_key_value___unsupported() {
    let fixture = Fixture::new();
    let emitter = NativeEmitter::new(fixture.ctx(), "a", "b.h");

    assert!(!emitter.supports_type(FieldType::Double));
    assert!(!emitter.supports_type(FieldType::KeyValuePairs));
    assert!(emitter.supports_type(FieldType::AttributionChain));
    assert!(emitter.supports_type(FieldType::StringArray));
}
