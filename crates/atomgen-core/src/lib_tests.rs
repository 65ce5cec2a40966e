#![allow(non_snake_case)]

use super::prelude::*;
use crate::schema::ONEOF_PULLED_ATOM_NAME;

const SCHEMA: &str = r#"
[[atoms]]
name = "ble_scan_state_changed"
code = 2
message = "BleScanStateChanged"
options = { module = "bluetooth" }

[[atoms]]
name = "boot_sequence_reported"
code = 57
message = "BootSequenceReported"

[[atoms]]
name = "bluetooth_bytes_transfer"
code = 10006
message = "BluetoothBytesTransfer"
oneof = "pulled"
options = { module = "bluetooth" }

[messages.BleScanStateChanged]
[[messages.BleScanStateChanged.fields]]
name = "attribution_node"
number = 1
kind = "message"
message_type = "AttributionNode"
repeated = true
options = { state_field_primary_first_uid = true }

[[messages.BleScanStateChanged.fields]]
name = "state"
number = 2
kind = "enum"
enum_values = [{ number = 0, name = "OFF" }, { number = 1, name = "ON" }, { number = 2, name = "RESET" }]
options = { state_field_exclusive = true, state_field_default = 0, state_field_reset = 2 }

[messages.BootSequenceReported]
fields = [
    { name = "bootloader_reason", number = 1, kind = "string" },
    { name = "system_reason", number = 2, kind = "string" },
    { name = "end_time_millis", number = 3, kind = "int64" },
    { name = "total_duration_millis", number = 4, kind = "int64" },
    { name = "bootloader_duration_millis", number = 5, kind = "int64" },
    { name = "time_since_last_boot", number = 6, kind = "int64" },
]

[messages.BluetoothBytesTransfer]
fields = [
    { name = "uid", number = 1, kind = "int32", options = { is_uid = true } },
    { name = "rx_bytes", number = 2, kind = "int64" },
]
"#;

#[test]
fn collate___sample_schema___clean_and_ordered() {
    let schema = AtomSchema::from_toml_str(SCHEMA).unwrap();
    let registry = AnnotationRegistry::standard();

    let collation = Collator::new(&registry).collate(&schema);

    assert!(collation.is_clean(), "{:?}", collation.errors);
    assert_eq!(collation.atoms.codes(), vec![2, 57, 10006]);
    assert_eq!(collation.atoms.signatures.len(), 2);
    assert_eq!(collation.atoms.pulled_signatures.len(), 1);
    assert_eq!(collation.atoms.max_pushed_atom_id, 57);
    assert_eq!(schema.entries[2].oneof, ONEOF_PULLED_ATOM_NAME);
}

#[test]
fn filter_atoms___sample_schema___keeps_bluetooth_atoms() {
    let schema = AtomSchema::from_toml_str(SCHEMA).unwrap();
    let registry = AnnotationRegistry::standard();
    let collation = Collator::new(&registry).collate(&schema);

    let filtered = filter_atoms(&collation.atoms, &ModuleFilter::parse("bluetooth")).unwrap();

    assert_eq!(filtered.codes(), vec![2, 10006]);
    assert_eq!(filtered.signatures.len(), 1);
    assert_eq!(
        filtered.signatures.keys().next().map(Signature::types),
        Some(&[FieldType::AttributionChain, FieldType::Int32][..])
    );
}
