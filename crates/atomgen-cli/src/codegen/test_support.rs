//! Shared fixture for emitter tests.

use super::CodegenContext;
use atomgen_core::prelude::*;
use atomgen_core::AtomDecl;

pub const SCHEMA: &str = r#"
[[atoms]]
name = "ble_scan_state_changed"
code = 2
message = "BleScanStateChanged"
options = { module = "bluetooth" }

[[atoms]]
name = "train_info_reported"
code = 3
message = "TrainInfoReported"

[[atoms]]
name = "wakelock_state_changed"
code = 10
message = "WakelockStateChanged"
options = { truncate_timestamp = true, allow_from_any_uid = true }

[[atoms]]
name = "sensor_reading"
code = 20
message = "SensorReading"

[[atoms]]
name = "device_config"
code = 21
message = "DeviceConfig"

[[atoms]]
name = "cpu_cluster_times"
code = 30
message = "CpuClusterTimes"

[[atoms]]
name = "cpu_time_per_uid"
code = 10001
message = "CpuTimePerUid"
oneof = "pulled"
options = { module = "bluetooth" }

[messages.AttributionNode]
fields = [
    { name = "uid", number = 1, kind = "int32", options = { is_uid = true } },
    { name = "tag", number = 2, kind = "string" },
]

[messages.BleScanStateChanged]
doc = "Logs when a BLE scan starts or stops."
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

[messages.TrainInfoReported]
fields = [
    { name = "train_name", number = 1, kind = "string" },
    { name = "experiment_ids", number = 2, kind = "bytes" },
]

[messages.WakelockStateChanged]
fields = [
    { name = "uid", number = 1, kind = "int32", options = { is_uid = true } },
    { name = "tag", number = 2, kind = "string", options = { attribution_tag = true } },
    { name = "level", number = 3, kind = "int32" },
]

[messages.SensorReading]
fields = [{ name = "value", number = 1, kind = "double" }]

[messages.DeviceConfig]
fields = [
    { name = "id", number = 1, kind = "int32" },
    { name = "values", number = 2, kind = "message", message_type = "KeyValuePair", repeated = true },
]

[messages.CpuClusterTimes]
fields = [{ name = "times", number = 1, kind = "int64", repeated = true }]

[messages.CpuTimePerUid]
fields = [
    { name = "uid", number = 1, kind = "int32", options = { is_uid = true } },
    { name = "user_time_micros", number = 2, kind = "int64" },
]
"#;

/// Collated fixture plus the values a [`CodegenContext`] borrows.
pub struct Fixture {
    pub atoms: Atoms,
    pub attribution: AtomDecl,
    pub registry: AnnotationRegistry,
    pub module: ModuleFilter,
}

impl Fixture {
    pub fn new() -> Self {
        Self::for_module(ModuleFilter::All)
    }

    pub fn for_module(module: ModuleFilter) -> Self {
        Self::from_schema(SCHEMA, module)
    }

    pub fn from_schema(toml: &str, module: ModuleFilter) -> Self {
        let schema = AtomSchema::from_toml_str(toml).unwrap();
        let registry = AnnotationRegistry::standard();
        let collation = Collator::new(&registry).collate(&schema);
        assert!(collation.is_clean(), "{:?}", collation.errors);
        let atoms = filter_atoms(&collation.atoms, &module).unwrap();

        Self {
            atoms,
            attribution: collation.attribution_decl,
            registry,
            module,
        }
    }

    pub fn ctx(&self) -> CodegenContext<'_> {
        CodegenContext {
            atoms: &self.atoms,
            attribution: &self.attribution,
            registry: &self.registry,
            module: &self.module,
        }
    }
}
