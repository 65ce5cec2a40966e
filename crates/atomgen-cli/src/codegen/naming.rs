//! Naming convention utilities for code generation.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `ble_scan_state_changed` | [`make_constant_name`] | `BLE_SCAN_STATE_CHANGED` |
//! | `BleScanStateChanged` | [`make_constant_name`] | `BLE_SCAN_STATE_CHANGED` |
//! | `snake_case` | [`to_pascal_case`] | `SnakeCase` |

/// Convert an atom, field or enum value name to an upper-case constant name.
///
/// An underscore is inserted where a lower-case letter is followed by an
/// upper-case one, so both snake_case and CamelCase input give the same
/// result.
pub fn make_constant_name(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut underscore_next = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if underscore_next {
                result.push('_');
                underscore_next = false;
            }
            result.push(c);
        } else if c.is_ascii_lowercase() {
            result.push(c.to_ascii_uppercase());
            underscore_next = true;
        } else {
            if c == '_' {
                underscore_next = false;
            }
            result.push(c);
        }
    }

    result
}

/// Constant name of one enum value: `ATOM__FIELD__VALUE`.
pub fn enum_value_constant(atom: &str, field: &str, value: &str) -> String {
    format!(
        "{}__{}__{}",
        make_constant_name(atom),
        make_constant_name(field),
        make_constant_name(value)
    )
}

/// Convert a string to PascalCase.
///
/// Handles snake_case, kebab-case, and already-capitalized input.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn make_constant_name___snake_case___upper_cases() {
        assert_eq!(make_constant_name("ble_scan_state_changed"), "BLE_SCAN_STATE_CHANGED");
        assert_eq!(make_constant_name("state"), "STATE");
    }

    #[test]
    fn make_constant_name___camel_case___splits_words() {
        assert_eq!(make_constant_name("BleScanStateChanged"), "BLE_SCAN_STATE_CHANGED");
        assert_eq!(make_constant_name("uidTag"), "UID_TAG");
    }

    #[test]
    fn make_constant_name___already_constant___unchanged() {
        assert_eq!(make_constant_name("STATE_ON"), "STATE_ON");
        assert_eq!(make_constant_name("ON"), "ON");
    }

    #[test]
    fn make_constant_name___digits___kept_in_place() {
        assert_eq!(make_constant_name("wifi_5ghz_scan"), "WIFI_5GHZ_SCAN");
    }

    #[test]
    fn enum_value_constant___joins_with_double_underscore() {
        assert_eq!(
            enum_value_constant("ble_scan_state_changed", "state", "OFF"),
            "BLE_SCAN_STATE_CHANGED__STATE__OFF"
        );
    }

    #[test]
    fn to_pascal_case___converts_snake_case() {
        assert_eq!(to_pascal_case("ble_scan_state_changed"), "BleScanStateChanged");
        assert_eq!(to_pascal_case("hello-world"), "HelloWorld");
    }

    #[test]
    fn to_pascal_case___handles_edge_cases() {
        assert_eq!(to_pascal_case(""), "");
        assert_eq!(to_pascal_case("HelloWorld"), "HelloWorld");
    }
}
