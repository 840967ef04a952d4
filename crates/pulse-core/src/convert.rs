// ── Property conversion ──
//
// Per-property rules applied before a raw device value reaches the
// cache: unit conversion, composite decomposition, and derived
// booleans. Each rule writes every key it produces or none of them.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::model::property::{
    HDMI_SIGNAL, ILLUMINATION, ILLUMINATION_STATE, INPUT_ACTIVE, INPUT_SIGNAL, LASER,
    LASER_STATUS, OUTPUT_HRES, OUTPUT_RES, OUTPUT_SIZE, OUTPUT_VRES, is_temperature,
};

/// A device value did not have the shape its rule expects.
#[derive(Debug, Error)]
#[error("{property}: expected {expected}, got {value}")]
pub struct RuleError {
    pub property: String,
    pub expected: &'static str,
    pub value: Value,
}

/// Entries a single raw property expands to.
pub type Converted = Vec<(String, Value)>;

/// Convert one raw `property → value` pair into the cache entries it
/// produces.
pub fn convert(property: &str, value: &Value) -> Result<Converted, RuleError> {
    match property {
        HDMI_SIGNAL => hdmi_signal(value),
        OUTPUT_SIZE => output_size(value),
        p if is_temperature(p) => temperature(p, value),
        ILLUMINATION_STATE => Ok(with_on_flag(property, value, ILLUMINATION)),
        LASER_STATUS => Ok(with_on_flag(property, value, LASER)),
        _ => Ok(vec![(property.to_owned(), value.clone())]),
    }
}

/// Apply `convert` and store the result, returning the keys written.
pub fn apply_into(
    values: &mut BTreeMap<String, Value>,
    property: &str,
    value: &Value,
) -> Result<Vec<String>, RuleError> {
    let entries = convert(property, value)?;
    Ok(entries
        .into_iter()
        .map(|(key, value)| {
            values.insert(key.clone(), value);
            key
        })
        .collect())
}

// ── Rules ────────────────────────────────────────────────────────────

fn hdmi_signal(value: &Value) -> Result<Converted, RuleError> {
    let active = value
        .get("active")
        .and_then(Value::as_bool)
        .ok_or_else(|| shape(HDMI_SIGNAL, "an object with boolean `active`", value))?;
    let name = value
        .get("name")
        .cloned()
        .ok_or_else(|| shape(HDMI_SIGNAL, "an object with `name`", value))?;

    Ok(vec![
        (INPUT_ACTIVE.into(), Value::Bool(active)),
        (INPUT_SIGNAL.into(), name),
    ])
}

fn output_size(value: &Value) -> Result<Converted, RuleError> {
    let dimension = |field: &str| {
        value
            .get(field)
            .filter(|v| v.is_number())
            .cloned()
            .ok_or_else(|| shape(OUTPUT_SIZE, "an object with numeric `pixels` and `lines`", value))
    };
    let pixels = dimension("pixels")?;
    let lines = dimension("lines")?;
    let resolution = format!("{pixels}x{lines}");

    Ok(vec![
        (OUTPUT_HRES.into(), pixels),
        (OUTPUT_VRES.into(), lines),
        (OUTPUT_RES.into(), Value::String(resolution)),
    ])
}

fn temperature(property: &str, value: &Value) -> Result<Converted, RuleError> {
    let raw = value
        .as_f64()
        .ok_or_else(|| shape(property, "a number", value))?;
    Ok(vec![(property.to_owned(), Value::from(to_fahrenheit(raw)))])
}

/// Device reports Celsius; consumers get Fahrenheit.
pub fn to_fahrenheit(celsius: f64) -> f64 {
    celsius / 5.0 * 9.0 + 32.0
}

fn with_on_flag(property: &str, value: &Value, flag: &str) -> Converted {
    vec![
        (property.to_owned(), value.clone()),
        (flag.to_owned(), Value::Bool(value.as_str() == Some("On"))),
    ]
}

fn shape(property: &str, expected: &'static str, value: &Value) -> RuleError {
    RuleError {
        property: property.to_owned(),
        expected,
        value: value.clone(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::property::{INLET_TEMPERATURE, MAINBOARD_TEMPERATURE, SYSTEM_STATE};

    fn converted(property: &str, value: Value) -> BTreeMap<String, Value> {
        convert(property, &value).unwrap().into_iter().collect()
    }

    #[test]
    fn temperature_converts_to_fahrenheit() {
        assert_eq!(
            converted(INLET_TEMPERATURE, json!(100)),
            BTreeMap::from([(INLET_TEMPERATURE.to_owned(), json!(212.0))])
        );
        assert_eq!(
            converted(MAINBOARD_TEMPERATURE, json!(0)),
            BTreeMap::from([(MAINBOARD_TEMPERATURE.to_owned(), json!(32.0))])
        );
    }

    #[test]
    fn fahrenheit_arithmetic_is_exact() {
        assert_eq!(to_fahrenheit(100.0), 212.0);
        assert_eq!(to_fahrenheit(0.0), 32.0);
        assert_eq!(to_fahrenheit(37.5), 37.5 / 5.0 * 9.0 + 32.0);
    }

    #[test]
    fn non_numeric_temperature_is_rejected() {
        let err = convert(INLET_TEMPERATURE, &json!("hot")).unwrap_err();
        assert_eq!(err.property, INLET_TEMPERATURE);
    }

    #[test]
    fn hdmi_signal_decomposes() {
        assert_eq!(
            converted(HDMI_SIGNAL, json!({"active": true, "name": "HDMI1"})),
            BTreeMap::from([
                (INPUT_ACTIVE.to_owned(), json!(true)),
                (INPUT_SIGNAL.to_owned(), json!("HDMI1")),
            ])
        );
    }

    #[test]
    fn hdmi_signal_without_active_is_rejected() {
        assert!(convert(HDMI_SIGNAL, &json!({"name": "HDMI1"})).is_err());
        assert!(convert(HDMI_SIGNAL, &json!("HDMI1")).is_err());
    }

    #[test]
    fn output_size_decomposes() {
        assert_eq!(
            converted(OUTPUT_SIZE, json!({"pixels": 3840, "lines": 2160})),
            BTreeMap::from([
                (OUTPUT_HRES.to_owned(), json!(3840)),
                (OUTPUT_VRES.to_owned(), json!(2160)),
                (OUTPUT_RES.to_owned(), json!("3840x2160")),
            ])
        );
    }

    #[test]
    fn output_size_missing_lines_is_rejected() {
        assert!(convert(OUTPUT_SIZE, &json!({"pixels": 1920})).is_err());
    }

    #[test]
    fn illumination_and_laser_derive_flags() {
        assert_eq!(
            converted(ILLUMINATION_STATE, json!("On")),
            BTreeMap::from([
                (ILLUMINATION_STATE.to_owned(), json!("On")),
                (ILLUMINATION.to_owned(), json!(true)),
            ])
        );
        assert_eq!(
            converted(LASER_STATUS, json!("Off")),
            BTreeMap::from([
                (LASER_STATUS.to_owned(), json!("Off")),
                (LASER.to_owned(), json!(false)),
            ])
        );
    }

    #[test]
    fn other_properties_pass_through() {
        assert_eq!(
            converted(SYSTEM_STATE, json!("standby")),
            BTreeMap::from([(SYSTEM_STATE.to_owned(), json!("standby"))])
        );
    }

    #[test]
    fn apply_into_reports_written_keys() {
        let mut values = BTreeMap::new();
        let keys = apply_into(&mut values, OUTPUT_SIZE, &json!({"pixels": 1920, "lines": 1080})).unwrap();
        assert_eq!(keys, vec![OUTPUT_HRES, OUTPUT_VRES, OUTPUT_RES]);
        assert!(!values.contains_key(OUTPUT_SIZE));
    }
}
