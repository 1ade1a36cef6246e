//! Line parser for the microcontroller protocol.
//!
//! Pure functions, no IO. A line is either a JSON object of sensor
//! readings or, when it is not JSON at all, the echo of a command that
//! was written to the device.

use serde_json::Map;

use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

/// Top-level keys accepted from a device.
pub const ALLOWED_KEYS: [&str; 11] = [
    "angel_eyes",
    "usb_hub",
    "board",
    "door_locks",
    "key_power",
    "acc_power",
    "unlock_power",
    "rand_1",
    "aux_voltage_raw",
    "main_voltage_raw",
    "gps",
];

/// GPS fields carried as numbers; the rest stay strings.
const GPS_NUMERIC_FIELDS: [&str; 2] = ["speed", "alt"];

/// What a line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// The trimmed echo of a written command.
    Ack(String),
    /// Session updates decoded from a JSON object.
    Updates(Vec<(Topic, Value)>),
}

/// Whether `key` may be published from a device.
#[must_use]
pub fn is_key_allowed(key: &str) -> bool {
    ALLOWED_KEYS.contains(&key)
}

/// Classify and decode one line read from a device.
///
/// Rejected keys and fields are logged and left out of the result.
#[must_use]
pub fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();
    let json = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(json) => json,
        Err(_) => return Line::Ack(trimmed.to_string()),
    };
    match json {
        serde_json::Value::Object(object) => Line::Updates(decode_object(object)),
        serde_json::Value::Null => Line::Updates(Vec::new()),
        other => {
            tracing::warn!(line = %other, "expected a JSON object, dropping line");
            Line::Updates(Vec::new())
        }
    }
}

fn decode_object(object: Map<String, serde_json::Value>) -> Vec<(Topic, Value)> {
    let mut updates = Vec::with_capacity(object.len());
    for (key, json) in object {
        if !is_key_allowed(&key) {
            tracing::warn!(%key, value = %json, "ignoring unknown key");
            continue;
        }
        match json {
            serde_json::Value::Object(fields) if key == "gps" => {
                updates.extend(decode_gps(fields));
            }
            serde_json::Value::Object(_) => {
                tracing::warn!(%key, "nested object only supported for gps, dropping");
            }
            scalar => match Value::try_from(scalar) {
                Ok(value) => updates.push((Topic::new(&key), value)),
                Err(err) => tracing::warn!(%key, error = %err, "unsupported value, dropping"),
            },
        }
    }
    updates
}

fn decode_gps(fields: Map<String, serde_json::Value>) -> Vec<(Topic, Value)> {
    let prefix = Topic::new("gps");
    fields
        .into_iter()
        .filter_map(|(field, json)| {
            let serde_json::Value::String(raw) = json else {
                tracing::warn!(%field, value = %json, "gps field is not a string, dropping");
                return None;
            };
            let raw = raw.trim();
            let value = if GPS_NUMERIC_FIELDS.contains(&field.as_str()) {
                match raw.parse::<f64>() {
                    Ok(number) => Value::Float(number),
                    Err(err) => {
                        tracing::warn!(%field, value = raw, error = %err, "gps field is not a number, dropping");
                        return None;
                    }
                }
            } else {
                Value::from(raw)
            };
            Some((prefix.child(&field), value))
        })
        .collect()
}
