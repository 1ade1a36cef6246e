//! Topic and payload formatting for the broker.
//!
//! Pure functions. A store topic `gps.lat` in the Session store becomes
//! the relative path `session/gps/lat`; the broker topic prefixes it with
//! the configured base.

use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

/// Relative path of `topic` in `store`: dots become slashes.
#[must_use]
pub fn relative_path(store: &str, topic: &Topic) -> String {
    format!("{store}/{}", topic.as_str().replace('.', "/")).to_lowercase()
}

/// Render `value` as `(relative path, payload)` pairs.
///
/// Scalars yield one pair; maps expand into one pair per leaf under
/// sub-paths.
#[must_use]
pub fn payloads(path: &str, value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect(path.to_string(), value, &mut out);
    out
}

fn collect(path: String, value: &Value, out: &mut Vec<(String, String)>) {
    let payload = match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:.6}"),
        Value::String(s) => s.to_lowercase(),
        Value::Map(map) => {
            for (key, nested) in map {
                collect(format!("{path}/{}", key.to_lowercase()), nested, out);
            }
            return;
        }
    };
    out.push((path, payload));
}
