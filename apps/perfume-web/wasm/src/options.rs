//! JavaScript option objects to engine configuration

use perfume_core::Config;
use serde_json::{Map, Value};

/// Option keys copied from the JS object, with their expected kind
pub const OPTION_KEYS: &[(&str, OptionKind)] = &[
    ("dataConsumption", OptionKind::Bool),
    ("resourceTiming", OptionKind::Bool),
    ("navigationTiming", OptionKind::Bool),
    ("networkInformation", OptionKind::Bool),
    ("logging", OptionKind::Bool),
    ("warning", OptionKind::Bool),
    ("logPrefix", OptionKind::String),
    ("maxMeasureTime", OptionKind::Number),
    ("idleTimeout", OptionKind::Number),
    ("dataConsumptionTimeout", OptionKind::Number),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    String,
    Number,
}

impl OptionKind {
    /// Whether a JSON value has this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            OptionKind::Bool => value.is_boolean(),
            OptionKind::String => value.is_string(),
            OptionKind::Number => value.is_number(),
        }
    }
}

/// Build a configuration from the plain (non-function) options
///
/// Unknown keys and values of the wrong kind are ignored, so a typo never
/// prevents the engine from starting.
pub fn config_from_options(options: &Map<String, Value>) -> Result<Config, String> {
    let filtered: Map<String, Value> = OPTION_KEYS
        .iter()
        .filter_map(|(key, kind)| {
            options
                .get(*key)
                .filter(|v| kind.accepts(v))
                .map(|v| (key.to_string(), v.clone()))
        })
        .collect();

    // Timeouts arrive as JS numbers; the config wants whole milliseconds.
    let filtered = filtered
        .into_iter()
        .map(|(key, value)| match (key.as_str(), value.as_f64()) {
            ("idleTimeout" | "dataConsumptionTimeout", Some(ms)) => {
                (key, Value::from(ms.max(0.0).round() as u32))
            }
            _ => (key, value),
        })
        .collect();

    serde_json::from_value::<Config>(Value::Object(filtered))
        .map(Config::validated)
        .map_err(|e| format!("Invalid options: {}", e))
}
