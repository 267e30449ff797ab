//! Reports flowing from the collectors to the dispatcher

use serde::Serialize;
use serde_json::{Map, Value};

use crate::navigator::NavigatorSnapshot;

/// Free-form properties attached to a manual measurement
pub type CustomProperties = Map<String, Value>;

/// What a report carries
#[derive(Debug, Clone, PartialEq)]
pub enum ReportValue {
    /// A timing in milliseconds, subject to range filtering
    Duration(f64),
    /// A structured payload (totals, raw entries, ...), never range-filtered
    Data(Value),
}

/// A single observation on its way to the sinks
///
/// Everything the dispatcher needs is captured when the report is built, so a
/// report can be executed later from an idle callback without reading shared
/// state (visibility excepted, which is read at dispatch time).
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub measure_name: String,
    pub value: ReportValue,
    pub navigator: NavigatorSnapshot,
    pub custom_properties: Option<CustomProperties>,
}

impl Report {
    pub fn duration(
        measure_name: impl Into<String>,
        duration: f64,
        navigator: NavigatorSnapshot,
    ) -> Self {
        Self {
            measure_name: measure_name.into(),
            value: ReportValue::Duration(duration),
            navigator,
            custom_properties: None,
        }
    }

    pub fn data(measure_name: impl Into<String>, data: Value, navigator: NavigatorSnapshot) -> Self {
        Self {
            measure_name: measure_name.into(),
            value: ReportValue::Data(data),
            navigator,
            custom_properties: None,
        }
    }

    pub fn with_custom_properties(mut self, properties: Option<CustomProperties>) -> Self {
        self.custom_properties = properties;
        self
    }

    /// The duration carried by this report, if it is a timing
    pub fn duration_ms(&self) -> Option<f64> {
        match self.value {
            ReportValue::Duration(d) => Some(d),
            ReportValue::Data(_) => None,
        }
    }

    /// Normalized payload handed to the analytics tracker
    pub fn to_payload(&self) -> AnalyticsPayload {
        let (data, duration) = match &self.value {
            ReportValue::Duration(d) => (Some(Value::from(*d)), Some(*d)),
            ReportValue::Data(v) => (Some(v.clone()), None),
        };
        AnalyticsPayload {
            metric_name: self.measure_name.clone(),
            data,
            duration,
            event_properties: self.custom_properties.clone().unwrap_or_default(),
            navigator_information: self.navigator.clone(),
        }
    }
}

/// Stable payload contract of the analytics tracker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPayload {
    pub metric_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub event_properties: CustomProperties,
    pub navigator_information: NavigatorSnapshot,
}
