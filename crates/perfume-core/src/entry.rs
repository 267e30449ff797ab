//! Raw performance entries delivered by observation streams

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observation stream types the engine subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    /// `first-paint` and `first-contentful-paint` entries
    Paint,
    /// The first discrete user input
    FirstInput,
    /// Candidates for the largest contentful paint
    LargestContentfulPaint,
    /// Sub-resource fetch timings
    Resource,
}

impl EntryKind {
    /// Entry type string understood by the host observer
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Paint => "paint",
            EntryKind::FirstInput => "first-input",
            EntryKind::LargestContentfulPaint => "largest-contentful-paint",
            EntryKind::Resource => "resource",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record delivered by a stream
///
/// Only the fields relevant to the entry's [`EntryKind`] are populated; the
/// rest keep their defaults. The whole entry is serialized as the payload of
/// `resourceTiming` reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationEntry {
    /// Stream that delivered the entry
    #[serde(rename = "entryType")]
    pub kind: EntryKind,
    /// Entry name (`first-paint`, resource URL, ...)
    #[serde(default)]
    pub name: String,
    /// Start time relative to the time origin (milliseconds)
    #[serde(default)]
    pub start_time: f64,
    /// Duration (milliseconds)
    #[serde(default)]
    pub duration: f64,
    /// Render time of an LCP candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_time: Option<f64>,
    /// Load time of an LCP candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_time: Option<f64>,
    /// Decoded body size of a resource (bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_body_size: Option<f64>,
    /// What initiated a resource fetch (`img`, `script`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_type: Option<String>,
}

impl ObservationEntry {
    /// Create an entry with only kind and name populated
    pub fn new(kind: EntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            start_time: 0.0,
            duration: 0.0,
            render_time: None,
            load_time: None,
            decoded_body_size: None,
            initiator_type: None,
        }
    }

    /// A paint entry (`first-paint` / `first-contentful-paint`)
    pub fn paint(name: impl Into<String>, start_time: f64) -> Self {
        Self {
            start_time,
            ..Self::new(EntryKind::Paint, name)
        }
    }

    /// A first-input entry
    pub fn first_input(duration: f64) -> Self {
        Self {
            duration,
            ..Self::new(EntryKind::FirstInput, "first-input")
        }
    }

    /// A largest-contentful-paint candidate
    pub fn largest_contentful_paint(render_time: Option<f64>, load_time: Option<f64>) -> Self {
        Self {
            render_time,
            load_time,
            ..Self::new(EntryKind::LargestContentfulPaint, "")
        }
    }

    /// A resource timing entry
    pub fn resource(
        name: impl Into<String>,
        initiator_type: impl Into<String>,
        decoded_body_size: f64,
    ) -> Self {
        Self {
            decoded_body_size: Some(decoded_body_size),
            initiator_type: Some(initiator_type.into()),
            ..Self::new(EntryKind::Resource, name)
        }
    }

    /// Value an LCP candidate contributes: render time, or load time when the
    /// render time is absent or zero
    pub fn paint_time(&self) -> Option<f64> {
        match self.render_time {
            Some(t) if t > 0.0 => Some(t),
            _ => self.load_time,
        }
    }
}
