//! Output sinks: the human-readable log and the analytics tracker

use std::rc::Rc;

use serde_json::Value;
use tracing::{info, warn};

use crate::report::AnalyticsPayload;

/// Function receiving every report that passes filtering and visibility gating
pub type AnalyticsTracker = Rc<dyn Fn(&AnalyticsPayload)>;

/// Human-readable log output (the browser console, a tracing subscriber, ...)
pub trait LogSink {
    /// A duration metric, in milliseconds
    fn metric(&self, prefix: &str, name: &str, duration_ms: f64);

    /// A structured data metric
    fn data(&self, prefix: &str, name: &str, data: &Value);

    /// A non-fatal warning
    fn warn(&self, prefix: &str, message: &str);
}

/// Log sink that forwards to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn metric(&self, prefix: &str, name: &str, duration_ms: f64) {
        info!(target: "perfume", "{} {} {} ms", prefix, name, duration_ms);
    }

    fn data(&self, prefix: &str, name: &str, data: &Value) {
        info!(target: "perfume", "{} {} {}", prefix, name, data);
    }

    fn warn(&self, prefix: &str, message: &str) {
        warn!(target: "perfume", "{} {}", prefix, message);
    }
}

/// Analytics tracker that drops everything
pub fn noop_tracker() -> AnalyticsTracker {
    Rc::new(|_: &AnalyticsPayload| {})
}
