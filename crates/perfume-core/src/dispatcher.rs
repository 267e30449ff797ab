//! Filtering and fan-out of reports to the log sink and the analytics tracker

use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::config::Config;
use crate::report::{Report, ReportValue};
use crate::sink::{AnalyticsTracker, LogSink};
use crate::visibility::VisibilityGate;

/// What happened to a dispatched report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Duration out of range; nothing was emitted
    Dropped,
    /// Page hidden; nothing was emitted
    Hidden,
    /// Sent to the analytics tracker, and to the log sink when `logged`
    Delivered { logged: bool },
}

/// Single exit point of every report
pub struct ReportDispatcher {
    log_sink: Rc<dyn LogSink>,
    tracker: AnalyticsTracker,
    log_prefix: String,
    logging: bool,
    warning: bool,
    max_measure_time: f64,
}

impl ReportDispatcher {
    pub fn new(config: &Config, log_sink: Rc<dyn LogSink>) -> Self {
        Self {
            log_sink,
            tracker: config.analytics_tracker.clone(),
            log_prefix: config.log_prefix.clone(),
            logging: config.logging,
            warning: config.warning,
            max_measure_time: config.max_measure_time,
        }
    }

    /// Durations at or below zero are glitches, durations above the ceiling
    /// are outliers
    pub fn accepts_duration(&self, duration: f64) -> bool {
        duration > 0.0 && duration <= self.max_measure_time
    }

    /// Emit a report, reading the visibility gate now
    pub fn dispatch(&self, report: &Report, gate: &VisibilityGate) -> DispatchOutcome {
        if let Some(duration) = report.duration_ms() {
            if !self.accepts_duration(duration) {
                trace!("dropping '{}' ({}ms)", report.measure_name, duration);
                return DispatchOutcome::Dropped;
            }
        }

        if gate.is_hidden() {
            trace!("page hidden, suppressing '{}'", report.measure_name);
            return DispatchOutcome::Hidden;
        }

        if self.logging {
            self.log(report);
        }
        (self.tracker)(&report.to_payload());

        DispatchOutcome::Delivered {
            logged: self.logging,
        }
    }

    /// Emit a warning when both `logging` and `warning` are enabled
    pub fn warn(&self, message: &str) {
        if self.logging && self.warning {
            self.log_sink.warn(&self.log_prefix, message);
        }
    }

    fn log(&self, report: &Report) {
        match &report.value {
            ReportValue::Duration(d) => {
                self.log_sink
                    .metric(&self.log_prefix, &report.measure_name, *d)
            }
            ReportValue::Data(Value::Null) => {}
            ReportValue::Data(data) => self.log_sink.data(&self.log_prefix, &report.measure_name, data),
        }
    }
}
