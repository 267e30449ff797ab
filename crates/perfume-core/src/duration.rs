//! Converts recorded marks into validated, rounded durations

use std::rc::Rc;

use tracing::{debug, trace};

use crate::platform::PerformanceClock;

/// Returned when no measure entry could be read back
pub const NO_MEASUREMENT: f64 = -1.0;

/// Round to two decimal places
pub fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Name of the mark recorded by `start`
pub fn start_mark(name: &str) -> String {
    format!("mark_{}_start", name)
}

/// Name of the mark recorded by `end`
pub fn end_mark(name: &str) -> String {
    format!("mark_{}_end", name)
}

/// Measures the span between a name's start and end marks
#[derive(Clone)]
pub struct DurationComputer {
    clock: Rc<dyn PerformanceClock>,
}

impl DurationComputer {
    pub fn new(clock: Rc<dyn PerformanceClock>) -> Self {
        Self { clock }
    }

    /// Duration between the start and end marks of `name`, rounded to two
    /// decimals, or [`NO_MEASUREMENT`] when the host has no matching measure
    pub fn measure(&self, name: &str) -> f64 {
        if let Err(e) = self.clock.measure(name, &start_mark(name), &end_mark(name)) {
            debug!("measure '{}' failed: {}", name, e);
            return NO_MEASUREMENT;
        }

        // Repeated recordings of the same name leave several measures behind;
        // the latest one belongs to this recording.
        match self.clock.entries_by_name(name, "measure").last() {
            Some(entry) => {
                let duration = round_two(entry.duration);
                trace!("measure '{}' = {}ms", name, duration);
                duration
            }
            None => NO_MEASUREMENT,
        }
    }
}
