//! In-flight manual measurements

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::duration::{end_mark, start_mark, DurationComputer};
use crate::error::{PerfumeError, Result};
use crate::platform::PerformanceClock;

/// Tracks which names have a recording in progress
///
/// At most one recording per name is active. Starting an active name or
/// ending an inactive one is rejected without touching the host marks.
pub struct MetricRegistry {
    clock: Rc<dyn PerformanceClock>,
    durations: DurationComputer,
    active: HashSet<String>,
}

impl MetricRegistry {
    pub fn new(clock: Rc<dyn PerformanceClock>) -> Self {
        Self {
            durations: DurationComputer::new(clock.clone()),
            clock,
            active: HashSet::new(),
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Number of recordings in progress
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Begin recording `name`
    pub fn start(&mut self, name: &str) -> Result<()> {
        if self.active.contains(name) {
            return Err(PerfumeError::AlreadyStarted(name.to_string()));
        }
        self.clock.mark(&start_mark(name))?;
        self.active.insert(name.to_string());
        debug!("recording '{}' started", name);
        Ok(())
    }

    /// Stop recording `name` and return the elapsed duration
    ///
    /// The duration is [`NO_MEASUREMENT`](crate::duration::NO_MEASUREMENT)
    /// when the host could not produce a measure.
    pub fn end(&mut self, name: &str) -> Result<f64> {
        if !self.active.contains(name) {
            return Err(PerfumeError::AlreadyStopped(name.to_string()));
        }
        if let Err(e) = self.clock.mark(&end_mark(name)) {
            debug!("end mark for '{}' failed: {}", name, e);
        }
        let duration = self.durations.measure(name);
        self.active.remove(name);
        debug!("recording '{}' ended after {}ms", name, duration);
        Ok(duration)
    }

    /// Drop the marks and the active state of `name`, whatever its state
    pub fn clear(&mut self, name: &str) {
        self.clock.clear_marks(&start_mark(name));
        self.clock.clear_marks(&end_mark(name));
        self.active.remove(name);
    }
}
