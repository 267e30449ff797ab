//! Deferral of report delivery to idle time

use std::rc::Rc;

use tracing::trace;

use crate::platform::{IdleScheduler, Task};

/// Upper bound on how long an idle task may be deferred (milliseconds)
pub const DEFAULT_IDLE_TIMEOUT_MS: u32 = 3000;

/// Runs tasks when the host is idle, or immediately without an idle scheduler
///
/// Tasks may run in any order relative to each other.
#[derive(Clone)]
pub struct IdleDispatchQueue {
    scheduler: Option<Rc<dyn IdleScheduler>>,
    timeout_ms: u32,
}

impl IdleDispatchQueue {
    pub fn new(scheduler: Option<Rc<dyn IdleScheduler>>, timeout_ms: u32) -> Self {
        Self {
            scheduler,
            timeout_ms,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn enqueue(&self, task: Task) {
        match &self.scheduler {
            Some(scheduler) => {
                trace!("deferring task to idle time (timeout {}ms)", self.timeout_ms);
                scheduler.request_idle(task, self.timeout_ms);
            }
            None => task(),
        }
    }
}
