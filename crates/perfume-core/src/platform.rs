//! Host capability interfaces consumed by the engine
//!
//! The engine never touches global host state. Everything it needs from the
//! environment it runs in (a browser, a test harness, ...) is passed in through
//! the traits below, bundled into a [`Platform`] at construction time. Each
//! capability is optional except the environment probe and the log sink, which
//! fall back to inert defaults.
//!
//! | Capability | Absent means |
//! |---|---|
//! | [`PerformanceClock`] | the whole engine is a no-op |
//! | [`ObserverHost`] | no stream-based metrics; manual `start`/`end` still work |
//! | [`TimerHost`] | `end_after_paint` ends immediately; no data-consumption fallback |
//! | [`IdleScheduler`] | reports are dispatched synchronously |
//! | [`VisibilitySignal`] | the page is never considered hidden |

use std::fmt;
use std::rc::Rc;

use crate::entry::{EntryKind, ObservationEntry};
use crate::error::Result;
use crate::navigation::NavigationTimingEntry;
use crate::navigator::{ConnectionInfo, ServiceWorkerStatus};
use crate::sink::{LogSink, TracingLogSink};

/// Deferred unit of work handed to a timer or idle scheduler
pub type Task = Box<dyn FnOnce()>;

/// Callback receiving each batch of entries delivered by a stream
pub type EntryCallback = Box<dyn FnMut(&[ObservationEntry])>;

/// Callback invoked when the page becomes hidden
pub type HiddenCallback = Box<dyn FnMut()>;

/// A timing entry read back from the host's performance buffer
#[derive(Debug, Clone, PartialEq)]
pub struct TimingEntry {
    /// Entry name
    pub name: String,
    /// Entry type (`mark`, `measure`, ...)
    pub entry_type: String,
    /// Start time relative to the time origin (milliseconds)
    pub start_time: f64,
    /// Duration (milliseconds)
    pub duration: f64,
}

/// Monotonic clock with named marks and measures
pub trait PerformanceClock {
    /// Record a named mark at the current time
    fn mark(&self, name: &str) -> Result<()>;

    /// Remove every mark with this name
    fn clear_marks(&self, name: &str);

    /// Record a measure named `name` spanning two existing marks
    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<()>;

    /// Buffered entries matching a name and entry type, oldest first
    fn entries_by_name(&self, name: &str, entry_type: &str) -> Vec<TimingEntry>;

    /// The page's navigation entry, when the host exposes one
    fn navigation_timing(&self) -> Option<NavigationTimingEntry> {
        None
    }
}

/// Handle to a live stream subscription
pub trait Subscription {
    /// Stop delivery. Must be idempotent.
    fn disconnect(&mut self);
}

/// Host facility delivering performance entries by stream type
pub trait ObserverHost {
    /// Subscribe to a stream with buffered replay of earlier entries
    fn observe(&self, kind: EntryKind, callback: EntryCallback) -> Result<Box<dyn Subscription>>;
}

/// Identifier of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// One-shot timers
pub trait TimerHost {
    /// Run `task` once after `delay_ms`
    fn set_timeout(&self, delay_ms: u32, task: Task) -> TimerId;

    /// Cancel a pending timer; unknown or already-fired ids are ignored
    fn clear_timeout(&self, id: TimerId);
}

/// Idle-time scheduling
pub trait IdleScheduler {
    /// Run `task` when the host is idle, or after `timeout_ms` at the latest
    fn request_idle(&self, task: Task, timeout_ms: u32);
}

/// Page visibility notifications
pub trait VisibilitySignal {
    /// Register a callback for the page becoming hidden
    fn on_hidden(&self, callback: HiddenCallback) -> Result<()>;
}

/// Optional device and network introspection
///
/// Every method defaults to "unknown".
pub trait EnvironmentProbe {
    /// Approximate device memory in gigabytes
    fn device_memory(&self) -> Option<f64> {
        None
    }

    /// Number of logical processors
    fn hardware_concurrency(&self) -> Option<u32> {
        None
    }

    /// Network connection quality
    fn connection(&self) -> Option<ConnectionInfo> {
        None
    }

    /// Service worker availability
    fn service_worker_status(&self) -> ServiceWorkerStatus {
        ServiceWorkerStatus::Unsupported
    }
}

/// Environment probe that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEnvironment;

impl EnvironmentProbe for NullEnvironment {}

/// The set of host capabilities handed to the engine
#[derive(Clone)]
pub struct Platform {
    pub clock: Option<Rc<dyn PerformanceClock>>,
    pub observer: Option<Rc<dyn ObserverHost>>,
    pub timers: Option<Rc<dyn TimerHost>>,
    pub idle: Option<Rc<dyn IdleScheduler>>,
    pub visibility: Option<Rc<dyn VisibilitySignal>>,
    pub environment: Rc<dyn EnvironmentProbe>,
    pub log_sink: Rc<dyn LogSink>,
}

impl Platform {
    /// A platform with no capabilities at all
    pub fn new() -> Self {
        Self {
            clock: None,
            observer: None,
            timers: None,
            idle: None,
            visibility: None,
            environment: Rc::new(NullEnvironment),
            log_sink: Rc::new(TracingLogSink),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn PerformanceClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_observer(mut self, observer: Rc<dyn ObserverHost>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_timers(mut self, timers: Rc<dyn TimerHost>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn with_idle(mut self, idle: Rc<dyn IdleScheduler>) -> Self {
        self.idle = Some(idle);
        self
    }

    pub fn with_visibility(mut self, visibility: Rc<dyn VisibilitySignal>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_environment(mut self, environment: Rc<dyn EnvironmentProbe>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_log_sink(mut self, log_sink: Rc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("clock", &self.clock.is_some())
            .field("observer", &self.observer.is_some())
            .field("timers", &self.timers.is_some())
            .field("idle", &self.idle.is_some())
            .field("visibility", &self.visibility.is_some())
            .finish_non_exhaustive()
    }
}
