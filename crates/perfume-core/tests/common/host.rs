//! In-memory host implementing every capability the engine consumes
//!
//! Time only moves through [`FakeHost::advance`]. Idle tasks run through
//! [`FakeHost::run_idle`]. Streams are fed with [`FakeHost::emit`].

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use perfume_core::{
    AnalyticsPayload, Config, ConnectionInfo, EntryCallback, EntryKind, EnvironmentProbe,
    HiddenCallback, IdleScheduler, LogSink, NavigationTimingEntry, ObservationEntry,
    ObserverHost, PerfumeError, PerformanceClock, Perfume, Platform, Subscription, Task,
    TimerHost, TimerId, TimingEntry, VisibilitySignal,
};
use serde_json::Value;

struct Stream {
    kind: EntryKind,
    callback: Rc<RefCell<EntryCallback>>,
    active: Rc<Cell<bool>>,
}

struct PendingTimer {
    id: TimerId,
    due: f64,
    task: Task,
}

struct FakeSubscription {
    active: Rc<Cell<bool>>,
    disconnects: Rc<Cell<usize>>,
}

impl Subscription for FakeSubscription {
    fn disconnect(&mut self) {
        if self.active.replace(false) {
            self.disconnects.set(self.disconnects.get() + 1);
        }
    }
}

/// Scriptable host
#[derive(Default)]
pub struct FakeHost {
    now: Cell<f64>,
    marks: RefCell<Vec<TimingEntry>>,
    measures: RefCell<Vec<TimingEntry>>,
    pub navigation: RefCell<Option<NavigationTimingEntry>>,

    streams: RefCell<Vec<Stream>>,
    buffered: RefCell<HashMap<EntryKind, Vec<ObservationEntry>>>,
    refused: RefCell<HashSet<EntryKind>>,
    disconnects: Rc<Cell<usize>>,

    timers: RefCell<Vec<PendingTimer>>,
    next_timer: Cell<u64>,
    idle_tasks: RefCell<VecDeque<(Task, u32)>>,
    hidden_callbacks: RefCell<Vec<HiddenCallback>>,

    pub device_memory: Cell<Option<f64>>,
    pub hardware_concurrency: Cell<Option<u32>>,
    pub connection: RefCell<Option<ConnectionInfo>>,
}

impl FakeHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }

    /// Move the clock forward, firing due timers in order
    pub fn advance(&self, ms: f64) {
        let target = self.now.get() + ms;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let earliest = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due))
                    .map(|(i, _)| i);
                earliest.map(|i| timers.remove(i))
            };
            match next {
                Some(timer) => {
                    self.now.set(timer.due.max(self.now.get()));
                    (timer.task)();
                }
                None => break,
            }
        }
        self.now.set(target);
    }

    /// Run queued idle tasks until none are left
    pub fn run_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.idle_tasks.borrow_mut().pop_front();
            match next {
                Some((task, _)) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    pub fn idle_timeouts(&self) -> Vec<u32> {
        self.idle_tasks.borrow().iter().map(|(_, t)| *t).collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Deliver entries to every live subscription of `kind`
    pub fn emit(&self, kind: EntryKind, entries: Vec<ObservationEntry>) {
        let targets: Vec<_> = self
            .streams
            .borrow()
            .iter()
            .filter(|s| s.kind == kind && s.active.get())
            .map(|s| (s.callback.clone(), s.active.clone()))
            .collect();
        for (callback, active) in targets {
            if active.get() {
                let mut callback = callback.borrow_mut();
                (*callback)(entries.as_slice());
            }
        }
    }

    /// Entries replayed to a subscriber of `kind` when it subscribes
    pub fn buffer(&self, kind: EntryKind, entries: Vec<ObservationEntry>) {
        self.buffered.borrow_mut().insert(kind, entries);
    }

    /// Make `observe` fail for `kind`
    pub fn refuse(&self, kind: EntryKind) {
        self.refused.borrow_mut().insert(kind);
    }

    pub fn is_subscribed(&self, kind: EntryKind) -> bool {
        self.streams
            .borrow()
            .iter()
            .any(|s| s.kind == kind && s.active.get())
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.get()
    }

    /// Signal that the page became hidden
    pub fn hide(&self) {
        for callback in self.hidden_callbacks.borrow_mut().iter_mut() {
            callback();
        }
    }

    pub fn mark_times(&self, name: &str) -> Vec<f64> {
        self.marks
            .borrow()
            .iter()
            .filter(|m| m.name == name)
            .map(|m| m.start_time)
            .collect()
    }

    pub fn measure_count(&self) -> usize {
        self.measures.borrow().len()
    }
}

impl PerformanceClock for FakeHost {
    fn mark(&self, name: &str) -> Result<(), PerfumeError> {
        self.marks.borrow_mut().push(TimingEntry {
            name: name.to_string(),
            entry_type: "mark".to_string(),
            start_time: self.now.get(),
            duration: 0.0,
        });
        Ok(())
    }

    fn clear_marks(&self, name: &str) {
        self.marks.borrow_mut().retain(|m| m.name != name);
    }

    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<(), PerfumeError> {
        let missing = |mark: &str| PerfumeError::Host(format!("The mark '{}' does not exist.", mark));
        let start = *self
            .mark_times(start_mark)
            .last()
            .ok_or_else(|| missing(start_mark))?;
        let end = *self.mark_times(end_mark).last().ok_or_else(|| missing(end_mark))?;
        self.measures.borrow_mut().push(TimingEntry {
            name: name.to_string(),
            entry_type: "measure".to_string(),
            start_time: start,
            duration: end - start,
        });
        Ok(())
    }

    fn entries_by_name(&self, name: &str, entry_type: &str) -> Vec<TimingEntry> {
        let source = if entry_type == "mark" {
            &self.marks
        } else {
            &self.measures
        };
        source
            .borrow()
            .iter()
            .filter(|e| e.name == name && e.entry_type == entry_type)
            .cloned()
            .collect()
    }

    fn navigation_timing(&self) -> Option<NavigationTimingEntry> {
        *self.navigation.borrow()
    }
}

impl ObserverHost for FakeHost {
    fn observe(
        &self,
        kind: EntryKind,
        callback: EntryCallback,
    ) -> Result<Box<dyn Subscription>, PerfumeError> {
        if self.refused.borrow().contains(&kind) {
            return Err(PerfumeError::Observer {
                kind,
                reason: "entry type not supported".to_string(),
            });
        }

        let callback = Rc::new(RefCell::new(callback));
        let active = Rc::new(Cell::new(true));
        self.streams.borrow_mut().push(Stream {
            kind,
            callback: callback.clone(),
            active: active.clone(),
        });

        let replay = self.buffered.borrow().get(&kind).cloned();
        if let Some(entries) = replay {
            let mut replay_to = callback.borrow_mut();
            (*replay_to)(entries.as_slice());
        }

        Ok(Box::new(FakeSubscription {
            active,
            disconnects: self.disconnects.clone(),
        }))
    }
}

impl TimerHost for FakeHost {
    fn set_timeout(&self, delay_ms: u32, task: Task) -> TimerId {
        let id = TimerId(self.next_timer.get());
        self.next_timer.set(id.0 + 1);
        self.timers.borrow_mut().push(PendingTimer {
            id,
            due: self.now.get() + f64::from(delay_ms),
            task,
        });
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.timers.borrow_mut().retain(|t| t.id != id);
    }
}

impl IdleScheduler for FakeHost {
    fn request_idle(&self, task: Task, timeout_ms: u32) {
        self.idle_tasks.borrow_mut().push_back((task, timeout_ms));
    }
}

impl VisibilitySignal for FakeHost {
    fn on_hidden(&self, callback: HiddenCallback) -> Result<(), PerfumeError> {
        self.hidden_callbacks.borrow_mut().push(callback);
        Ok(())
    }
}

impl EnvironmentProbe for FakeHost {
    fn device_memory(&self) -> Option<f64> {
        self.device_memory.get()
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        self.hardware_concurrency.get()
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.connection.borrow().clone()
    }
}

/// A line written to the log sink
#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Metric(String, f64),
    Data(String, Value),
    Warn(String),
}

#[derive(Default)]
pub struct RecordingLog {
    pub lines: RefCell<Vec<LogLine>>,
}

impl RecordingLog {
    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| match l {
                LogLine::Warn(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }
}

impl LogSink for RecordingLog {
    fn metric(&self, prefix: &str, name: &str, duration_ms: f64) {
        assert!(!prefix.is_empty());
        self.lines
            .borrow_mut()
            .push(LogLine::Metric(name.to_string(), duration_ms));
    }

    fn data(&self, _prefix: &str, name: &str, data: &Value) {
        self.lines
            .borrow_mut()
            .push(LogLine::Data(name.to_string(), data.clone()));
    }

    fn warn(&self, _prefix: &str, message: &str) {
        self.lines.borrow_mut().push(LogLine::Warn(message.to_string()));
    }
}

/// Which capabilities the harness exposes to the engine
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub clock: bool,
    pub observer: bool,
    pub timers: bool,
    pub idle: bool,
    pub visibility: bool,
}

impl Default for Capabilities {
    /// Everything but idle scheduling, so reports dispatch synchronously
    fn default() -> Self {
        Self {
            clock: true,
            observer: true,
            timers: true,
            idle: false,
            visibility: true,
        }
    }
}

/// An engine wired to a fake host, with its outputs recorded
pub struct Harness {
    pub host: Rc<FakeHost>,
    pub log: Rc<RecordingLog>,
    pub sent: Rc<RefCell<Vec<AnalyticsPayload>>>,
    pub perfume: Perfume,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self::with(config, Capabilities::default(), |_| {})
    }

    /// Build with selected capabilities, after preparing the host
    pub fn with(config: Config, caps: Capabilities, prepare: impl FnOnce(&FakeHost)) -> Self {
        let host = FakeHost::new();
        prepare(&host);

        let log = Rc::new(RecordingLog::default());
        let sent = Rc::new(RefCell::new(Vec::new()));
        let sink = sent.clone();
        let config = config.with_analytics_tracker(move |p| sink.borrow_mut().push(p.clone()));

        let mut platform = Platform::new()
            .with_environment(host.clone())
            .with_log_sink(log.clone());
        if caps.clock {
            platform = platform.with_clock(host.clone());
        }
        if caps.observer {
            platform = platform.with_observer(host.clone());
        }
        if caps.timers {
            platform = platform.with_timers(host.clone());
        }
        if caps.idle {
            platform = platform.with_idle(host.clone());
        }
        if caps.visibility {
            platform = platform.with_visibility(host.clone());
        }

        let perfume = Perfume::new(config, platform);
        Self {
            host,
            log,
            sent,
            perfume,
        }
    }

    /// Names of the metrics sent to the analytics tracker, in order
    pub fn sent_names(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .map(|p| p.metric_name.clone())
            .collect()
    }

    pub fn sent_named(&self, name: &str) -> Vec<AnalyticsPayload> {
        self.sent
            .borrow()
            .iter()
            .filter(|p| p.metric_name == name)
            .cloned()
            .collect()
    }
}
