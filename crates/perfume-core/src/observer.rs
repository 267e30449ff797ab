//! Stream subscriptions and their finalization protocol
//!
//! The coordinator subscribes to four streams:
//!
//! - **paint**: reports `firstPaint` and `firstContentfulPaint`, then
//!   disconnects once the contentful paint is seen
//! - **first-input**: reports `firstInputDelay`, then finalizes the two
//!   streams whose values only settle once the page is interactive
//!   (largest contentful paint and data consumption) and disconnects itself
//! - **largest-contentful-paint**: keeps the latest candidate until the first
//!   input finalizes it
//! - **resource**: reports raw entries and/or accumulates byte totals
//!
//! Data consumption has a second finalizer, a fallback timer armed at startup,
//! for sessions where the user never interacts. Both paths go through a
//! [`FinalizeOnce`] guard, so the totals are emitted exactly once whichever
//! fires first.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::duration::round_two;
use crate::engine::Shared;
use crate::entry::{EntryKind, ObservationEntry};
use crate::error::PerfumeError;
use crate::platform::{ObserverHost, Subscription, TimerHost, TimerId};
use crate::report::Report;

pub const FIRST_PAINT: &str = "firstPaint";
pub const FIRST_CONTENTFUL_PAINT: &str = "firstContentfulPaint";
pub const FIRST_INPUT_DELAY: &str = "firstInputDelay";
pub const LARGEST_CONTENTFUL_PAINT: &str = "largestContentfulPaint";
pub const DATA_CONSUMPTION: &str = "dataConsumption";
pub const RESOURCE_TIMING: &str = "resourceTiming";

/// Idempotent close shared by competing finalizers
#[derive(Debug, Default)]
pub struct FinalizeOnce {
    closed: Cell<bool>,
}

impl FinalizeOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only
    pub fn close(&self) -> bool {
        !self.closed.replace(true)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Owns the stream subscriptions and turns entries into reports
pub struct ObservationCoordinator {
    shared: Weak<Shared>,
    timers: Option<Rc<dyn TimerHost>>,
    subscriptions: RefCell<HashMap<EntryKind, Box<dyn Subscription>>>,
    disconnected: RefCell<HashSet<EntryKind>>,
    lcp_candidate: Cell<Option<f64>>,
    data_consumption: FinalizeOnce,
    fallback_timer: Cell<Option<TimerId>>,
}

impl ObservationCoordinator {
    /// Subscribe to every stream the configuration needs
    ///
    /// A stream the host refuses is skipped with a warning; the others keep
    /// working.
    pub(crate) fn connect(shared: &Rc<Shared>, host: &dyn ObserverHost) -> Rc<Self> {
        let coordinator = Rc::new(Self {
            shared: Rc::downgrade(shared),
            timers: shared.timers.clone(),
            subscriptions: RefCell::new(HashMap::new()),
            disconnected: RefCell::new(HashSet::new()),
            lcp_candidate: Cell::new(None),
            data_consumption: FinalizeOnce::new(),
            fallback_timer: Cell::new(None),
        });

        let config = &shared.config;
        let mut kinds = vec![EntryKind::Paint, EntryKind::LargestContentfulPaint];
        if config.resource_timing || config.data_consumption {
            kinds.push(EntryKind::Resource);
        }
        // First input finalizes LCP and data consumption, so its buffered
        // replay must come after theirs.
        kinds.push(EntryKind::FirstInput);

        for kind in kinds {
            if let Err(e) = coordinator.subscribe(host, kind) {
                shared.warn(&e.to_string());
            }
        }

        if config.data_consumption {
            coordinator.arm_fallback(config.data_consumption_timeout_ms);
        }

        coordinator
    }

    fn subscribe(self: &Rc<Self>, host: &dyn ObserverHost, kind: EntryKind) -> Result<(), PerfumeError> {
        let weak = Rc::downgrade(self);
        let mut subscription = host.observe(
            kind,
            Box::new(move |entries: &[ObservationEntry]| {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.handle(kind, entries);
                }
            }),
        )?;

        // Buffered replay may already have finished this stream.
        if self.disconnected.borrow().contains(&kind) {
            subscription.disconnect();
        } else {
            self.subscriptions.borrow_mut().insert(kind, subscription);
        }
        debug!("observing {}", kind);
        Ok(())
    }

    fn arm_fallback(self: &Rc<Self>, delay_ms: u32) {
        if self.data_consumption.is_closed() {
            return;
        }
        let Some(timers) = &self.timers else {
            debug!("no timer host, data consumption waits for first input");
            return;
        };
        let weak = Rc::downgrade(self);
        let id = timers.set_timeout(
            delay_ms,
            Box::new(move || {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.fallback_timer.set(None);
                    coordinator.finalize_data_consumption();
                }
            }),
        );
        self.fallback_timer.set(Some(id));
    }

    /// Whether a stream's subscription is still live
    pub fn is_connected(&self, kind: EntryKind) -> bool {
        self.subscriptions.borrow().contains_key(&kind)
    }

    /// Latest largest-contentful-paint candidate seen
    pub fn lcp_candidate(&self) -> Option<f64> {
        self.lcp_candidate.get()
    }

    /// Whether data consumption totals have been emitted
    pub fn is_data_consumption_finalized(&self) -> bool {
        self.data_consumption.is_closed()
    }

    /// Stop a stream for good
    pub fn disconnect(&self, kind: EntryKind) {
        self.disconnected.borrow_mut().insert(kind);
        let subscription = self.subscriptions.borrow_mut().remove(&kind);
        if let Some(mut subscription) = subscription {
            subscription.disconnect();
            debug!("disconnected {}", kind);
        }
    }

    fn handle(self: &Rc<Self>, kind: EntryKind, entries: &[ObservationEntry]) {
        if self.disconnected.borrow().contains(&kind) {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        trace!("{} delivered {} entries", kind, entries.len());

        match kind {
            EntryKind::Paint => self.on_paint(&shared, entries),
            EntryKind::FirstInput => self.on_first_input(&shared, entries),
            EntryKind::LargestContentfulPaint => {
                if let Some(value) = entries.last().and_then(ObservationEntry::paint_time) {
                    self.lcp_candidate.set(Some(value));
                }
            }
            EntryKind::Resource => self.on_resource(&shared, entries),
        }
    }

    fn on_paint(&self, shared: &Rc<Shared>, entries: &[ObservationEntry]) {
        let mut contentful = false;
        for entry in entries {
            match entry.name.as_str() {
                "first-paint" => shared.submit(Report::duration(
                    FIRST_PAINT,
                    round_two(entry.start_time),
                    shared.navigator(),
                )),
                "first-contentful-paint" => {
                    shared.submit(Report::duration(
                        FIRST_CONTENTFUL_PAINT,
                        round_two(entry.start_time),
                        shared.navigator(),
                    ));
                    contentful = true;
                }
                other => trace!("ignoring paint entry '{}'", other),
            }
        }
        if contentful {
            self.disconnect(EntryKind::Paint);
        }
    }

    fn on_first_input(&self, shared: &Rc<Shared>, entries: &[ObservationEntry]) {
        let Some(entry) = entries.first() else {
            return;
        };
        shared.submit(Report::duration(
            FIRST_INPUT_DELAY,
            round_two(entry.duration),
            shared.navigator(),
        ));

        self.disconnect(EntryKind::LargestContentfulPaint);
        if let Some(value) = self.lcp_candidate.get() {
            shared.submit(Report::duration(
                LARGEST_CONTENTFUL_PAINT,
                round_two(value),
                shared.navigator(),
            ));
        }
        self.finalize_data_consumption();
        self.disconnect(EntryKind::FirstInput);
    }

    fn on_resource(&self, shared: &Rc<Shared>, entries: &[ObservationEntry]) {
        let config = &shared.config;
        for entry in entries {
            if config.resource_timing {
                match serde_json::to_value(entry) {
                    Ok(data) => shared.submit(Report::data(RESOURCE_TIMING, data, shared.navigator())),
                    Err(e) => debug!("cannot serialize resource entry: {}", e),
                }
            }
            // Accumulation goes on after the totals were emitted; those
            // bytes are never reported.
            if config.data_consumption {
                shared.accumulator.borrow_mut().add(entry);
            }
        }
    }

    /// Emit the data consumption totals unless already done
    fn finalize_data_consumption(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if !shared.config.data_consumption || !self.data_consumption.close() {
            return;
        }
        self.cancel_fallback();

        let totals = shared.accumulator.borrow().totals();
        match serde_json::to_value(&totals) {
            Ok(data) => shared.submit(Report::data(DATA_CONSUMPTION, data, shared.navigator())),
            Err(e) => debug!("cannot serialize data consumption: {}", e),
        }
    }

    fn cancel_fallback(&self) {
        if let (Some(id), Some(timers)) = (self.fallback_timer.take(), &self.timers) {
            timers.clear_timeout(id);
        }
    }
}

impl Drop for ObservationCoordinator {
    fn drop(&mut self) {
        self.cancel_fallback();
        for (_, mut subscription) in self.subscriptions.get_mut().drain() {
            subscription.disconnect();
        }
    }
}
