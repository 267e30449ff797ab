//! Composition root and public surface

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::config::Config;
use crate::consumption::ResourceConsumptionAccumulator;
use crate::dispatcher::ReportDispatcher;
use crate::entry::EntryKind;
use crate::error::PerfumeError;
use crate::idle::IdleDispatchQueue;
use crate::navigation::NavigationTiming;
use crate::navigator::NavigatorSnapshot;
use crate::observer::ObservationCoordinator;
use crate::platform::{EnvironmentProbe, Platform, TimerHost};
use crate::registry::MetricRegistry;
use crate::report::{CustomProperties, Report};
use crate::visibility::VisibilityGate;

pub const NAVIGATION_TIMING: &str = "navigationTiming";
pub const NETWORK_INFORMATION: &str = "networkInformation";

/// State shared between the public handle, stream callbacks and deferred tasks
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) gate: VisibilityGate,
    pub(crate) registry: RefCell<MetricRegistry>,
    pub(crate) accumulator: RefCell<ResourceConsumptionAccumulator>,
    pub(crate) timers: Option<Rc<dyn TimerHost>>,
    dispatcher: ReportDispatcher,
    idle: IdleDispatchQueue,
    environment: Rc<dyn EnvironmentProbe>,
}

impl Shared {
    pub(crate) fn navigator(&self) -> NavigatorSnapshot {
        NavigatorSnapshot::capture(self.environment.as_ref())
    }

    pub(crate) fn warn(&self, message: &str) {
        self.dispatcher.warn(message);
    }

    /// Queue a report for idle-time dispatch
    ///
    /// Visibility is checked when the task runs, not now. Tasks still pending
    /// when the engine is dropped are discarded.
    pub(crate) fn submit(self: &Rc<Self>, report: Report) {
        let weak = Rc::downgrade(self);
        self.idle.enqueue(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                let outcome = shared.dispatcher.dispatch(&report, &shared.gate);
                debug!("{} -> {:?}", report.measure_name, outcome);
            }
        }));
    }

    fn start(&self, name: &str) {
        let result = self.registry.borrow_mut().start(name);
        match result {
            Ok(()) => self.gate.reset(),
            Err(e) => self.warn(&e.to_string()),
        }
    }

    fn end(self: &Rc<Self>, name: &str, custom_properties: Option<CustomProperties>) {
        let result = self.registry.borrow_mut().end(name);
        match result {
            Ok(duration) => self.submit(
                Report::duration(name, duration, self.navigator())
                    .with_custom_properties(custom_properties),
            ),
            Err(e) => self.warn(&e.to_string()),
        }
    }

    fn clear(&self, name: &str) {
        self.registry.borrow_mut().clear(name);
    }

    fn report_startup(self: &Rc<Self>, platform: &Platform) {
        if self.config.navigation_timing {
            let timing = platform
                .clock
                .as_ref()
                .and_then(|clock| clock.navigation_timing())
                .map(|entry| NavigationTiming::from(&entry));
            match timing.map(serde_json::to_value) {
                Some(Ok(data)) => self.submit(Report::data(NAVIGATION_TIMING, data, self.navigator())),
                Some(Err(e)) => debug!("cannot serialize navigation timing: {}", e),
                None => debug!("navigation timing unavailable"),
            }
        }

        if self.config.network_information {
            match self.environment.connection().map(|c| serde_json::to_value(&c)) {
                Some(Ok(data)) => self.submit(Report::data(NETWORK_INFORMATION, data, self.navigator())),
                Some(Err(e)) => debug!("cannot serialize network information: {}", e),
                None => debug!("network information unavailable"),
            }
        }
    }
}

/// The metric collection and reporting engine
///
/// Construct it once per page with the host capabilities. Stream-based metrics
/// (paint, first input, largest contentful paint, resources) are collected
/// automatically; manual measurements go through [`start`](Self::start) and
/// [`end`](Self::end).
///
/// Every public call is infallible. Without a clock capability the engine does
/// nothing at all.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use perfume_core::{Config, Perfume, Platform};
///
/// # fn example(clock: Rc<dyn perfume_core::PerformanceClock>) {
/// let config = Config {
///     data_consumption: true,
///     ..Config::default()
/// }
/// .with_analytics_tracker(|payload| println!("{}", payload.metric_name));
///
/// let perfume = Perfume::new(config, Platform::new().with_clock(clock));
/// perfume.start("fibonacci");
/// // ...
/// perfume.end("fibonacci", None);
/// # }
/// ```
pub struct Perfume {
    shared: Option<Rc<Shared>>,
    coordinator: Option<Rc<ObservationCoordinator>>,
}

impl Perfume {
    pub fn new(config: Config, platform: Platform) -> Self {
        let Some(clock) = platform.clock.clone() else {
            debug!("{}", PerfumeError::Unsupported("performance clock"));
            return Self {
                shared: None,
                coordinator: None,
            };
        };

        let config = config.validated();
        let shared = Rc::new(Shared {
            gate: VisibilityGate::new(),
            registry: RefCell::new(MetricRegistry::new(clock)),
            accumulator: RefCell::new(ResourceConsumptionAccumulator::new()),
            timers: platform.timers.clone(),
            dispatcher: ReportDispatcher::new(&config, platform.log_sink.clone()),
            idle: IdleDispatchQueue::new(platform.idle.clone(), config.idle_timeout_ms),
            environment: platform.environment.clone(),
            config,
        });

        if let Some(visibility) = &platform.visibility {
            let weak = Rc::downgrade(&shared);
            let registered = visibility.on_hidden(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.gate.mark_hidden();
                }
            }));
            if let Err(e) = registered {
                debug!("visibility signal unavailable: {}", e);
            }
        }

        let coordinator = match &platform.observer {
            Some(host) => Some(ObservationCoordinator::connect(&shared, host.as_ref())),
            None => {
                shared.warn(&PerfumeError::Unsupported("PerformanceObserver").to_string());
                None
            }
        };

        shared.report_startup(&platform);

        Self {
            shared: Some(shared),
            coordinator,
        }
    }

    /// Whether the host provides the clock capability
    pub fn is_supported(&self) -> bool {
        self.shared.is_some()
    }

    /// Begin a manual measurement
    ///
    /// Starting a name that is already recording only logs a warning. A
    /// successful start clears the hidden-page state.
    #[instrument(skip(self))]
    pub fn start(&self, name: &str) {
        if let Some(shared) = &self.shared {
            shared.start(name);
        }
    }

    /// Finish a manual measurement and report its duration
    #[instrument(skip(self, custom_properties))]
    pub fn end(&self, name: &str, custom_properties: Option<CustomProperties>) {
        if let Some(shared) = &self.shared {
            shared.end(name, custom_properties);
        }
    }

    /// Finish a manual measurement after the next paint opportunity
    #[instrument(skip(self, custom_properties))]
    pub fn end_after_paint(&self, name: &str, custom_properties: Option<CustomProperties>) {
        let Some(shared) = &self.shared else {
            return;
        };
        let Some(timers) = &shared.timers else {
            shared.end(name, custom_properties);
            return;
        };
        let weak = Rc::downgrade(shared);
        let name = name.to_string();
        timers.set_timeout(
            0,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.end(&name, custom_properties);
                }
            }),
        );
    }

    /// Forget a measurement and its marks, whatever its state
    #[instrument(skip(self))]
    pub fn clear(&self, name: &str) {
        if let Some(shared) = &self.shared {
            shared.clear(name);
        }
    }

    /// Whether `name` is currently recording
    pub fn is_recording(&self, name: &str) -> bool {
        self.shared
            .as_ref()
            .map(|s| s.registry.borrow().is_active(name))
            .unwrap_or(false)
    }

    /// Whether the page has been hidden since the last `start`
    pub fn is_hidden(&self) -> bool {
        self.shared
            .as_ref()
            .map(|s| s.gate.is_hidden())
            .unwrap_or(false)
    }

    /// Whether a stream subscription is live
    pub fn is_observing(&self, kind: EntryKind) -> bool {
        self.coordinator
            .as_ref()
            .map(|c| c.is_connected(kind))
            .unwrap_or(false)
    }

    /// Stream coordinator, when the host supports observers
    pub fn coordinator(&self) -> Option<&ObservationCoordinator> {
        self.coordinator.as_deref()
    }
}
