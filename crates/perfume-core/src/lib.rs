//! Runtime performance metrics for interactive clients
//!
//! This crate collects page performance signals (paint timing, input
//! responsiveness, largest contentful paint, resource consumption and manual
//! start/end measurements) and reports them to a log sink and an analytics
//! tracker.
//!
//! # Features
//!
//! - **Paint metrics**: first paint and first contentful paint
//! - **First input delay**: which also finalizes LCP and data consumption
//! - **Manual measurements**: `start`/`end` pairs backed by host marks
//! - **Noise suppression**: durations `<= 0` or above `max_measure_time` are dropped
//! - **Visibility gating**: nothing is reported once the page has been hidden
//! - **Idle dispatch**: reports are delivered when the host is idle
//!
//! # Architecture
//!
//! The engine never reaches for global host state. Clocks, observers,
//! timers, idle scheduling, visibility and device introspection are trait
//! objects bundled in a [`Platform`] and handed to [`Perfume::new`]. The
//! browser bindings live in the `perfume-web` app; tests plug in fakes.
//!
//! ```text
//! streams ──> ObservationCoordinator ──┐
//!                                      ├──> IdleDispatchQueue ──> ReportDispatcher ──> log / analytics
//! start/end ──> MetricRegistry ────────┘                              (VisibilityGate)
//! ```

pub mod config;
pub mod consumption;
pub mod dispatcher;
pub mod duration;
pub mod engine;
pub mod entry;
pub mod error;
pub mod idle;
pub mod navigation;
pub mod navigator;
pub mod observer;
pub mod platform;
pub mod registry;
pub mod report;
pub mod sink;
pub mod visibility;

// Re-export main types for convenience
pub use config::Config;
pub use consumption::{ConsumptionTotals, ResourceCategory, ResourceConsumptionAccumulator};
pub use dispatcher::{DispatchOutcome, ReportDispatcher};
pub use engine::Perfume;
pub use entry::{EntryKind, ObservationEntry};
pub use error::{PerfumeError, Result};
pub use navigation::{NavigationTiming, NavigationTimingEntry};
pub use navigator::{ConnectionInfo, NavigatorSnapshot, ServiceWorkerStatus};
pub use platform::{
    EntryCallback, EnvironmentProbe, HiddenCallback, IdleScheduler, NullEnvironment, ObserverHost,
    PerformanceClock, Platform, Subscription, Task, TimerHost, TimerId, TimingEntry,
    VisibilitySignal,
};
pub use report::{AnalyticsPayload, CustomProperties, Report, ReportValue};
pub use sink::{AnalyticsTracker, LogSink, TracingLogSink};
