//! Browser implementations of the engine's host capabilities
//!
//! Every capability is probed before use: a browser without
//! `PerformanceObserver` or `requestIdleCallback` still gets a working engine
//! with fewer features.

use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use perfume_core::{
    ConnectionInfo, EntryCallback, EntryKind, EnvironmentProbe, HiddenCallback, IdleScheduler,
    LogSink, NavigationTimingEntry, ObservationEntry, ObserverHost, PerfumeError,
    PerformanceClock, Platform, ServiceWorkerStatus, Subscription, Task, TimerHost, TimerId,
    TimingEntry, VisibilitySignal,
};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, Document, Navigator, Performance, PerformanceEntry, VisibilityState, Window};

#[wasm_bindgen]
extern "C" {
    type PerformanceObserver;

    #[wasm_bindgen(constructor, catch)]
    fn new(callback: &Function) -> Result<PerformanceObserver, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn observe(this: &PerformanceObserver, options: &Object) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    fn disconnect(this: &PerformanceObserver);

    type PerformanceObserverEntryList;

    #[wasm_bindgen(method, js_name = getEntries)]
    fn get_entries(this: &PerformanceObserverEntryList) -> Array;
}

fn js_error(e: JsValue) -> PerfumeError {
    PerfumeError::Host(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

fn get(obj: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn get_f64(obj: &JsValue, key: &str) -> Option<f64> {
    get(obj, key).and_then(|v| v.as_f64())
}

fn get_string(obj: &JsValue, key: &str) -> Option<String> {
    get(obj, key).and_then(|v| v.as_string())
}

/// Assemble the platform for the current window
///
/// Outside a window (workers, server-side rendering) the platform is empty
/// and the engine does nothing.
pub fn browser_platform() -> Platform {
    let Some(window) = web_sys::window() else {
        return Platform::new();
    };
    let Some(performance) = window.performance() else {
        return Platform::new();
    };

    let mut platform = Platform::new()
        .with_clock(Rc::new(BrowserClock { performance }))
        .with_timers(Rc::new(BrowserTimers {
            window: window.clone(),
        }))
        .with_environment(Rc::new(BrowserEnvironment {
            navigator: window.navigator(),
        }))
        .with_log_sink(Rc::new(ConsoleLogSink));

    if Reflect::has(&window, &JsValue::from_str("PerformanceObserver")).unwrap_or(false) {
        platform = platform.with_observer(Rc::new(BrowserObserver));
    }
    if let Some(request) = get(&window, "requestIdleCallback").and_then(|f| f.dyn_into().ok()) {
        platform = platform.with_idle(Rc::new(BrowserIdle {
            window: window.clone(),
            request,
        }));
    }
    if let Some(document) = window.document() {
        platform = platform.with_visibility(Rc::new(BrowserVisibility { document }));
    }
    platform
}

struct BrowserClock {
    performance: Performance,
}

impl PerformanceClock for BrowserClock {
    fn mark(&self, name: &str) -> perfume_core::Result<()> {
        self.performance.mark(name).map(|_| ()).map_err(js_error)
    }

    fn clear_marks(&self, name: &str) {
        self.performance.clear_marks_with_mark_name(name);
    }

    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> perfume_core::Result<()> {
        self.performance
            .measure_with_start_mark_and_end_mark(name, start_mark, end_mark)
            .map(|_| ())
            .map_err(js_error)
    }

    fn entries_by_name(&self, name: &str, entry_type: &str) -> Vec<TimingEntry> {
        self.performance
            .get_entries_by_name_with_entry_type(name, entry_type)
            .iter()
            .filter_map(|v| v.dyn_into::<PerformanceEntry>().ok())
            .map(|e| TimingEntry {
                name: e.name(),
                entry_type: e.entry_type(),
                start_time: e.start_time(),
                duration: e.duration(),
            })
            .collect()
    }

    fn navigation_timing(&self) -> Option<NavigationTimingEntry> {
        let entry = self.performance.get_entries_by_type("navigation").get(0);
        if entry.is_undefined() {
            return None;
        }
        let field = |key: &str| get_f64(&entry, key).unwrap_or(0.0);
        Some(NavigationTimingEntry {
            fetch_start: field("fetchStart"),
            worker_start: field("workerStart"),
            request_start: field("requestStart"),
            response_start: field("responseStart"),
            response_end: field("responseEnd"),
            domain_lookup_start: field("domainLookupStart"),
            domain_lookup_end: field("domainLookupEnd"),
            transfer_size: field("transferSize"),
            encoded_body_size: field("encodedBodySize"),
        })
    }
}

fn to_observation(kind: EntryKind, value: &JsValue) -> ObservationEntry {
    let mut entry = ObservationEntry::new(kind, get_string(value, "name").unwrap_or_default());
    entry.start_time = get_f64(value, "startTime").unwrap_or(0.0);
    entry.duration = get_f64(value, "duration").unwrap_or(0.0);
    entry.render_time = get_f64(value, "renderTime");
    entry.load_time = get_f64(value, "loadTime");
    entry.decoded_body_size = get_f64(value, "decodedBodySize");
    entry.initiator_type = get_string(value, "initiatorType");
    entry
}

struct BrowserObserver;

impl ObserverHost for BrowserObserver {
    fn observe(
        &self,
        kind: EntryKind,
        mut callback: EntryCallback,
    ) -> perfume_core::Result<Box<dyn Subscription>> {
        let closure = Closure::wrap(Box::new(move |list: PerformanceObserverEntryList| {
            let entries: Vec<ObservationEntry> = list
                .get_entries()
                .iter()
                .map(|v| to_observation(kind, &v))
                .collect();
            callback(&entries);
        }) as Box<dyn FnMut(PerformanceObserverEntryList)>);

        let observer_error = |e: JsValue| PerfumeError::Observer {
            kind,
            reason: e.as_string().unwrap_or_else(|| format!("{:?}", e)),
        };

        let observer =
            PerformanceObserver::new(closure.as_ref().unchecked_ref()).map_err(observer_error)?;

        let options = Object::new();
        Reflect::set(&options, &"type".into(), &kind.as_str().into()).map_err(js_error)?;
        Reflect::set(&options, &"buffered".into(), &JsValue::TRUE).map_err(js_error)?;
        observer.observe(&options).map_err(observer_error)?;

        Ok(Box::new(BrowserSubscription {
            observer,
            closure: Some(closure),
        }))
    }
}

struct BrowserSubscription {
    observer: PerformanceObserver,
    closure: Option<Closure<dyn FnMut(PerformanceObserverEntryList)>>,
}

impl Subscription for BrowserSubscription {
    fn disconnect(&mut self) {
        self.observer.disconnect();
        // Disconnecting happens from inside the callback; it must outlive this call.
        if let Some(closure) = self.closure.take() {
            closure.forget();
        }
    }
}

struct BrowserTimers {
    window: Window,
}

impl TimerHost for BrowserTimers {
    fn set_timeout(&self, delay_ms: u32, task: Task) -> TimerId {
        let callback = Closure::once_into_js(move || task());
        let handle = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                delay_ms.min(i32::MAX as u32) as i32,
            )
            .unwrap_or(0);
        TimerId(handle as u64)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.window.clear_timeout_with_handle(id.0 as i32);
    }
}

struct BrowserIdle {
    window: Window,
    request: Function,
}

/// `{ timeout }` argument of `requestIdleCallback`
fn idle_options(timeout_ms: u32) -> perfume_core::Result<Object> {
    let options = Object::new();
    Reflect::set(&options, &"timeout".into(), &timeout_ms.into()).map_err(js_error)?;
    Ok(options)
}

impl IdleScheduler for BrowserIdle {
    fn request_idle(&self, task: Task, timeout_ms: u32) {
        let callback = Closure::once_into_js(move || task());
        let options = idle_options(timeout_ms).unwrap_or_else(|e| {
            console::warn_2(&"idle timeout not set:".into(), &e.to_string().into());
            Object::new()
        });
        if let Err(e) = self.request.call2(&self.window, &callback, &options) {
            console::warn_1(&e);
        }
    }
}

struct BrowserVisibility {
    document: Document,
}

impl VisibilitySignal for BrowserVisibility {
    fn on_hidden(&self, mut callback: HiddenCallback) -> perfume_core::Result<()> {
        let document = self.document.clone();
        let listener = Closure::wrap(Box::new(move || {
            if document.visibility_state() == VisibilityState::Hidden {
                callback();
            }
        }) as Box<dyn FnMut()>);

        self.document
            .add_event_listener_with_callback("visibilitychange", listener.as_ref().unchecked_ref())
            .map_err(js_error)?;
        // Lives as long as the page
        listener.forget();
        Ok(())
    }
}

struct BrowserEnvironment {
    navigator: Navigator,
}

impl EnvironmentProbe for BrowserEnvironment {
    fn device_memory(&self) -> Option<f64> {
        get_f64(&self.navigator, "deviceMemory")
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        let cores = self.navigator.hardware_concurrency();
        (cores > 0.0).then_some(cores as u32)
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        let connection = get(&self.navigator, "connection")?;
        Some(ConnectionInfo {
            downlink: get_f64(&connection, "downlink").unwrap_or(0.0),
            effective_type: get_string(&connection, "effectiveType").unwrap_or_default(),
            rtt: get_f64(&connection, "rtt").unwrap_or(0.0),
            save_data: get(&connection, "saveData")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }

    fn service_worker_status(&self) -> ServiceWorkerStatus {
        match get(&self.navigator, "serviceWorker") {
            None => ServiceWorkerStatus::Unsupported,
            Some(sw) if get(&sw, "controller").is_some() => ServiceWorkerStatus::Controlled,
            Some(_) => ServiceWorkerStatus::Supported,
        }
    }
}

/// Plain JS value for a report payload (objects, not `Map`s)
pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

/// Writes reports to the developer console
pub struct ConsoleLogSink;

impl LogSink for ConsoleLogSink {
    fn metric(&self, prefix: &str, name: &str, duration_ms: f64) {
        console::log_3(
            &prefix.into(),
            &name.into(),
            &format!("{} ms", duration_ms).into(),
        );
    }

    fn data(&self, prefix: &str, name: &str, data: &Value) {
        let data = to_js(data).unwrap_or_else(|_| JsValue::from_str(&data.to_string()));
        console::log_3(&prefix.into(), &name.into(), &data);
    }

    fn warn(&self, prefix: &str, message: &str) {
        console::warn_2(&prefix.into(), &message.into());
    }
}
