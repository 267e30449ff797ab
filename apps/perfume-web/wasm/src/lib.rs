//! WASM bindings for the Perfume metric engine
//!
//! Exposes a `Perfume` class that measures paint, input and custom timings in
//! the page and hands each report to an optional analytics callback.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { Perfume } from './pkg/perfume_web.js';
//!
//! await init();
//!
//! const perfume = new Perfume({
//!     dataConsumption: true,
//!     analyticsTracker: ({ metricName, duration, data }) => send(metricName, duration ?? data),
//! });
//!
//! perfume.start('openDialog');
//! openDialog();
//! perfume.endAfterPaint('openDialog', { dialog: 'settings' });
//! ```

pub mod options;

#[cfg(target_arch = "wasm32")]
pub mod browser;

use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
pub use bindings::Perfume;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(target_arch = "wasm32")]
mod bindings {
    use js_sys::{Function, Reflect};
    use perfume_core::{AnalyticsPayload, Config, CustomProperties};
    use serde_json::{Map, Value};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    use crate::browser::{browser_platform, to_js};
    use crate::options::{config_from_options, OptionKind, OPTION_KEYS};

    fn read_options(options: &JsValue) -> Map<String, Value> {
        let mut map = Map::new();
        if !options.is_object() {
            return map;
        }
        for (key, kind) in OPTION_KEYS {
            let Ok(value) = Reflect::get(options, &JsValue::from_str(key)) else {
                continue;
            };
            let value = match kind {
                OptionKind::Bool => value.as_bool().map(Value::from),
                OptionKind::String => value.as_string().map(Value::from),
                OptionKind::Number => value.as_f64().map(Value::from),
            };
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        }
        map
    }

    fn read_tracker(options: &JsValue) -> Option<Function> {
        if !options.is_object() {
            return None;
        }
        Reflect::get(options, &JsValue::from_str("analyticsTracker"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
    }

    fn read_custom_properties(value: JsValue) -> Option<CustomProperties> {
        if !value.is_object() {
            return None;
        }
        serde_wasm_bindgen::from_value(value).ok()
    }

    /// Hand each payload to a JS tracker function
    pub(crate) fn forward_to(tracker: Function) -> impl Fn(&AnalyticsPayload) + 'static {
        move |payload: &AnalyticsPayload| {
            let Ok(value) = to_js(payload) else {
                return;
            };
            // A throw must not unwind through the dispatcher, which is
            // mid-borrow. It ends up on the console instead of the idle callback.
            if let Err(e) = tracker.call1(&JsValue::NULL, &value) {
                web_sys::console::error_1(&e);
            }
        }
    }

    /// Page performance metrics
    #[wasm_bindgen]
    pub struct Perfume {
        inner: perfume_core::Perfume,
    }

    #[wasm_bindgen]
    impl Perfume {
        /// Create the engine and start observing the page
        ///
        /// `options` uses the camelCase names (`dataConsumption`,
        /// `maxMeasureTime`, `analyticsTracker`, ...). Invalid options fall
        /// back to the defaults.
        #[wasm_bindgen(constructor)]
        pub fn new(options: JsValue) -> Perfume {
            let mut config = match config_from_options(&read_options(&options)) {
                Ok(config) => config,
                Err(e) => {
                    web_sys::console::warn_1(&e.into());
                    Config::default()
                }
            };

            if let Some(tracker) = read_tracker(&options) {
                config = config.with_analytics_tracker(forward_to(tracker));
            }

            Perfume {
                inner: perfume_core::Perfume::new(config, browser_platform()),
            }
        }

        /// Begin a named measurement
        pub fn start(&self, name: &str) {
            self.inner.start(name);
        }

        /// Finish a named measurement and report it
        pub fn end(&self, name: &str, custom_properties: JsValue) {
            self.inner
                .end(name, read_custom_properties(custom_properties));
        }

        /// Finish a named measurement once the next frame has painted
        #[wasm_bindgen(js_name = endAfterPaint)]
        pub fn end_after_paint(&self, name: &str, custom_properties: JsValue) {
            self.inner
                .end_after_paint(name, read_custom_properties(custom_properties));
        }

        /// Abandon a named measurement without reporting
        pub fn clear(&self, name: &str) {
            self.inner.clear(name);
        }
    }
}
