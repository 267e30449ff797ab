//! Device and network context attached to every report

use serde::{Deserialize, Serialize};

use crate::platform::EnvironmentProbe;

/// Network connection quality as reported by the host
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Effective bandwidth estimate (Mbps)
    pub downlink: f64,
    /// `slow-2g`, `2g`, `3g` or `4g`
    pub effective_type: String,
    /// Round-trip time estimate (milliseconds)
    pub rtt: f64,
    /// Whether the user asked for reduced data usage
    pub save_data: bool,
}

impl ConnectionInfo {
    /// Slow connection or reduced data usage requested
    pub fn is_low_end_experience(&self) -> bool {
        matches!(self.effective_type.as_str(), "slow-2g" | "2g" | "3g") || self.save_data
    }
}

/// Service worker availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceWorkerStatus {
    /// A service worker controls the page
    Controlled,
    /// Service workers are available but none controls the page
    Supported,
    #[default]
    Unsupported,
}

/// Point-in-time view of the device, taken when a report is built
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorSnapshot {
    /// Gigabytes, 0 when unknown
    pub device_memory: f64,
    /// Logical processors, 0 when unknown
    pub hardware_concurrency: u32,
    pub is_low_end_device: bool,
    pub is_low_end_experience: bool,
    pub service_worker_status: ServiceWorkerStatus,
}

impl NavigatorSnapshot {
    /// Read the current values from the environment
    pub fn capture(env: &dyn EnvironmentProbe) -> Self {
        let device_memory = env.device_memory().unwrap_or(0.0);
        let hardware_concurrency = env.hardware_concurrency().unwrap_or(0);
        let is_low_end_device = (hardware_concurrency > 0 && hardware_concurrency <= 4)
            || (device_memory > 0.0 && device_memory <= 4.0);
        let is_low_end_experience = env
            .connection()
            .map(|c| c.is_low_end_experience())
            .unwrap_or(false);

        Self {
            device_memory,
            hardware_concurrency,
            is_low_end_device,
            is_low_end_experience,
            service_worker_status: env.service_worker_status(),
        }
    }
}
