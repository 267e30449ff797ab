//! Navigation timing breakdown (TTFB, DNS lookup, download time, ...)

use serde::{Deserialize, Serialize};

use crate::duration::round_two;

/// Raw navigation entry fields, in milliseconds relative to the time origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationTimingEntry {
    pub fetch_start: f64,
    pub worker_start: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    /// Bytes
    pub transfer_size: f64,
    /// Bytes
    pub encoded_body_size: f64,
}

/// Derived navigation timings reported as `navigationTiming`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub fetch_time: f64,
    pub worker_time: f64,
    pub total_time: f64,
    pub download_time: f64,
    pub time_to_first_byte: f64,
    pub header_size: f64,
    pub dns_lookup_time: f64,
}

impl From<&NavigationTimingEntry> for NavigationTiming {
    fn from(e: &NavigationTimingEntry) -> Self {
        let worker_time = if e.worker_start > 0.0 {
            e.response_end - e.worker_start
        } else {
            0.0
        };
        Self {
            fetch_time: round_two(e.response_end - e.fetch_start),
            worker_time: round_two(worker_time),
            total_time: round_two(e.response_end - e.request_start),
            download_time: round_two(e.response_end - e.response_start),
            time_to_first_byte: round_two(e.response_start - e.request_start),
            header_size: round_two((e.transfer_size - e.encoded_body_size).max(0.0)),
            dns_lookup_time: round_two(e.domain_lookup_end - e.domain_lookup_start),
        }
    }
}
