//! Resource byte totals by initiator category

use std::collections::BTreeMap;

use serde::Serialize;

use crate::duration::round_two;
use crate::entry::ObservationEntry;

/// Bucket a resource's bytes are counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceCategory {
    Beacon,
    Css,
    Fetch,
    Img,
    Other,
    Script,
    XmlHttpRequest,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 7] = [
        ResourceCategory::Beacon,
        ResourceCategory::Css,
        ResourceCategory::Fetch,
        ResourceCategory::Img,
        ResourceCategory::Other,
        ResourceCategory::Script,
        ResourceCategory::XmlHttpRequest,
    ];

    /// Map an entry's `initiatorType`; unknown initiators count as `other`
    pub fn from_initiator(initiator: &str) -> Self {
        match initiator {
            "beacon" => ResourceCategory::Beacon,
            "css" => ResourceCategory::Css,
            "fetch" => ResourceCategory::Fetch,
            "img" => ResourceCategory::Img,
            "script" => ResourceCategory::Script,
            "xmlhttprequest" => ResourceCategory::XmlHttpRequest,
            _ => ResourceCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Beacon => "beacon",
            ResourceCategory::Css => "css",
            ResourceCategory::Fetch => "fetch",
            ResourceCategory::Img => "img",
            ResourceCategory::Other => "other",
            ResourceCategory::Script => "script",
            ResourceCategory::XmlHttpRequest => "xmlhttprequest",
        }
    }
}

/// Kilobyte totals, serialized as a flat `{beacon, css, ..., total}` object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionTotals {
    #[serde(flatten)]
    pub per_category: BTreeMap<&'static str, f64>,
    pub total: f64,
}

impl ConsumptionTotals {
    pub fn get(&self, category: ResourceCategory) -> f64 {
        self.per_category
            .get(category.as_str())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Running sum of decoded resource sizes
#[derive(Debug, Clone)]
pub struct ResourceConsumptionAccumulator {
    per_category: BTreeMap<ResourceCategory, f64>,
    total: f64,
}

impl ResourceConsumptionAccumulator {
    pub fn new() -> Self {
        Self {
            per_category: ResourceCategory::ALL.iter().map(|c| (*c, 0.0)).collect(),
            total: 0.0,
        }
    }

    /// Count a resource entry's decoded body size, in kilobytes
    ///
    /// Entries without a size or initiator are ignored.
    pub fn add(&mut self, entry: &ObservationEntry) {
        let (Some(bytes), Some(initiator)) = (entry.decoded_body_size, &entry.initiator_type)
        else {
            return;
        };
        let kilobytes = bytes / 1000.0;
        *self
            .per_category
            .entry(ResourceCategory::from_initiator(initiator))
            .or_insert(0.0) += kilobytes;
        self.total += kilobytes;
    }

    /// Snapshot of the current totals, rounded to two decimals
    pub fn totals(&self) -> ConsumptionTotals {
        ConsumptionTotals {
            per_category: self
                .per_category
                .iter()
                .map(|(c, kb)| (c.as_str(), round_two(*kb)))
                .collect(),
            total: round_two(self.total),
        }
    }
}

impl Default for ResourceConsumptionAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_img_and_script_totals() {
        let mut acc = ResourceConsumptionAccumulator::new();
        acc.add(&ObservationEntry::resource("/hero.png", "img", 2000.0));
        acc.add(&ObservationEntry::resource("/app.js", "script", 4000.0));

        let totals = acc.totals();
        assert_eq!(totals.get(ResourceCategory::Img), 2.0);
        assert_eq!(totals.get(ResourceCategory::Script), 4.0);
        assert_eq!(totals.total, 6.0);
        assert_eq!(
            serde_json::to_value(&totals).unwrap(),
            json!({
                "beacon": 0.0,
                "css": 0.0,
                "fetch": 0.0,
                "img": 2.0,
                "other": 0.0,
                "script": 4.0,
                "total": 6.0,
                "xmlhttprequest": 0.0
            })
        );
    }

    #[test]
    fn test_unknown_initiator_counts_as_other() {
        let mut acc = ResourceConsumptionAccumulator::new();
        acc.add(&ObservationEntry::resource("/font.woff2", "link", 1500.0));

        let totals = acc.totals();
        assert_eq!(totals.get(ResourceCategory::Other), 1.5);
        assert_eq!(totals.total, 1.5);
    }

    #[test]
    fn test_entries_without_size_are_ignored() {
        let mut acc = ResourceConsumptionAccumulator::new();
        let mut entry = ObservationEntry::resource("/x", "fetch", 0.0);
        entry.decoded_body_size = None;
        acc.add(&entry);

        assert_eq!(acc.totals().total, 0.0);
    }

    #[test]
    fn test_totals_are_rounded() {
        let mut acc = ResourceConsumptionAccumulator::new();
        acc.add(&ObservationEntry::resource("/a", "fetch", 100.0));
        acc.add(&ObservationEntry::resource("/b", "fetch", 200.0));

        // 0.1 + 0.2 must not leak floating point noise into the report
        assert_eq!(acc.totals().get(ResourceCategory::Fetch), 0.3);
        assert_eq!(acc.totals().total, 0.3);
    }

    #[test]
    fn test_category_mapping() {
        for category in ResourceCategory::ALL {
            assert_eq!(ResourceCategory::from_initiator(category.as_str()), category);
        }
    }
}
