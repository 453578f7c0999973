use serde::{Deserialize, Serialize};

/// Geographic classification of the server, produced once per run by the
/// geolocation lookup and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoClassification {
    pub is_domestic: bool,
    pub country_code: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub isp: String,
}

impl GeoClassification {
    /// Profile used when the geolocation lookup fails: treat the host as
    /// overseas rather than aborting the run.
    pub fn overseas_default() -> Self {
        Self {
            is_domestic: false,
            country_code: "Unknown".to_string(),
            country: "Unknown".to_string(),
            region: String::new(),
            city: "Unknown".to_string(),
            isp: "Unknown".to_string(),
        }
    }
}

/// Per-run state threaded through the components. There is no global
/// singleton; everything a component needs travels in this value.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub geo: GeoClassification,
    /// True when the geolocation lookup failed and `geo` is the
    /// overseas default.
    pub classification_failed: bool,
}

impl RunContext {
    pub fn new(geo: GeoClassification) -> Self {
        Self {
            geo,
            classification_failed: false,
        }
    }

    pub fn unclassified() -> Self {
        Self {
            geo: GeoClassification::overseas_default(),
            classification_failed: true,
        }
    }
}
