// src/config.rs
// =============================================================================
// Scoring thresholds, read from a YAML file (audit/thresholds.yaml).
//
// Every key is optional. A missing key, a missing section or a missing file
// all fall back to the defaults below, so the file only needs to contain
// what you want to change:
//
//   marketing:
//     broken_links: { orange: 5, red: 20 }
//
// A file that cannot be read or parsed is logged as a warning and the
// defaults are used; scoring never fails because of configuration.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub colors: ColorCutoffs,
    pub technical: TechnicalThresholds,
    pub security: SecurityThresholds,
    pub legal: LegalThresholds,
    pub usability: UsabilityThresholds,
    pub marketing: MarketingThresholds,
}

// Score cutoffs for the traffic light of every chapter except technical
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorCutoffs {
    pub green: i32,
    pub orange: i32,
}

impl Default for ColorCutoffs {
    fn default() -> Self {
        Self { green: 8, orange: 5 }
    }
}

// Lighthouse performance ratio cutoffs (0.0 - 1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalThresholds {
    pub green: f64,
    pub orange: f64,
}

impl Default for TechnicalThresholds {
    fn default() -> Self {
        Self { green: 0.7, orange: 0.4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityThresholds {
    pub required_header: String,
    pub missing_header_penalty: i32,
    pub no_ipv6_penalty: i32,
}

impl Default for SecurityThresholds {
    fn default() -> Self {
        Self {
            required_header: "content-security-policy".to_string(),
            missing_header_penalty: 3,
            no_ipv6_penalty: 2,
        }
    }
}

// A count that is fine up to `orange`, worrying up to `red`, bad above
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountCutoffs {
    pub orange: usize,
    pub red: usize,
}

impl CountCutoffs {
    pub const fn new(orange: usize, red: usize) -> Self {
        Self { orange, red }
    }

    // 0 within bounds, 1 above orange, 2 above red
    pub fn severity(&self, count: usize) -> i32 {
        if count > self.red {
            2
        } else if count > self.orange {
            1
        } else {
            0
        }
    }
}

impl Default for CountCutoffs {
    fn default() -> Self {
        Self::new(3, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalThresholds {
    pub base: i32,
    /// Score when the cookie scan itself failed
    pub collector_error_score: i32,
    /// Third-party calls before consent
    pub third_party: CountCutoffs,
    pub orange_penalty: i32,
    pub red_penalty: i32,
    /// More first-party cookies than this counts as red
    pub first_party_cookie_max: usize,
    /// Tracking present but no banner found
    pub missing_banner_penalty: i32,
}

impl Default for LegalThresholds {
    fn default() -> Self {
        Self {
            base: 10,
            collector_error_score: 6,
            third_party: CountCutoffs::new(0, 5),
            orange_penalty: 4,
            red_penalty: 6,
            first_party_cookie_max: 10,
            missing_banner_penalty: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsabilityThresholds {
    pub collector_error_score: i32,
    /// Up to this many issues scores 10
    pub green_max: usize,
    /// Up to this many issues scores 7, more scores 3
    pub orange_max: usize,
}

impl Default for UsabilityThresholds {
    fn default() -> Self {
        Self {
            collector_error_score: 7,
            green_max: 0,
            orange_max: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingThresholds {
    pub base: i32,
    pub trend_up_bonus: i32,
    pub trend_down_penalty: i32,
    pub search_error_penalty: i32,
    pub no_structured_data_penalty: i32,
    /// Crawl health at or above this adds a point
    pub health_green: u8,
    /// Crawl health below this costs a point
    pub health_orange: u8,
    pub broken_links: CountCutoffs,
    pub weak_titles: CountCutoffs,
    pub missing_meta: CountCutoffs,
    pub multi_h1: CountCutoffs,
}

impl Default for MarketingThresholds {
    fn default() -> Self {
        Self {
            base: 7,
            trend_up_bonus: 2,
            trend_down_penalty: 2,
            search_error_penalty: 1,
            no_structured_data_penalty: 2,
            health_green: 8,
            health_orange: 5,
            broken_links: CountCutoffs::default(),
            weak_titles: CountCutoffs::default(),
            missing_meta: CountCutoffs::default(),
            multi_h1: CountCutoffs::default(),
        }
    }
}

impl Thresholds {
    // Reads thresholds from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a valid "use the defaults"
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    // Loads thresholds from a file, falling back to defaults with a warning
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "thresholds file not readable, using defaults");
                return Self::default();
            }
        };

        match Self::from_yaml(&text) {
            Ok(thresholds) => {
                debug!(path = %path.display(), "loaded thresholds");
                thresholds
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "thresholds file not valid YAML, using defaults");
                Self::default()
            }
        }
    }
}
