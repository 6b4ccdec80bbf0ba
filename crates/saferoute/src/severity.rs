//! Rainfall severity tiers, their status text and their map styling.

use serde::Serialize;

use crate::region::RAINFALL_FLOOR_MM;

/// Rainfall at or above this (mm) is the extreme tier.
pub const EXTREME_THRESHOLD_MM: f64 = 80.0;

/// Severity tier, a pure function of rainfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    Advisory,
    Extreme,
}

/// Styling hints for whoever draws the danger region and status banner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierStyle {
    pub stroke: &'static str,
    pub fill: &'static str,
    pub weight: u8,
    pub fill_opacity: f64,
    /// Pulse the outline (extreme tier only).
    pub animated: bool,
    pub status_color: &'static str,
}

const FILL_OPACITY: f64 = 0.6;

impl Severity {
    pub fn classify(rainfall_mm: f64) -> Self {
        if rainfall_mm >= EXTREME_THRESHOLD_MM {
            Severity::Extreme
        } else if rainfall_mm >= RAINFALL_FLOOR_MM {
            Severity::Advisory
        } else {
            Severity::Safe
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Safe => "safe",
            Severity::Advisory => "advisory",
            Severity::Extreme => "extreme",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Severity::Safe => "Safe",
            Severity::Advisory => "Heavy rain advisory",
            Severity::Extreme => "Extreme rainfall",
        }
    }

    /// Human-readable status text for the given amount.
    pub fn describe(&self, rainfall_mm: f64) -> String {
        let detail = match self {
            Severity::Extreme => "danger zone expanded from historical flood traces",
            Severity::Advisory => "watch riversides and low-lying areas",
            Severity::Safe => "nothing unusual reported",
        };
        format!("{} ({}mm): {}", self.title(), rainfall_mm, detail)
    }

    pub fn style(&self) -> TierStyle {
        match self {
            Severity::Extreme => TierStyle {
                stroke: "#b71c1c",
                fill: "#d32f2f",
                weight: 2,
                fill_opacity: FILL_OPACITY,
                animated: true,
                status_color: "#d32f2f",
            },
            Severity::Advisory => TierStyle {
                stroke: "#e65100",
                fill: "#ff9800",
                weight: 1,
                fill_opacity: FILL_OPACITY,
                animated: false,
                status_color: "#e65100",
            },
            // Never drawn as a region, only the banner colour matters.
            Severity::Safe => TierStyle {
                stroke: "#e65100",
                fill: "#ff9800",
                weight: 1,
                fill_opacity: FILL_OPACITY,
                animated: false,
                status_color: "green",
            },
        }
    }
}

/// Status banner: text plus colour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    pub text: String,
    pub color: &'static str,
}

impl StatusLine {
    /// Banner for a simulated amount: tier text in tier colour.
    pub fn simulated(rainfall_mm: f64) -> Self {
        let tier = Severity::classify(rainfall_mm);
        Self {
            text: tier.describe(rainfall_mm),
            color: tier.style().status_color,
        }
    }

    /// Banner for an observed amount.
    ///
    /// Any live danger region is shown in red; no region gets a dedicated
    /// "safe (live)" message.
    pub fn live(rainfall_mm: f64, has_region: bool) -> Self {
        if has_region {
            Self {
                text: Severity::classify(rainfall_mm).describe(rainfall_mm),
                color: Severity::Extreme.style().status_color,
            }
        } else {
            Self {
                text: format!("Safe (live {}mm): no flood danger zone at the moment", rainfall_mm),
                color: "green",
            }
        }
    }
}
