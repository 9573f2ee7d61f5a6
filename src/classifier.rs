use colored::Color;
use serde::Serialize;
use std::fmt;

pub const CRITICAL_THRESHOLD: f64 = 0.8;
pub const HIGH_THRESHOLD: f64 = 0.6;
pub const MEDIUM_THRESHOLD: f64 = 0.4;

/// Urgency tier derived from a hotness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HotnessTier {
    Critical,
    High,
    Medium,
    Low,
}

impl HotnessTier {
    pub fn as_str(self) -> &'static str {
        match self {
            HotnessTier::Critical => "critical",
            HotnessTier::High => "high",
            HotnessTier::Medium => "medium",
            HotnessTier::Low => "low",
        }
    }
}

impl fmt::Display for HotnessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Red,
    Orange,
    Yellow,
    Blue,
}

impl Severity {
    /// CSS color used by the HTML dashboard.
    pub fn css(self) -> &'static str {
        match self {
            Severity::Red => "#ef4444",
            Severity::Orange => "#f97316",
            Severity::Yellow => "#eab308",
            Severity::Blue => "#3b82f6",
        }
    }

    /// Terminal color. There is no named orange, so it falls back to truecolor.
    pub fn terminal(self) -> Color {
        match self {
            Severity::Red => Color::Red,
            Severity::Orange => Color::TrueColor {
                r: 249,
                g: 115,
                b: 22,
            },
            Severity::Yellow => Color::Yellow,
            Severity::Blue => Color::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tier: HotnessTier,
    pub label: &'static str,
    pub severity: Severity,
}

/// Maps a hotness score in `[0, 1]` to its presentation tier.
///
/// Each threshold belongs to the higher tier: exactly 0.8 is critical,
/// exactly 0.6 is high and exactly 0.4 is medium. Out-of-range input is
/// rejected by [`crate::schema::AnalysisResponse::validate`] before it gets here.
pub fn classify(hotness: f64) -> Classification {
    debug_assert!(
        (0.0..=1.0).contains(&hotness),
        "hotness {} outside [0, 1]",
        hotness
    );

    if hotness >= CRITICAL_THRESHOLD {
        Classification {
            tier: HotnessTier::Critical,
            label: "very hot",
            severity: Severity::Red,
        }
    } else if hotness >= HIGH_THRESHOLD {
        Classification {
            tier: HotnessTier::High,
            label: "hot",
            severity: Severity::Orange,
        }
    } else if hotness >= MEDIUM_THRESHOLD {
        Classification {
            tier: HotnessTier::Medium,
            label: "warm",
            severity: Severity::Yellow,
        }
    } else {
        Classification {
            tier: HotnessTier::Low,
            label: "current",
            severity: Severity::Blue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_belong_to_higher_tier() {
        assert_eq!(classify(0.8).tier, HotnessTier::Critical);
        assert_eq!(classify(0.8).label, "very hot");
        assert_eq!(classify(0.6).tier, HotnessTier::High);
        assert_eq!(classify(0.6).label, "hot");
        assert_eq!(classify(0.4).tier, HotnessTier::Medium);
        assert_eq!(classify(0.4).label, "warm");
    }

    #[test]
    fn test_just_below_boundaries() {
        assert_eq!(classify(0.799_999).tier, HotnessTier::High);
        assert_eq!(classify(0.599_999).tier, HotnessTier::Medium);
        assert_eq!(classify(0.399_999).tier, HotnessTier::Low);
        assert_eq!(classify(0.399_999).label, "current");
    }

    #[test]
    fn test_full_range_is_total() {
        for step in 0..=1000 {
            let hotness = step as f64 / 1000.0;
            let classification = classify(hotness);
            let expected = if hotness >= 0.8 {
                HotnessTier::Critical
            } else if hotness >= 0.6 {
                HotnessTier::High
            } else if hotness >= 0.4 {
                HotnessTier::Medium
            } else {
                HotnessTier::Low
            };
            assert_eq!(classification.tier, expected, "hotness {}", hotness);
        }
        assert_eq!(classify(0.0).severity, Severity::Blue);
        assert_eq!(classify(1.0).severity, Severity::Red);
    }
}
