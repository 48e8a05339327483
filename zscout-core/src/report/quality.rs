//! Report quality metrics and the ranking used to pick between attempts.

use super::types::Report;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Size measurements of a parsed report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Characters (not bytes) across all section titles and contents.
    pub total_chars: usize,
    pub section_count: usize,
    pub reference_count: usize,
}

impl QualityMetrics {
    pub fn measure(report: &Report) -> Self {
        let total_chars = report
            .sections
            .iter()
            .map(|s| s.title.chars().count() + s.content.chars().count())
            .sum();
        Self {
            total_chars,
            section_count: report.sections.len(),
            reference_count: report.references.len(),
        }
    }

    /// Check the metrics against a set of thresholds.
    pub fn assess(&self, thresholds: &QualityThresholds) -> QualityAssessment {
        let mut shortfalls = Vec::new();
        for (metric, observed, required) in [
            (Metric::TotalChars, self.total_chars, thresholds.min_total_chars),
            (Metric::Sections, self.section_count, thresholds.min_sections),
            (Metric::References, self.reference_count, thresholds.min_references),
        ] {
            if observed < required {
                shortfalls.push(Shortfall {
                    metric,
                    observed,
                    required,
                });
            }
        }
        QualityAssessment {
            metrics: *self,
            shortfalls,
        }
    }
}

/// Minimum acceptable values for each metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub min_total_chars: usize,
    pub min_sections: usize,
    pub min_references: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_total_chars: 5000,
            min_sections: 5,
            min_references: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalChars,
    Sections,
    References,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::TotalChars => write!(f, "total characters"),
            Metric::Sections => write!(f, "sections"),
            Metric::References => write!(f, "references"),
        }
    }
}

/// One metric that fell below its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub metric: Metric,
    pub observed: usize,
    pub required: usize,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (need at least {})",
            self.metric, self.observed, self.required
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityAssessment {
    pub metrics: QualityMetrics,
    pub shortfalls: Vec<Shortfall>,
}

impl QualityAssessment {
    pub fn passes(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

/// Rank two reports by their metrics.
///
/// Each side scores a point for every metric where it is strictly higher. More
/// points wins; equal points fall back to `total_chars`, then `Equal`.
pub fn compare(a: &QualityMetrics, b: &QualityMetrics) -> Ordering {
    let pairs = [
        (a.total_chars, b.total_chars),
        (a.section_count, b.section_count),
        (a.reference_count, b.reference_count),
    ];
    let a_points = pairs.iter().filter(|(x, y)| x > y).count();
    let b_points = pairs.iter().filter(|(x, y)| y > x).count();
    a_points
        .cmp(&b_points)
        .then_with(|| a.total_chars.cmp(&b.total_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{Reference, Section};
    use pretty_assertions::assert_eq;

    fn metrics(total_chars: usize, section_count: usize, reference_count: usize) -> QualityMetrics {
        QualityMetrics {
            total_chars,
            section_count,
            reference_count,
        }
    }

    #[test]
    fn test_measure_counts_chars_not_bytes() {
        let report = Report {
            title: "ignored in the count".into(),
            sections: vec![Section::new("Café", "naïve"), Section::new("ab", "")],
            references: vec![Reference::default(); 3],
            ..Default::default()
        };
        assert_eq!(QualityMetrics::measure(&report), metrics(11, 2, 3));
    }

    #[test]
    fn test_assess_passes_at_thresholds() {
        let assessment = metrics(5000, 5, 8).assess(&QualityThresholds::default());
        assert!(assessment.passes());
    }

    #[test]
    fn test_assess_lists_every_shortfall() {
        let assessment = metrics(1200, 3, 8).assess(&QualityThresholds::default());
        assert!(!assessment.passes());
        assert_eq!(
            assessment.shortfalls,
            vec![
                Shortfall {
                    metric: Metric::TotalChars,
                    observed: 1200,
                    required: 5000
                },
                Shortfall {
                    metric: Metric::Sections,
                    observed: 3,
                    required: 5
                },
            ]
        );
        assert_eq!(
            assessment.shortfalls[1].to_string(),
            "sections: 3 (need at least 5)"
        );
    }

    #[test]
    fn test_compare_majority_of_metrics_wins() {
        // b is longer but a wins on sections and references.
        assert_eq!(compare(&metrics(4000, 6, 9), &metrics(6000, 4, 5)), Ordering::Greater);
        assert_eq!(compare(&metrics(6000, 4, 5), &metrics(4000, 6, 9)), Ordering::Less);
    }

    #[test]
    fn test_compare_tie_falls_back_to_chars() {
        // One point each, sections equal.
        assert_eq!(compare(&metrics(5000, 5, 3), &metrics(4000, 5, 9)), Ordering::Greater);
    }

    #[test]
    fn test_compare_identical_is_equal() {
        assert_eq!(compare(&metrics(10, 1, 1), &metrics(10, 1, 1)), Ordering::Equal);
    }
}
