//! Signal quality grading
//!
//! Each lead is checked for three defects:
//! - flat line (standard deviation below a floor)
//! - rail saturation (a large share of samples pinned at the lead's extremes)
//! - high-frequency noise (first-difference energy relative to signal energy)
//!
//! Penalties are averaged over the 12 leads into a score in [0, 1]:
//! Good at 0.8 and above, Acceptable at 0.6 and above, otherwise Poor.

use crate::types::{Lead, Recording};
use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalQuality {
    Good,
    Acceptable,
    Poor,
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalQuality::Good => write!(f, "Good"),
            SignalQuality::Acceptable => write!(f, "Acceptable"),
            SignalQuality::Poor => write!(f, "Poor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    FlatLine,
    Saturated,
    HighFrequencyNoise,
}

impl QualityIssue {
    fn penalty(self) -> f64 {
        match self {
            QualityIssue::FlatLine => 1.0,
            QualityIssue::Saturated | QualityIssue::HighFrequencyNoise => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadIssue {
    pub lead: Lead,
    pub issue: QualityIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAssessment {
    pub grade: SignalQuality,
    pub score: f64,
    pub issues: Vec<LeadIssue>,
}

#[derive(Debug, Clone)]
pub struct SignalQualityScorer {
    flat_std: f64,
    saturation_fraction: f64,
    noise_ratio: f64,
    good_threshold: f64,
    acceptable_threshold: f64,
}

impl Default for SignalQualityScorer {
    fn default() -> Self {
        Self {
            flat_std: 1e-3,
            saturation_fraction: 0.05,
            noise_ratio: 0.3,
            good_threshold: 0.8,
            acceptable_threshold: 0.6,
        }
    }
}

impl SignalQualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grade(&self, recording: &Recording) -> SignalQuality {
        self.assess(recording).grade
    }

    pub fn assess(&self, recording: &Recording) -> QualityAssessment {
        let mut issues = Vec::new();
        let mut penalty = 0.0;
        for lead in Lead::ALL {
            let samples = recording.lead_f64(lead);
            let lead_issues = self.check_lead(&samples);
            penalty += lead_issues
                .iter()
                .map(|i| i.penalty())
                .sum::<f64>()
                .min(1.0);
            issues.extend(lead_issues.into_iter().map(|issue| LeadIssue { lead, issue }));
        }

        let score = 1.0 - penalty / Lead::ALL.len() as f64;
        let grade = if score >= self.good_threshold {
            SignalQuality::Good
        } else if score >= self.acceptable_threshold {
            SignalQuality::Acceptable
        } else {
            SignalQuality::Poor
        };
        debug!(score, issues = issues.len(), "Signal quality {}", grade);
        QualityAssessment {
            grade,
            score,
            issues,
        }
    }

    fn check_lead(&self, x: &[f64]) -> Vec<QualityIssue> {
        let n = x.len() as f64;
        let mean = x.iter().sum::<f64>() / n;
        let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        if !variance.is_finite() || variance.sqrt() < self.flat_std {
            return vec![QualityIssue::FlatLine];
        }

        let mut found = Vec::new();
        let (lo, hi) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let tolerance = (hi - lo) * 1e-4;
        let pinned = x
            .iter()
            .filter(|&&v| v - lo <= tolerance || hi - v <= tolerance)
            .count() as f64;
        if pinned / n > self.saturation_fraction {
            found.push(QualityIssue::Saturated);
        }

        let diff_energy: f64 = x.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
        let ratio = diff_energy / (2.0 * variance * n);
        if ratio > self.noise_ratio {
            found.push(QualityIssue::HighFrequencyNoise);
        }
        found
    }
}
