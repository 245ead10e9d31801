//! Narrative reasoning report

use super::contribution::{lead_contributions, LeadContribution};
use super::prediction::{Prediction, RankedLabel, ThresholdFlag};
use super::quality::{SignalQuality, SignalQualityScorer};
use super::ReportError;
use crate::labels::{Vocabulary, DECODE_THRESHOLD};
use crate::risk::RiskProfile;
use crate::types::Recording;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Leads listed in the report
pub const TOP_LEADS: usize = 3;

pub const NO_FINDING: &str = "No major condition detected";

/// Rounded to two decimals, then the shortest decimal form, keeping one
/// decimal place for whole numbers
fn format_number(value: f64) -> String {
    let value = (value * 100.0).round() / 100.0;
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningReport {
    diagnosis: String,
    confidence: f64,
    flag: ThresholdFlag,
    top_leads: Vec<LeadContribution>,
    risks: RiskProfile,
    quality: SignalQuality,
}

impl ReasoningReport {
    /// `ranked` is most probable first; only the first label becomes the
    /// diagnosis. `leads` must already be sorted by contribution.
    pub fn new(
        ranked: &[RankedLabel],
        confidence: f64,
        flag: ThresholdFlag,
        leads: &[LeadContribution],
        risks: RiskProfile,
        quality: SignalQuality,
    ) -> Self {
        let diagnosis = ranked
            .first()
            .map(|label| label.code.clone())
            .unwrap_or_else(|| NO_FINDING.to_string());
        Self {
            diagnosis,
            confidence,
            flag,
            top_leads: leads.iter().take(TOP_LEADS).copied().collect(),
            risks,
            quality,
        }
    }

    pub fn diagnosis(&self) -> &str {
        &self.diagnosis
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn flag(&self) -> ThresholdFlag {
        self.flag
    }

    pub fn top_leads(&self) -> &[LeadContribution] {
        &self.top_leads
    }

    pub fn risks(&self) -> &RiskProfile {
        &self.risks
    }

    pub fn quality(&self) -> SignalQuality {
        self.quality
    }
}

impl fmt::Display for ReasoningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leads: Vec<String> = self
            .top_leads
            .iter()
            .map(|c| format!("{} ({}%)", c.lead, format_number(c.percent)))
            .collect();
        let risks: Vec<String> = self
            .risks
            .entries()
            .iter()
            .map(|e| format!("{}: {}%", e.name, format_number(e.percent)))
            .collect();

        writeln!(f, "Diagnosis: {}", self.diagnosis)?;
        writeln!(f, "Confidence: {:.1}% ({})", self.confidence, self.flag)?;
        writeln!(f, "Top Leads: {}", leads.join(", "))?;
        writeln!(f, "Risks: {}", risks.join(", "))?;
        write!(f, "ECG Quality: {}", self.quality)
    }
}

/// Assembles a report from a prediction, the recording it was made on and a
/// risk profile
#[derive(Debug, Clone)]
pub struct ReasoningReporter {
    threshold: f32,
    quality: SignalQualityScorer,
}

impl Default for ReasoningReporter {
    fn default() -> Self {
        Self {
            threshold: DECODE_THRESHOLD,
            quality: SignalQualityScorer::default(),
        }
    }
}

impl ReasoningReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, ReportError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ReportError::InvalidThreshold(threshold));
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn report(
        &self,
        prediction: &Prediction,
        vocabulary: &Vocabulary,
        recording: &Recording,
        risks: RiskProfile,
    ) -> Result<ReasoningReport, ReportError> {
        let ranked = prediction.ranked(vocabulary, self.threshold);
        let leads = lead_contributions(recording.samples())?;
        let quality = self.quality.grade(recording);
        debug!(
            labels = ranked.len(),
            quality = %quality,
            "Assembling reasoning report"
        );
        Ok(ReasoningReport::new(
            &ranked,
            prediction.confidence(),
            prediction.threshold_flag(self.threshold),
            &leads,
            risks,
            quality,
        ))
    }
}
