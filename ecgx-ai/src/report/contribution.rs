//! Energy-based lead contribution
//!
//! A surrogate attribution: each lead's share of the total signal energy
//! (sum of squared samples), not a model explanation.

use super::ReportError;
use crate::types::{Lead, NUM_LEADS};
use ndarray::{Array2, Axis};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeadContribution {
    pub lead: Lead,
    /// Share of total energy in percent, unrounded
    pub percent: f64,
}

/// Per-lead energy shares, largest first; ties keep lead order
pub fn lead_contributions(samples: &Array2<f32>) -> Result<Vec<LeadContribution>, ReportError> {
    if samples.ncols() != NUM_LEADS {
        return Err(ReportError::InvalidShape(format!(
            "expected {} leads, got {}",
            NUM_LEADS,
            samples.ncols()
        )));
    }

    let energies: Vec<f64> = samples
        .axis_iter(Axis(1))
        .map(|lead| lead.iter().map(|&v| (v as f64) * (v as f64)).sum())
        .collect();
    let total: f64 = energies.iter().sum();
    if !total.is_finite() {
        return Err(ReportError::InvalidShape(
            "signal contains non-finite samples".to_string(),
        ));
    }
    if total == 0.0 {
        return Err(ReportError::DivisionByZero);
    }

    let mut contributions: Vec<LeadContribution> = Lead::ALL
        .iter()
        .zip(&energies)
        .map(|(&lead, &energy)| LeadContribution {
            lead,
            percent: energy / total * 100.0,
        })
        .collect();
    contributions.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    Ok(contributions)
}
