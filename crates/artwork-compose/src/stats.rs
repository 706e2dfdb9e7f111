use crate::types::*;

/// Counts of how each element ended up on the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FidelitySummary {
    pub total: usize,
    pub vector: usize,
    pub raster: usize,
    pub placeholder: usize,
}

impl FidelitySummary {
    pub fn degraded(&self) -> usize {
        self.raster + self.placeholder
    }

    /// Caller-facing warning, or `None` when everything stayed vector
    pub fn warning(&self) -> Option<String> {
        if self.degraded() == 0 {
            return None;
        }
        let noun = if self.total == 1 { "logo" } else { "logos" };
        Some(format!(
            "{} of {} {} embedded at reduced quality",
            self.degraded(),
            self.total,
            noun
        ))
    }
}

/// Tally a set of fidelity reports
pub fn summarize(reports: &[FidelityReport]) -> FidelitySummary {
    reports
        .iter()
        .fold(FidelitySummary::default(), |mut summary, report| {
            summary.total += 1;
            match report.fidelity {
                Fidelity::Vector => summary.vector += 1,
                Fidelity::HighResRaster => summary.raster += 1,
                Fidelity::Placeholder => summary.placeholder += 1,
            }
            summary
        })
}
