use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::SlotFailure;

/// What the output archive holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Merged,
    Fragments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStatus {
    Merged { file_name: String, hours: u32 },
    /// Merge was attempted and failed; fragments were shipped instead.
    Failed { reason: String },
    Disabled,
}

impl MergeStatus {
    pub fn content_kind(&self) -> ContentKind {
        match self {
            MergeStatus::Merged { .. } => ContentKind::Merged,
            _ => ContentKind::Fragments,
        }
    }
}

/// Outcome summary of one station run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    pub station: String,
    pub attempted: usize,
    pub retrieved: usize,
    pub converted: usize,
    pub failures: Vec<SlotFailure>,
    pub merge: MergeStatus,
}

impl FetchReport {
    pub fn new(station: &str, attempted: usize) -> Self {
        Self {
            station: station.to_string(),
            attempted,
            retrieved: 0,
            converted: 0,
            failures: Vec::new(),
            merge: MergeStatus::Disabled,
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Station {}: {}/{} slots retrieved, {} converted, {} failed\n",
            self.station,
            self.retrieved,
            self.attempted,
            self.converted,
            self.failures.len()
        );

        match &self.merge {
            MergeStatus::Merged { file_name, hours } => {
                summary.push_str(&format!("  Merged into {} ({}h)\n", file_name, hours));
            }
            MergeStatus::Failed { reason } => {
                summary.push_str(&format!(
                    "  Merge failed ({}); shipping {} fragments\n",
                    reason, self.converted
                ));
            }
            MergeStatus::Disabled => {
                summary.push_str(&format!("  Shipping {} fragments\n", self.converted));
            }
        }

        summary
    }
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
