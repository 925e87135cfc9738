use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::models::Slot;

/// One planned download. Built by the planner, consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchItem {
    pub url: String,
    pub file_name: String,
    pub slot: Slot,
}

/// A downloaded, validated, still-compressed payload.
#[derive(Debug, Clone)]
pub struct RetrievedPayload {
    pub item: FetchItem,
    pub path: PathBuf,
    pub bytes: u64,
}

/// A RINEX observation fragment covering one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFragment {
    pub path: PathBuf,
    pub slot: Slot,
}

impl ConvertedFragment {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStage {
    Fetch,
    Decompress,
    Convert,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Decompress => "decompress",
            FailureStage::Convert => "convert",
        };
        write!(f, "{}", name)
    }
}

/// A non-fatal failure for one slot. Recorded, never propagated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotFailure {
    pub slot: Slot,
    pub file_name: String,
    pub stage: FailureStage,
    pub reason: String,
}

impl SlotFailure {
    pub fn new(item: &FetchItem, stage: FailureStage, reason: impl Into<String>) -> Self {
        Self {
            slot: item.slot,
            file_name: item.file_name.clone(),
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SlotFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} failed for {}: {}",
            self.slot, self.stage, self.file_name, self.reason
        )
    }
}
