pub mod fetch;
pub mod report;
pub mod station;
pub mod window;

pub use fetch::{ConvertedFragment, FailureStage, FetchItem, RetrievedPayload, SlotFailure};
pub use report::{ContentKind, FetchReport, MergeStatus};
pub use station::{DataType, RinexVersion, StationRecord, StationRequest};
pub use window::{Slot, TimeWindow};
