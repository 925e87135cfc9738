pub mod converter;
pub mod decompressor;
pub mod merger;
pub mod pipeline;
pub mod planner;
pub mod retriever;

pub use converter::FormatConverter;
pub use decompressor::{compress, decompress, decompressed_path};
pub use merger::{merged_file_name, version_flag, MergeOutcome, MergeResult, Merger};
pub use pipeline::{MultiStationOutput, PipelineOutput, StationFailure, StationPipeline};
pub use planner::FetchPlanner;
pub use retriever::{has_gzip_magic, FetchFailure, RetrievalWorker};
