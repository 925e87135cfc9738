pub mod station_reader;
pub mod summary_reader;

pub use station_reader::{NearestStation, StationReader, StationTable};
pub use summary_reader::{check_availability, download_summary, Availability, Summary, SummaryEntry};
