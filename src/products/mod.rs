pub mod catalogue;
pub mod cors;
pub mod sp3;

pub use catalogue::{find_center, AnalysisCenter, Campaign, ProductSpec, Solution, ANALYSIS_CENTERS};
pub use cors::{
    cors_file_name, cors_file_url, cors_listing_url, CorsAvailability, CorsFetcher, CorsFileType,
    CorsRequest,
};
pub use sp3::{parse_md5sums, ProductFetcher, ProductRequest};
