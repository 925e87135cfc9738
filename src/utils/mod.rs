pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use coordinates::{haversine_distance, normalize_longitude, validate_coordinates};
pub use filename::{
    combined_archive_name, default_cors_dir, default_output_path, default_products_dir,
    station_archive_name,
};
pub use progress::ProgressReporter;
